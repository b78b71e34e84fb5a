mod categories;
mod comments;
mod entries;
mod schema;
mod sites;
mod types;

pub use schema::Database;
pub use types::{
    Category, Comment, ContentType, DatabaseError, Entry, EntryAssociations, EntryKey,
    EntryStatus, NewComment, NewEntry, Site, Tag, User,
};
