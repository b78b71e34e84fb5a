//! Read-only access to a remote Blogger account.
//!
//! - [`client`] - ClientLogin authentication and feed requests
//! - `atom` - Atom feed parsing into the records in [`types`]
//!
//! Every listing is a lazy stream. Nothing is requested until the stream is
//! first polled, and each call re-issues the request.

mod atom;
mod client;
mod types;

use futures::stream::BoxStream;

pub use atom::{trailing_segment, AtomError};
pub use client::{http_client, BloggerClient, Endpoints, FeedError};
pub use types::{PostControl, RemoteAuthor, RemoteBlog, RemoteComment, RemotePost};

/// Stream of remote records, failing with [`FeedError`].
pub type FeedStream<'a, T> = BoxStream<'a, Result<T, FeedError>>;

/// An authenticated view of one remote account.
///
/// Implemented by [`BloggerClient`]; tests substitute in-memory sources.
pub trait BlogSource {
    /// Blogs owned by the account.
    fn blogs(&self) -> FeedStream<'_, RemoteBlog>;

    /// Posts of one blog, as ordered by the service.
    fn posts<'a>(&'a self, blog_id: &'a str) -> FeedStream<'a, RemotePost>;

    /// Comments of one post.
    fn comments<'a>(&'a self, blog_id: &'a str, post_id: &'a str) -> FeedStream<'a, RemoteComment>;
}
