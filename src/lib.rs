//! Import posts and comments from a Blogger blog into a local blog database.

pub mod blogger;
pub mod config;
pub mod migrate;
pub mod storage;
pub mod util;
