//! Records as the remote service describes them, before any mapping.

/// A blog owned by the authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlog {
    /// Trailing path segment of the blog's self link
    pub id: String,
    pub title: String,
}

/// Publishing controls attached to a post (`app:control`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostControl {
    /// Text of the `app:draft` element, when present
    pub draft: Option<String>,
}

/// A post as listed in a blog's post feed.
///
/// Timestamps are kept as the raw feed text; parsing happens in the mapper
/// so a malformed value only fails the post it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePost {
    /// Trailing path segment of the post's self link
    pub id: String,
    /// Empty when the feed carries no title text
    pub title: String,
    /// Empty when the feed carries no content text
    pub content: String,
    pub published: String,
    pub updated: String,
    pub control: Option<PostControl>,
    /// Category terms in feed order
    pub categories: Vec<String>,
}

/// Author sub-record of a comment. Each part may be missing independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub uri: Option<String>,
}

/// A comment listed under one post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteComment {
    pub content: String,
    pub published: String,
    /// First author listed on the comment
    pub author: Option<RemoteAuthor>,
}
