//! Pure conversions from remote feed records to local store records.
//!
//! Nothing here touches the network or the database; the orchestrator feeds
//! remote records in and persists what comes out.

use chrono::NaiveDateTime;
use slug::slugify;
use thiserror::Error;

use crate::blogger::{RemoteAuthor, RemoteComment, RemotePost};
use crate::storage::{EntryStatus, NewComment, NewEntry};

/// Maximum length of entry and category slugs.
pub const MAX_SLUG_LEN: usize = 255;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Length of the `+HH:MM` suffix dropped from feed timestamps.
const OFFSET_LEN: usize = 6;

/// Text of `app:control/app:draft` that marks a post as a draft.
const DRAFT_SENTINEL: &str = "yes";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("Invalid timestamp {raw:?}: {reason}")]
    InvalidTimestamp { raw: String, reason: String },
}

/// Parse a feed timestamp such as `2010-12-19T15:37:00.003+00:00`.
///
/// The trailing offset is discarded, not applied: the wall-clock time is kept
/// exactly as written in the feed.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, MapError> {
    let invalid = |reason: &str| MapError::InvalidTimestamp {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let local = raw
        .len()
        .checked_sub(OFFSET_LEN)
        .and_then(|end| raw.get(..end))
        .ok_or_else(|| invalid("too short to carry an offset"))?;

    NaiveDateTime::parse_from_str(local, TIMESTAMP_FORMAT).map_err(|e| invalid(&e.to_string()))
}

/// True only when the post's control block carries a draft flag of exactly `yes`.
pub fn is_draft(post: &RemotePost) -> bool {
    post.control
        .as_ref()
        .and_then(|control| control.draft.as_deref())
        == Some(DRAFT_SENTINEL)
}

/// Slug for an entry: from the title, or from `fallback` when the title is empty.
pub fn derive_slug(title: &str, fallback: &str) -> String {
    let source = if title.is_empty() { fallback } else { title };
    truncate_slug(slugify(source))
}

/// Slug for a category title.
pub fn category_slug(title: &str) -> String {
    truncate_slug(slugify(title))
}

fn truncate_slug(mut slug: String) -> String {
    // slugify only emits ASCII, so byte and char positions agree
    slug.truncate(MAX_SLUG_LEN);
    slug
}

/// Comma-joined slugs of the category terms, in source order.
pub fn derive_tags(categories: &[String]) -> String {
    categories
        .iter()
        .map(slugify)
        .collect::<Vec<_>>()
        .join(",")
}

/// Commenter identity with every missing part replaced by an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFields {
    pub name: String,
    pub email: String,
    pub url: String,
}

pub fn resolve_author_fields(author: Option<&RemoteAuthor>) -> AuthorFields {
    let Some(author) = author else {
        return AuthorFields::default();
    };
    AuthorFields {
        name: author.name.clone().unwrap_or_default(),
        email: author.email.clone().unwrap_or_default(),
        url: author.uri.clone().unwrap_or_default(),
    }
}

/// The run-wide site, category and author every imported entry is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    pub site_id: i64,
    pub category_id: i64,
    pub author_id: i64,
}

/// Build the local entry for a remote post.
pub fn map_post(post: &RemotePost, attribution: Attribution) -> Result<NewEntry, MapError> {
    let status = if is_draft(post) {
        EntryStatus::Draft
    } else {
        EntryStatus::Published
    };

    Ok(NewEntry {
        title: post.title.clone(),
        slug: derive_slug(&post.title, &post.id),
        content: post.content.clone(),
        status,
        creation_date: parse_timestamp(&post.published)?,
        last_update: parse_timestamp(&post.updated)?,
        tags: derive_tags(&post.categories),
        site_id: attribution.site_id,
        category_id: attribution.category_id,
        author_id: attribution.author_id,
    })
}

/// Build the local comment for a remote comment attached to `object_pk`.
pub fn map_comment(
    comment: &RemoteComment,
    content_type_id: i64,
    object_pk: &str,
    site_id: i64,
) -> Result<NewComment, MapError> {
    let author = resolve_author_fields(comment.author.as_ref());
    Ok(NewComment {
        content_type_id,
        object_pk: object_pk.to_string(),
        site_id,
        user_name: author.name,
        user_email: author.email,
        user_url: author.url,
        comment: comment.content.clone(),
        submit_date: parse_timestamp(&comment.published)?,
    })
}
