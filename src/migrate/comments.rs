use futures::TryStreamExt;

use super::error::MigrateError;
use super::mapper::map_comment;
use crate::blogger::BlogSource;
use crate::storage::Database;

/// Counts from importing the comments of one post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentOutcome {
    pub created: usize,
    pub existing: usize,
    /// Comments whose fields could not be mapped
    pub unreadable: usize,
    /// Comments the store refused
    pub failed: usize,
}

/// Where imported comments are attached in the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTarget {
    pub content_type_id: i64,
    pub object_pk: String,
    pub site_id: i64,
}

/// Get-or-create every remote comment of one post under `target`.
///
/// A failing comment listing is returned as-is; the caller decides whether
/// it means "no comments". A comment that cannot be mapped or stored is
/// skipped and counted; it does not stop the remaining comments.
pub async fn import_comments<S: BlogSource + ?Sized>(
    source: &S,
    db: &Database,
    blog_id: &str,
    post_id: &str,
    target: &CommentTarget,
) -> Result<CommentOutcome, MigrateError> {
    let mut outcome = CommentOutcome::default();
    let mut comments = source.comments(blog_id, post_id);

    while let Some(remote) = comments.try_next().await? {
        let new = match map_comment(
            &remote,
            target.content_type_id,
            &target.object_pk,
            target.site_id,
        ) {
            Ok(new) => new,
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "Skipping unreadable comment");
                outcome.unreadable += 1;
                continue;
            }
        };

        match db.get_or_create_comment(&new).await {
            Ok((comment, true)) => {
                tracing::debug!(comment_id = comment.id, post_id = %post_id, "Imported comment");
                outcome.created += 1;
            }
            Ok((_, false)) => outcome.existing += 1,
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "Failed to store comment");
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}
