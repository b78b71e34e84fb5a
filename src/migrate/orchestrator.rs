//! The post loop: map, deduplicate, store, import comments, report.

use std::io::Write;

use futures::TryStreamExt;

use super::comments::{import_comments, CommentTarget};
use super::error::MigrateError;
use super::mapper::{category_slug, map_post, Attribution};
use super::report::{MigrationSummary, Reporter};
use crate::blogger::{BlogSource, RemotePost};
use crate::storage::{Category, Database, Site, User};

/// Content type comments are attached to.
pub const ENTRY_APP_LABEL: &str = "blog";
pub const ENTRY_MODEL: &str = "entry";

/// Everything resolved before the post loop starts.
///
/// The site, author and category are fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub site: Site,
    pub author: User,
    pub blog_id: String,
    pub category_title: String,
}

enum PostOutcome {
    Migrated { comments: usize },
    Skipped,
}

pub struct Migrator<'a, S: BlogSource + ?Sized, W: Write> {
    source: &'a S,
    db: &'a Database,
    reporter: Reporter<W>,
}

impl<'a, S: BlogSource + ?Sized, W: Write> Migrator<'a, S, W> {
    pub fn new(source: &'a S, db: &'a Database, reporter: Reporter<W>) -> Self {
        Self {
            source,
            db,
            reporter,
        }
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }

    /// Import every post of `plan.blog_id`, in feed order.
    ///
    /// A failure on one post is reported and counted; the loop moves on.
    /// Failing to list the posts at all, or to resolve the category, aborts.
    pub async fn run(&mut self, plan: &MigrationPlan) -> Result<MigrationSummary, MigrateError> {
        self.reporter.start();

        let category = self.resolve_category(&plan.category_title).await?;
        let content_type = self
            .db
            .content_type_for(ENTRY_APP_LABEL, ENTRY_MODEL)
            .await?;
        let attribution = Attribution {
            site_id: plan.site.id,
            category_id: category.id,
            author_id: plan.author.id,
        };

        let mut summary = MigrationSummary::default();
        let source = self.source;
        let mut posts = source.posts(&plan.blog_id);

        while let Some(post) = posts.try_next().await? {
            match self
                .import_post(&post, plan, attribution, content_type.id)
                .await
            {
                Ok(PostOutcome::Migrated { comments }) => {
                    summary.migrated += 1;
                    summary.comments += comments;
                }
                Ok(PostOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "Failed to import post");
                    let label = if post.title.is_empty() {
                        &post.id
                    } else {
                        &post.title
                    };
                    self.reporter.failed(label, &e.to_string());
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            blog_id = %plan.blog_id,
            migrated = summary.migrated,
            skipped = summary.skipped,
            failed = summary.failed,
            comments = summary.comments,
            "Migration finished"
        );
        self.reporter.finish();
        Ok(summary)
    }

    async fn resolve_category(&self, title: &str) -> Result<Category, MigrateError> {
        let (category, created) = self
            .db
            .get_or_create_category(title, &category_slug(title))
            .await?;
        if !created {
            tracing::debug!(category_id = category.id, "Reusing existing category");
        }
        Ok(category)
    }

    async fn import_post(
        &mut self,
        post: &RemotePost,
        plan: &MigrationPlan,
        attribution: Attribution,
        content_type_id: i64,
    ) -> Result<PostOutcome, MigrateError> {
        let new_entry = map_post(post, attribution)?;

        if let Some(existing) = self.db.find_entry(&new_entry.key()).await? {
            tracing::debug!(post_id = %post.id, entry_id = existing.id, "Already migrated");
            self.reporter.skipped(&existing);
            return Ok(PostOutcome::Skipped);
        }

        let entry = self.db.insert_entry(&new_entry).await?;
        tracing::info!(post_id = %post.id, entry_id = entry.id, "Created entry");

        let target = CommentTarget {
            content_type_id,
            object_pk: entry.id.to_string(),
            site_id: plan.site.id,
        };
        let created = match import_comments(self.source, self.db, &plan.blog_id, &post.id, &target)
            .await
        {
            Ok(outcome) => {
                self.reporter.comment_detail(outcome.created, outcome.existing);
                outcome.created
            }
            Err(MigrateError::Feed(e)) if e.is_request_error() => {
                tracing::debug!(post_id = %post.id, error = %e, "Comments not available");
                self.reporter.comments_unavailable(&e.to_string());
                0
            }
            Err(e) => return Err(e),
        };

        let total = self
            .db
            .count_comments_for(content_type_id, &target.object_pk)
            .await?;
        self.reporter.migrated(&entry, total);
        Ok(PostOutcome::Migrated { comments: created })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blogger::{
        FeedError, FeedStream, PostControl, RemoteAuthor, RemoteBlog, RemoteComment,
    };
    use crate::storage::EntryStatus;
    use futures::stream::{self, StreamExt};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeBlog {
        posts: Vec<RemotePost>,
        comments: HashMap<String, Vec<RemoteComment>>,
        /// Post ids whose comment listing is refused by the service
        refused: Vec<String>,
    }

    impl BlogSource for FakeBlog {
        fn blogs(&self) -> FeedStream<'_, RemoteBlog> {
            stream::empty().boxed()
        }

        fn posts<'a>(&'a self, _blog_id: &'a str) -> FeedStream<'a, RemotePost> {
            stream::iter(self.posts.clone().into_iter().map(Ok::<_, FeedError>)).boxed()
        }

        fn comments<'a>(&'a self, _blog_id: &'a str, post_id: &'a str) -> FeedStream<'a, RemoteComment> {
            if self.refused.iter().any(|id| id == post_id) {
                return stream::once(async {
                    Err(FeedError::Request {
                        status: 400,
                        reason: "Comments are disabled for this post".to_string(),
                    })
                })
                .boxed();
            }
            let comments = self.comments.get(post_id).cloned().unwrap_or_default();
            stream::iter(comments.into_iter().map(Ok::<_, FeedError>)).boxed()
        }
    }

    fn post(id: &str, title: &str, draft: bool) -> RemotePost {
        RemotePost {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("<p>{title}</p>"),
            published: "2010-12-19T15:37:00.003+00:00".to_string(),
            updated: "2010-12-19T15:37:00.003+00:00".to_string(),
            control: draft.then(|| PostControl {
                draft: Some("yes".to_string()),
            }),
            categories: vec!["Travel".to_string()],
        }
    }

    fn comment(content: &str) -> RemoteComment {
        RemoteComment {
            content: content.to_string(),
            published: "2011-01-02T08:30:00.000+00:00".to_string(),
            author: Some(RemoteAuthor {
                name: Some("Reader".to_string()),
                email: Some("reader@example.com".to_string()),
                uri: None,
            }),
        }
    }

    async fn plan(db: &Database) -> MigrationPlan {
        MigrationPlan {
            site: db.get_or_create_site("example.com", "example.com").await.unwrap(),
            author: db.create_user("admin", "admin@example.com").await.unwrap(),
            blog_id: "42".to_string(),
            category_title: "From Blogger".to_string(),
        }
    }

    async fn run(
        source: &FakeBlog,
        db: &Database,
        plan: &MigrationPlan,
    ) -> (MigrationSummary, String) {
        let mut migrator = Migrator::new(source, db, Reporter::new(Vec::new(), 1));
        let summary = migrator.run(plan).await.unwrap();
        let out = String::from_utf8(migrator.into_reporter().into_inner()).unwrap();
        (summary, out)
    }

    #[tokio::test]
    async fn test_migrates_posts_and_comments() {
        let db = Database::open(":memory:").await.unwrap();
        let plan = plan(&db).await;
        let source = FakeBlog {
            posts: vec![post("1", "Draft post", true), post("2", "Live post", false)],
            comments: HashMap::from([
                ("1".to_string(), vec![comment("On the draft")]),
                ("2".to_string(), vec![comment("On the live one")]),
            ]),
            ..FakeBlog::default()
        };

        let (summary, out) = run(&source, &db, &plan).await;

        assert_eq!(
            summary,
            MigrationSummary {
                migrated: 2,
                skipped: 0,
                failed: 0,
                comments: 2
            }
        );
        let entries = db.get_entries().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, EntryStatus::Draft);
        assert_eq!(entries[1].status, EntryStatus::Published);
        assert!(entries.iter().all(|e| e.tags == "travel"));
        assert!(out.contains("Migrated Draft post: draft + 1 comments"));
        assert!(out.contains("Migrated Live post: published + 1 comments"));
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let db = Database::open(":memory:").await.unwrap();
        let plan = plan(&db).await;
        let source = FakeBlog {
            posts: vec![post("1", "Hello", false)],
            comments: HashMap::from([("1".to_string(), vec![comment("Hi")])]),
            ..FakeBlog::default()
        };

        run(&source, &db, &plan).await;
        let (summary, out) = run(&source, &db, &plan).await;

        assert_eq!(summary.migrated, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.comments, 0);
        assert_eq!(db.get_entries().await.unwrap().len(), 1);
        assert!(out.contains("Skipped Hello: published (already migrated)"));
    }

    #[tokio::test]
    async fn test_refused_comments_count_as_zero() {
        let db = Database::open(":memory:").await.unwrap();
        let plan = plan(&db).await;
        let source = FakeBlog {
            posts: vec![post("1", "Quiet", false), post("2", "Chatty", false)],
            comments: HashMap::from([("2".to_string(), vec![comment("Hello")])]),
            refused: vec!["1".to_string()],
        };

        let (summary, out) = run(&source, &db, &plan).await;

        assert_eq!(summary.migrated, 2);
        assert_eq!(summary.failed, 0);
        assert!(out.contains("Migrated Quiet: published + 0 comments"));
        assert!(out.contains("Migrated Chatty: published + 1 comments"));
    }

    #[tokio::test]
    async fn test_bad_post_does_not_stop_run() {
        let db = Database::open(":memory:").await.unwrap();
        let plan = plan(&db).await;
        let mut broken = post("1", "Broken", false);
        broken.published = "someday".to_string();
        let source = FakeBlog {
            posts: vec![broken, post("2", "Fine", false)],
            ..FakeBlog::default()
        };

        let (summary, out) = run(&source, &db, &plan).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.migrated, 1);
        assert!(out.contains("Failed Broken: "));
        assert_eq!(db.get_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_posts_collapse() {
        let db = Database::open(":memory:").await.unwrap();
        let plan = plan(&db).await;
        // Different remote ids, every key field identical
        let source = FakeBlog {
            posts: vec![post("1", "Twin", false), post("2", "Twin", false)],
            ..FakeBlog::default()
        };

        let (summary, _) = run(&source, &db, &plan).await;

        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(db.get_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_category_created_once() {
        let db = Database::open(":memory:").await.unwrap();
        let plan = plan(&db).await;
        let source = FakeBlog {
            posts: vec![post("1", "One", false), post("2", "Two", false)],
            ..FakeBlog::default()
        };

        run(&source, &db, &plan).await;
        run(&source, &db, &plan).await;

        let categories = db.get_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].title, "From Blogger");
        assert_eq!(categories[0].slug, "from-blogger");
    }
}
