//! End-to-end migration against a mocked Blogger service.
//!
//! Each test starts its own mock server and in-memory SQLite database. The
//! client logs in, the plan is resolved through scripted prompt answers, and
//! the post loop runs against real Atom documents.

use blogger_import::blogger::{http_client, BloggerClient, Endpoints};
use blogger_import::migrate::{
    session, MigrateError, MigrationPlan, MigrationSummary, Migrator, Prompt, Reporter,
    SessionOptions, ENTRY_APP_LABEL, ENTRY_MODEL,
};
use blogger_import::storage::{Database, EntryStatus};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use std::collections::VecDeque;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fixtures
// ============================================================================

struct Answers {
    lines: VecDeque<String>,
    secret: Option<String>,
}

impl Answers {
    fn new(lines: &[&str], secret: &str) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            secret: Some(secret.to_string()),
        }
    }
}

impl Prompt for Answers {
    fn ask(&mut self, _question: &str) -> Result<Option<String>, MigrateError> {
        Ok(self.lines.pop_front())
    }

    fn ask_secret(&mut self, _question: &str) -> Result<Option<SecretString>, MigrateError> {
        Ok(self.secret.take().map(SecretString::from))
    }

    fn say(&mut self, _line: &str) -> Result<(), MigrateError> {
        Ok(())
    }
}

const BLOGS_FEED: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom'>
  <entry>
    <title type='text'>Travels</title>
    <link rel='self' type='application/atom+xml' href='https://www.blogger.com/feeds/owner/blogs/42'/>
  </entry>
</feed>"#;

const POSTS_FEED: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom' xmlns:app='http://purl.org/atom/app#'>
  <entry>
    <published>2010-12-19T15:37:00.003+00:00</published>
    <updated>2010-12-20T09:00:00.000+00:00</updated>
    <category scheme='http://www.blogger.com/atom/ns#' term='Travel'/>
    <title type='text'>Packing list</title>
    <content type='html'>&lt;p&gt;Socks.&lt;/p&gt;</content>
    <link rel='self' type='application/atom+xml' href='https://www.blogger.com/feeds/42/posts/default/1001'/>
    <app:control><app:draft>yes</app:draft></app:control>
  </entry>
  <entry>
    <published>2010-12-21T10:00:00.000+00:00</published>
    <updated>2010-12-21T10:00:00.000+00:00</updated>
    <category scheme='http://www.blogger.com/atom/ns#' term='Travel'/>
    <title type='text'>Arrived in Lisbon</title>
    <content type='html'>&lt;p&gt;Sunny.&lt;/p&gt;</content>
    <link rel='self' type='application/atom+xml' href='https://www.blogger.com/feeds/42/posts/default/1002'/>
  </entry>
</feed>"#;

fn comments_feed(content: &str, author: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<feed xmlns='http://www.w3.org/2005/Atom'>
  <entry>
    <published>2011-01-02T08:30:00.000+00:00</published>
    <title type='text'>{content}</title>
    <content type='html'>{content}</content>
    <author><name>{author}</name><email>noreply@blogger.com</email></author>
  </entry>
</feed>"#
    )
}

async fn mock_blogger(server: &MockServer, second_post_comments: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("SID=x\nLSID=y\nAuth=token\n"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/default/blogs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BLOGS_FEED))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/42/posts/default"))
        .respond_with(ResponseTemplate::new(200).set_body_string(POSTS_FEED))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/42/1001/comments/default"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(comments_feed("Bring a towel", "Ana")),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/42/1002/comments/default"))
        .respond_with(second_post_comments)
        .mount(server)
        .await;
}

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        login_url: format!("{}/accounts/ClientLogin", server.uri()),
        api_base: server.uri(),
    }
}

async fn connect(server: &MockServer, prompt: &mut Answers) -> BloggerClient {
    session::authenticate(
        prompt,
        http_client().unwrap(),
        &endpoints(server),
        Some("owner@example.com"),
        None,
    )
    .await
    .unwrap()
}

async fn setup_db() -> Database {
    let db = Database::open(":memory:").await.unwrap();
    db.create_user("admin", "admin@example.com").await.unwrap();
    db
}

fn options() -> SessionOptions {
    SessionOptions {
        site_domain: "blog.example.org".to_string(),
        site_name: "Example Blog".to_string(),
        ..SessionOptions::default()
    }
}

async fn migrate(client: &BloggerClient, db: &Database, plan: &MigrationPlan) -> MigrationSummary {
    let mut migrator = Migrator::new(client, db, Reporter::new(Vec::new(), 0));
    migrator.run(plan).await.unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_full_migration_with_interactive_choices() {
    let server = MockServer::start().await;
    mock_blogger(
        &server,
        ResponseTemplate::new(200).set_body_string(comments_feed("Enjoy!", "Ben")),
    )
    .await;
    let db = setup_db().await;
    // Blog number, then category title
    let mut prompt = Answers::new(&["1", "Imported"], "secret");

    let client = connect(&server, &mut prompt).await;
    let plan = session::prepare(&client, &db, &mut prompt, &options())
        .await
        .unwrap();
    let summary = migrate(&client, &db, &plan).await;

    assert_eq!(
        summary,
        MigrationSummary {
            migrated: 2,
            skipped: 0,
            failed: 0,
            comments: 2
        }
    );

    let categories = db.get_categories().await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].title, "Imported");

    let entries = db.get_entries().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, EntryStatus::Draft);
    assert_eq!(entries[0].content, "<p>Socks.</p>");
    assert_eq!(entries[1].status, EntryStatus::Published);
    assert_eq!(entries[1].slug, "arrived-in-lisbon");

    let content_type = db
        .content_type_for(ENTRY_APP_LABEL, ENTRY_MODEL)
        .await
        .unwrap();
    for entry in &entries {
        assert_eq!(entry.tags, "travel");
        let tags = db.get_entry_tags(entry.id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "travel");

        let links = db.get_entry_associations(entry.id).await.unwrap();
        assert_eq!(links.site_ids, vec![plan.site.id]);
        assert_eq!(links.category_ids, vec![categories[0].id]);
        assert_eq!(links.author_ids, vec![plan.author.id]);

        let comments = db
            .get_comments_for(content_type.id, &entry.id.to_string())
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].site_id, plan.site.id);
    }
}

#[tokio::test]
async fn test_rerun_creates_nothing() {
    let server = MockServer::start().await;
    mock_blogger(
        &server,
        ResponseTemplate::new(200).set_body_string(comments_feed("Enjoy!", "Ben")),
    )
    .await;
    let db = setup_db().await;
    let mut prompt = Answers::new(&[], "secret");
    let client = connect(&server, &mut prompt).await;

    let mut opts = options();
    opts.blog_id = Some("42".to_string());
    opts.category_title = Some("Imported".to_string());
    let plan = session::prepare(&client, &db, &mut prompt, &opts)
        .await
        .unwrap();

    let first = migrate(&client, &db, &plan).await;
    let second = migrate(&client, &db, &plan).await;

    assert_eq!(first.migrated, 2);
    assert_eq!(
        second,
        MigrationSummary {
            migrated: 0,
            skipped: 2,
            failed: 0,
            comments: 0
        }
    );
    assert_eq!(db.get_entries().await.unwrap().len(), 2);
    assert_eq!(db.get_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disabled_comments_do_not_abort() {
    let server = MockServer::start().await;
    mock_blogger(
        &server,
        ResponseTemplate::new(400).set_body_string("Comments are disabled for this post."),
    )
    .await;
    let db = setup_db().await;
    let mut prompt = Answers::new(&[], "secret");
    let client = connect(&server, &mut prompt).await;

    let mut opts = options();
    opts.blog_id = Some("42".to_string());
    opts.category_title = Some("Imported".to_string());
    let plan = session::prepare(&client, &db, &mut prompt, &opts)
        .await
        .unwrap();

    let mut migrator = Migrator::new(&client, &db, Reporter::new(Vec::new(), 1));
    let summary = migrator.run(&plan).await.unwrap();
    let out = String::from_utf8(migrator.into_reporter().into_inner()).unwrap();

    assert_eq!(summary.migrated, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.comments, 1);
    assert!(out.contains("Migrated Arrived in Lisbon: published + 0 comments"));
}

#[tokio::test]
async fn test_rejected_password_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Error=BadAuthentication\n"))
        .mount(&server)
        .await;
    let mut prompt = Answers::new(&[], "wrong");

    let err = session::authenticate(
        &mut prompt,
        http_client().unwrap(),
        &endpoints(&server),
        Some("owner@example.com"),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, MigrateError::Authentication));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_post_listing_failure_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Auth=token\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feeds/42/posts/default"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let db = setup_db().await;
    let mut prompt = Answers::new(&[], "secret");
    let client = connect(&server, &mut prompt).await;

    let mut opts = options();
    opts.blog_id = Some("42".to_string());
    opts.category_title = Some("Imported".to_string());
    let plan = session::prepare(&client, &db, &mut prompt, &opts)
        .await
        .unwrap();

    let mut migrator = Migrator::new(&client, &db, Reporter::new(Vec::new(), 0));
    let err = migrator.run(&plan).await.unwrap_err();

    assert!(matches!(err, MigrateError::Feed(_)));
    assert!(db.get_entries().await.unwrap().is_empty());
}
