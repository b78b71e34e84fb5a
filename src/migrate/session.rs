//! Run setup: credentials, login, and resolving what the post loop needs.
//!
//! The order matches what the operator sees: username, password, login,
//! default author, blog, category.

use std::time::Duration;

use futures::TryStreamExt;

use super::error::MigrateError;
use super::orchestrator::MigrationPlan;
use super::prompt::{select_blog, Prompt};
use crate::blogger::{BlogSource, BloggerClient, Endpoints, RemoteBlog};
use crate::storage::{Database, User};
use crate::util::clean_input;

/// Values known before any prompting, from flags or the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub category_title: Option<String>,
    pub blog_id: Option<String>,
    pub author: Option<String>,
    pub site_domain: String,
    pub site_name: String,
}

/// A configured value counts only when it is non-empty after cleaning.
fn provided(value: Option<&str>) -> Option<String> {
    value.map(clean_input).filter(|v| !v.is_empty())
}

/// Use `configured` or ask; an empty or missing answer fails with `invalid`.
fn value_or_ask<P: Prompt + ?Sized>(
    prompt: &mut P,
    configured: Option<&str>,
    question: &str,
    invalid: &str,
) -> Result<String, MigrateError> {
    if let Some(value) = provided(configured) {
        return Ok(value);
    }
    prompt
        .ask(question)?
        .filter(|answer| !answer.is_empty())
        .ok_or_else(|| MigrateError::Input(invalid.to_string()))
}

pub fn resolve_username<P: Prompt + ?Sized>(
    prompt: &mut P,
    configured: Option<&str>,
) -> Result<String, MigrateError> {
    value_or_ask(
        prompt,
        configured,
        "Blogger username: ",
        "Invalid Blogger username",
    )
}

pub fn resolve_category_title<P: Prompt + ?Sized>(
    prompt: &mut P,
    configured: Option<&str>,
) -> Result<String, MigrateError> {
    value_or_ask(
        prompt,
        configured,
        "Category title for imported entries: ",
        "Invalid category title",
    )
}

/// Ask for the username if needed, always ask for the password, and log in.
///
/// # Errors
///
/// - [`MigrateError::Input`] - empty username or aborted password entry
/// - [`MigrateError::Authentication`] - credentials rejected
/// - [`MigrateError::Feed`] - the login endpoint could not be reached
pub async fn authenticate<P: Prompt + ?Sized>(
    prompt: &mut P,
    http: reqwest::Client,
    endpoints: &Endpoints,
    configured_username: Option<&str>,
    timeout: Option<Duration>,
) -> Result<BloggerClient, MigrateError> {
    let username = resolve_username(prompt, configured_username)?;
    let password = prompt
        .ask_secret("Blogger password: ")?
        .ok_or_else(|| MigrateError::Input("Password entry aborted".to_string()))?;

    let client = BloggerClient::login(http, endpoints, &username, &password, timeout).await?;
    Ok(client)
}

/// The configured author, or the first local user when none is configured.
pub async fn resolve_author(db: &Database, configured: Option<&str>) -> Result<User, MigrateError> {
    match provided(configured) {
        Some(username) => db.find_user(&username).await?.ok_or_else(|| {
            MigrateError::Configuration(format!(
                "Invalid username for default author \"{username}\""
            ))
        }),
        None => {
            let user = db.first_user().await?.ok_or_else(|| {
                MigrateError::Configuration(
                    "No local users exist; create one with `add-user` or pass --author"
                        .to_string(),
                )
            })?;
            tracing::info!(author = %user.username, "No author configured, using first local user");
            Ok(user)
        }
    }
}

/// The configured blog id, or one picked from the account's blogs.
pub async fn resolve_blog_id<S, P>(
    source: &S,
    prompt: &mut P,
    configured: Option<&str>,
) -> Result<String, MigrateError>
where
    S: BlogSource + ?Sized,
    P: Prompt + ?Sized,
{
    if let Some(blog_id) = provided(configured) {
        return Ok(blog_id);
    }
    let blogs: Vec<RemoteBlog> = source.blogs().try_collect().await?;
    select_blog(prompt, &blogs)
}

/// Resolve everything the post loop needs, after login.
///
/// Nothing is written to the store unless every step succeeds; the site is
/// registered last.
pub async fn prepare<S, P>(
    source: &S,
    db: &Database,
    prompt: &mut P,
    options: &SessionOptions,
) -> Result<MigrationPlan, MigrateError>
where
    S: BlogSource + ?Sized,
    P: Prompt + ?Sized,
{
    let author = resolve_author(db, options.author.as_deref()).await?;
    let blog_id = resolve_blog_id(source, prompt, options.blog_id.as_deref()).await?;
    let category_title = resolve_category_title(prompt, options.category_title.as_deref())?;
    let site = db
        .get_or_create_site(&options.site_domain, &options.site_name)
        .await?;

    tracing::info!(
        site = %site.domain,
        author = %author.username,
        blog_id = %blog_id,
        category = %category_title,
        "Migration plan resolved"
    );
    Ok(MigrationPlan {
        site,
        author,
        blog_id,
        category_title,
    })
}
