use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::atom::{parse_blogs, parse_comments, parse_posts, AtomError};
use super::types::{RemoteBlog, RemoteComment, RemotePost};
use super::{BlogSource, FeedStream};
use crate::util::{validate_endpoint, EndpointError};

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_REASON_LEN: usize = 200;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised by the remote feed client.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The login endpoint rejected the credentials
    #[error("Incorrect Blogger username or password")]
    Authentication,
    /// The service answered with a non-2xx status (e.g. comments disabled)
    #[error("Request failed with status {status}: {reason}")]
    Request { status: u16, reason: String },
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// A configured base URL is unusable
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

impl FeedError {
    /// True for errors where the service itself refused the request.
    ///
    /// A comment listing failing this way means the post has no readable
    /// comments and is treated as zero comments.
    pub fn is_request_error(&self) -> bool {
        matches!(self, FeedError::Request { .. })
    }
}

impl From<AtomError> for FeedError {
    fn from(e: AtomError) -> Self {
        FeedError::Parse(e.to_string())
    }
}

/// Redirects: at most 3, no loops, never from HTTPS down to plain HTTP.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }
        let downgrade = url.scheme() == "http"
            && attempt.previous().iter().any(|prev| prev.scheme() == "https");
        if downgrade {
            return attempt.error("Refusing redirect from HTTPS to HTTP");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// HTTP client for talking to Blogger.
pub fn http_client() -> Result<reqwest::Client, FeedError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("blogger-import/", env!("CARGO_PKG_VERSION")))
        .redirect(redirect_policy())
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;
    Ok(client)
}

/// Where to authenticate and where to read feeds from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login_url: String,
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: "https://www.google.com/accounts/ClientLogin".to_string(),
            api_base: "https://www.blogger.com".to_string(),
        }
    }
}

/// An authenticated session against the Blogger feed API.
///
/// The session token never appears in `Debug` output.
pub struct BloggerClient {
    http: reqwest::Client,
    api_base: Url,
    token: SecretString,
    timeout: Duration,
}

impl std::fmt::Debug for BloggerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloggerClient")
            .field("api_base", &self.api_base.as_str())
            .field("token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BloggerClient {
    /// Authenticate with ClientLogin and return a session.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Authentication`] - the credentials were rejected (HTTP 403)
    /// - [`FeedError::Request`] - any other non-2xx answer from the login endpoint
    /// - [`FeedError::Parse`] - a 2xx answer without an `Auth=` line
    /// - [`FeedError::Endpoint`] - a base URL is not HTTPS (loopback excepted)
    pub async fn login(
        http: reqwest::Client,
        endpoints: &Endpoints,
        username: &str,
        password: &SecretString,
        timeout: Option<Duration>,
    ) -> Result<Self, FeedError> {
        let login_url = validate_endpoint(&endpoints.login_url)?;
        let api_base = Url::parse(&validate_endpoint(&endpoints.api_base)?)
            .map_err(EndpointError::InvalidUrl)?;
        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        // The deadline covers the body read as well as the headers
        let token = tokio::time::timeout(timeout, request_token(&http, &login_url, username, password))
            .await
            .map_err(|_| FeedError::Timeout(timeout.as_secs()))??;

        tracing::info!(username = %username, "Authenticated with Blogger");
        Ok(Self {
            http,
            api_base,
            token,
            timeout,
        })
    }

    /// Build `{api_base}/feeds/<segments...>` with each segment percent-encoded.
    fn feed_url(&self, segments: &[&str]) -> Result<Url, FeedError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| FeedError::Parse(format!("cannot extend base URL {}", self.api_base)))?
            .pop_if_empty()
            .push("feeds")
            .extend(segments);
        Ok(url)
    }

    /// Fetch one feed document. One round-trip, no retry.
    ///
    /// The timeout spans the whole exchange, body included.
    async fn get_feed(&self, url: Url) -> Result<Vec<u8>, FeedError> {
        tokio::time::timeout(self.timeout, self.fetch_feed(url))
            .await
            .map_err(|_| FeedError::Timeout(self.timeout.as_secs()))?
    }

    async fn fetch_feed(&self, url: Url) -> Result<Vec<u8>, FeedError> {
        let response = self
            .http
            .get(url.clone())
            .header(
                "Authorization",
                format!("GoogleLogin auth={}", self.token.expose_secret()),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::debug!(url = %url, status = %status, "Feed request refused");
            return Err(FeedError::Request {
                status: status.as_u16(),
                reason: first_line(&text),
            });
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }

    /// A lazy listing: the request is issued when the stream is first polled.
    fn listing<'a, T: Send + 'a>(
        &'a self,
        segments: Vec<&'a str>,
        parse: fn(&[u8]) -> Result<Vec<T>, AtomError>,
    ) -> FeedStream<'a, T> {
        stream::once(async move {
            let url = self.feed_url(&segments)?;
            let bytes = self.get_feed(url.clone()).await?;
            let items = parse(&bytes)?;
            tracing::debug!(url = %url, count = items.len(), "Fetched feed");
            Ok::<_, FeedError>(stream::iter(items.into_iter().map(Ok::<T, FeedError>)))
        })
        .try_flatten()
        .boxed()
    }
}

impl BlogSource for BloggerClient {
    fn blogs(&self) -> FeedStream<'_, RemoteBlog> {
        self.listing(vec!["default", "blogs"], parse_blogs)
    }

    fn posts<'a>(&'a self, blog_id: &'a str) -> FeedStream<'a, RemotePost> {
        self.listing(vec![blog_id, "posts", "default"], parse_posts)
    }

    fn comments<'a>(&'a self, blog_id: &'a str, post_id: &'a str) -> FeedStream<'a, RemoteComment> {
        self.listing(vec![blog_id, post_id, "comments", "default"], parse_comments)
    }
}

/// POST the ClientLogin form and pull the `Auth=` token out of the answer.
async fn request_token(
    http: &reqwest::Client,
    login_url: &str,
    username: &str,
    password: &SecretString,
) -> Result<SecretString, FeedError> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("accountType", "GOOGLE")
        .append_pair("Email", username)
        .append_pair("Passwd", password.expose_secret())
        .append_pair("service", "blogger")
        .append_pair("source", concat!("blogger-import-", env!("CARGO_PKG_VERSION")))
        .finish();

    let response = http
        .post(login_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        let text = response.text().await.unwrap_or_default();
        tracing::warn!(
            username = %username,
            reason = %first_line(&text),
            "Login rejected"
        );
        return Err(FeedError::Authentication);
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(FeedError::Request {
            status: status.as_u16(),
            reason: first_line(&text),
        });
    }

    let text = response.text().await?;
    text.lines()
        .find_map(|line| line.strip_prefix("Auth="))
        .map(|t| SecretString::from(t.trim().to_string()))
        .ok_or_else(|| FeedError::Parse("login response carried no Auth token".to_string()))
}

/// First non-empty line of a response body, capped in length.
fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .chars()
        .take(MAX_REASON_LEN)
        .collect()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FeedError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FeedError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
