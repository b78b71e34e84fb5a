use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors for remote service base URLs.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-loopback host would send credentials in clear text.
    #[error("Insecure URL: HTTPS required (except localhost for testing): {0}")]
    Insecure(String),
}

/// Validates a base URL that credentials or session tokens are sent to.
///
/// SEC-002: HTTPS is required. Plain HTTP is accepted only for loopback
/// hosts so tests can point the client at a local mock server.
///
/// Any trailing slash is removed so paths can be appended with `format!`.
///
/// # Examples
///
/// ```
/// use blogger_import::util::validate_endpoint;
///
/// assert!(validate_endpoint("https://www.blogger.com").is_ok());
/// assert!(validate_endpoint("http://127.0.0.1:8080").is_ok());
/// assert!(validate_endpoint("http://www.blogger.com").is_err());
/// ```
pub fn validate_endpoint(url_str: &str) -> Result<String, EndpointError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_loopback_host(&url) {
                return Err(EndpointError::Insecure(url_str.to_owned()));
            }
            tracing::warn!(url = %url_str, "Using non-HTTPS endpoint (localhost only)");
        }
        scheme => return Err(EndpointError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(url_str.trim_end_matches('/').to_owned())
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => {
            // Strip brackets from IPv6 addresses for parsing
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
        }
        None => false,
    }
}
