//! URL validation helpers.

use thiserror::Error;
use url::Url;

pub type MediaUrlResult<T> = Result<T, MediaUrlError>;

/// Errors raised when validating remote media references.
#[derive(Debug, Error)]
pub enum MediaUrlError {
    #[error("Invalid URL: {0}")]
    Invalid(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Parse and validate a remote media reference.
///
/// Only http(s) URLs are accepted; records and templates never point at
/// arbitrary schemes.
pub fn parse_remote_url(raw: &str) -> MediaUrlResult<Url> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(MediaUrlError::UnsupportedScheme(other.to_string())),
    }
}
