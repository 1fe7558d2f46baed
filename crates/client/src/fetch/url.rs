//! URL resolution for intercepted requests and precache entries.

use soluce_core::Error;
use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Resolve a request URL against the worker's origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Absolute URLs are kept (any scheme, so extension URLs can be bypassed);
///    relative ones are joined onto `origin`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn resolve(origin: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        Err(e) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    if let Some(host) = parsed.host_str()
        && host.chars().any(|c| c.is_ascii_uppercase())
    {
        let lower = host.to_lowercase();
        parsed
            .set_host(Some(&lower))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
