//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::{AppError, Result};

/// Append path segments to a base URL.
///
/// Segments are percent-encoded, so ids can be passed as-is. A trailing
/// slash on the base is ignored.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("Base URL cannot carry a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Extract the host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("http://localhost:8000", &["api", "iit"]).unwrap().as_str(),
            "http://localhost:8000/api/iit"
        );
        assert_eq!(
            endpoint("https://api.clerk.com/v1/", &["users", "user_1", "metadata"])
                .unwrap()
                .as_str(),
            "https://api.clerk.com/v1/users/user_1/metadata"
        );
        assert_eq!(
            endpoint("http://localhost:8000", &["exams", "a b"]).unwrap().as_str(),
            "http://localhost:8000/exams/a%20b"
        );
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(endpoint("not a url", &["api"]).is_err());
        assert!(endpoint("mailto:admin@example.com", &["api"]).is_err());
    }

    #[test]
    fn test_get_domain() {
        assert_eq!(
            get_domain("https://api.clerk.com/v1"),
            Some("api.clerk.com".to_string())
        );
        assert_eq!(get_domain("nope"), None);
    }
}
