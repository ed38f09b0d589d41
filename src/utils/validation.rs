//! URL and input validation utilities

use url::Url;

/// Whether `url` is an absolute http(s) URL with a host, i.e. something worth fetching
pub fn is_fetchable_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}
