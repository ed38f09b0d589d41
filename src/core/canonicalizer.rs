//! URL canonicalization
//!
//! Maps raw link text from the sheet to a stable cache key. Every spelling of
//! the same video (short links, tracking parameters, fragments, trailing
//! slashes) collapses to one string. Pure: no I/O.

use url::{ParseError, Url};

/// Host of the short-link form that gets rewritten to a watch URL
pub const SHORT_LINK_HOST: &str = "youtu.be";

/// Long-form watch URL the short links expand to
pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch";

/// Query parameters that never identify a video
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "si",
    "feature",
    "t",
];

/// Canonical form of `raw`. Empty input gives an empty string; input that
/// cannot be parsed as a URL comes back trimmed but otherwise untouched.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut url = match parse_with_default_scheme(trimmed) {
        Some(url) => url,
        None => return trimmed.to_string(),
    };

    url.set_fragment(None);

    if url.cannot_be_a_base() {
        return url.to_string();
    }

    if let Some(watch_url) = expand_short_link(&url) {
        return watch_url;
    }

    strip_tracking_params(&mut url);
    strip_trailing_slash(&mut url);

    url.to_string()
}

/// Parse `input`, assuming `https://` when no scheme is given.
fn parse_with_default_scheme(input: &str) -> Option<Url> {
    match Url::parse(input) {
        // `host:port/path` parses with the host as its scheme
        Ok(url) if url.scheme().contains('.') => {
            Url::parse(&format!("https://{}", input)).ok().or(Some(url))
        }
        Ok(url) => Some(url),
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", input)).ok(),
        Err(_) => None,
    }
}

fn expand_short_link(url: &Url) -> Option<String> {
    if !url.host_str()?.eq_ignore_ascii_case(SHORT_LINK_HOST) {
        return None;
    }

    let video_id = url.path_segments()?.find(|segment| !segment.is_empty())?;

    let mut watch = Url::parse(WATCH_URL_BASE).ok()?;
    watch.query_pairs_mut().append_pair("v", video_id);
    Some(watch.to_string())
}

/// Drop tracking and blank-valued pairs, keeping the rest in their original order.
fn strip_tracking_params(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, value)| !value.is_empty() && !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
}

fn strip_trailing_slash(url: &mut Url) {
    let path = url.path();
    if path == "/" || !path.ends_with('/') {
        return;
    }

    // All trailing slashes go, so a second pass has nothing left to strip.
    let trimmed = match path.trim_end_matches('/') {
        "" => "/".to_string(),
        rest => rest.to_string(),
    };
    url.set_path(&trimmed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_link_matches_watch_url() {
        assert_eq!(
            canonicalize("https://youtu.be/abc123"),
            canonicalize("https://www.youtube.com/watch?v=abc123&feature=share")
        );
        assert_eq!(
            canonicalize("https://youtu.be/abc123"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_short_link_drops_its_query() {
        assert_eq!(
            canonicalize("https://youtu.be/abc123?t=42&si=xyz"),
            "https://www.youtube.com/watch?v=abc123"
        );
        assert_eq!(
            canonicalize("youtu.be/abc123"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_short_link_without_id_is_left_alone() {
        assert_eq!(canonicalize("https://youtu.be/"), "https://youtu.be/");
    }

    #[test]
    fn test_tracking_params_removed() {
        assert_eq!(
            canonicalize("https://x.com/v?utm_source=a&id=1"),
            "https://x.com/v?id=1"
        );
        assert_eq!(
            canonicalize("https://x.com/v?utm_medium=b&utm_campaign=c&utm_term=d&utm_content=e"),
            "https://x.com/v"
        );
        assert_eq!(
            canonicalize("https://www.youtube.com/watch?v=abc123&t=90s"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_query_order_and_repeats_kept() {
        assert_eq!(
            canonicalize("https://x.com/v?b=2&utm_term=z&a=1&b=3"),
            "https://x.com/v?b=2&a=1&b=3"
        );
    }

    #[test]
    fn test_blank_query_values_dropped() {
        assert_eq!(canonicalize("https://x.com/v?empty=&id=7"), "https://x.com/v?id=7");
    }

    #[test]
    fn test_trailing_slash() {
        assert_eq!(canonicalize("https://x.com/p/"), canonicalize("https://x.com/p"));
        assert_eq!(canonicalize("https://x.com/p/"), "https://x.com/p");
        assert_eq!(canonicalize("https://x.com/"), "https://x.com/");
        assert_eq!(canonicalize("https://x.com"), "https://x.com/");
        assert_eq!(canonicalize("https://x.com/p//"), "https://x.com/p");
    }

    #[test]
    fn test_fragment_removed() {
        assert_eq!(
            canonicalize("https://www.twitch.tv/videos/123456#chat"),
            "https://www.twitch.tv/videos/123456"
        );
    }

    #[test]
    fn test_scheme_defaults_to_https() {
        assert_eq!(
            canonicalize("www.twitch.tv/videos/987/"),
            "https://www.twitch.tv/videos/987"
        );
        assert_eq!(canonicalize("http://x.com/p/"), "http://x.com/p");
    }

    #[test]
    fn test_whitespace_and_empty_input() {
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("   \t\n"), "");
        assert_eq!(
            canonicalize("  https://x.com/p/  "),
            "https://x.com/p"
        );
    }

    #[test]
    fn test_unparseable_input_returned_trimmed() {
        assert_eq!(canonicalize("  not a url  "), "not a url");
        assert_eq!(canonicalize("http://[::1"), "http://[::1");
    }

    #[test]
    fn test_host_case_normalized() {
        assert_eq!(
            canonicalize("https://WWW.Twitch.TV/videos/5"),
            "https://www.twitch.tv/videos/5"
        );
        assert_eq!(
            canonicalize("https://YOUTU.BE/abc123"),
            "https://www.youtube.com/watch?v=abc123"
        );
    }

    #[test]
    fn test_host_with_port_gets_default_scheme() {
        assert_eq!(canonicalize("x.com:8080/p/"), "https://x.com:8080/p");
        assert_eq!(canonicalize("www.twitch.tv:443/videos/9"), "https://www.twitch.tv/videos/9");
        assert_eq!(canonicalize("mailto:someone@example.com"), "mailto:someone@example.com");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let samples = [
            "",
            "  ",
            "not a url",
            "https://youtu.be/abc123?t=1",
            "youtu.be/a%20b",
            "https://youtu.be/",
            "https://www.youtube.com/watch?v=abc123&feature=share&list=PL1",
            "https://www.youtube.com/shorts/abc123/",
            "https://x.com/v?utm_source=a&id=1&id=2",
            "https://x.com/v?q=a+b&r=%2F",
            "https://x.com/p///",
            "https://x.com/",
            "x.com/p/#top",
            "x.com:8080/p/",
            "mailto:someone@example.com",
            "https://www.twitch.tv/videos/123456?filter=archives&sort=time",
        ];

        for sample in samples {
            let once = canonicalize(sample);
            let twice = canonicalize(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }
}
