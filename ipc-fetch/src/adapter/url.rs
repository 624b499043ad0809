//! Request URL building.
//!
//! Follows the conventions of axios: an absolute request URL ignores the base
//! URL, a relative one is joined onto it, and query parameters are appended
//! after stripping any fragment.

use super::config::Params;

/// Returns whether `url` has a scheme (`http://`) or is protocol-relative (`//`).
pub fn is_absolute_url(url: &str) -> bool {
    if url.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid_scheme && rest.starts_with("//")
}

/// Join a relative URL onto a base URL.
pub fn combine_urls(base_url: &str, relative_url: &str) -> String {
    if relative_url.is_empty() {
        return base_url.to_owned();
    }
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{}/{}", base, relative_url.trim_start_matches('/'))
}

/// Resolve the request URL against an optional base URL.
pub fn build_full_path(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !base.is_empty() && !is_absolute_url(url) => combine_urls(base, url),
        _ => url.to_owned(),
    }
}

/// Percent-encode one query key or value.
///
/// Characters that `encodeURIComponent` leaves alone stay unescaped, and
/// `:`, `$`, `,`, `[` and `]` are re-opened for readability. Spaces become `+`.
pub fn encode_param(value: &str) -> String {
    const REOPENED: [(&str, &str); 11] = [
        ("%21", "!"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
        ("%2A", "*"),
        ("%3A", ":"),
        ("%24", "$"),
        ("%2C", ","),
        ("%20", "+"),
        ("%5B", "["),
        ("%5D", "]"),
    ];

    let mut encoded = urlencoding::encode(value).into_owned();
    for (escaped, plain) in REOPENED {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, plain);
        }
    }
    encoded
}

/// Append serialized parameters to `url`.
pub fn build_url(url: &str, params: &Params) -> String {
    let serialized = params.serialize();
    if serialized.is_empty() {
        return url.to_owned();
    }

    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{serialized}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_urls() {
        assert!(is_absolute_url("http://example.com"));
        assert!(is_absolute_url("HTTPS://example.com"));
        assert!(is_absolute_url("custom-scheme-v1.0://example.com"));
        assert!(is_absolute_url("//example.com"));
        assert!(!is_absolute_url("/api/users"));
        assert!(!is_absolute_url("api/users"));
        assert!(!is_absolute_url("123://example.com"));
        assert!(!is_absolute_url("!valid://example.com"));
        assert!(!is_absolute_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_combine_urls() {
        assert_eq!(combine_urls("http://api.test/", "/users"), "http://api.test/users");
        assert_eq!(combine_urls("http://api.test", "users"), "http://api.test/users");
        assert_eq!(combine_urls("http://api.test//", "//users"), "http://api.test/users");
        assert_eq!(combine_urls("http://api.test/v1", ""), "http://api.test/v1");
    }

    #[test]
    fn test_full_path_precedence() {
        assert_eq!(
            build_full_path(Some("http://api.test"), "http://other.test/x"),
            "http://other.test/x"
        );
        assert_eq!(
            build_full_path(Some("http://api.test"), "/x"),
            "http://api.test/x"
        );
        assert_eq!(build_full_path(None, "/x"), "/x");
        assert_eq!(build_full_path(Some(""), "/x"), "/x");
    }

    #[test]
    fn test_encode_param() {
        assert_eq!(encode_param("a b"), "a+b");
        assert_eq!(encode_param("foo:bar$,[]"), "foo:bar$,[]");
        assert_eq!(encode_param("a&b=c"), "a%26b%3Dc");
        assert_eq!(encode_param("it's (ok)!*"), "it's+(ok)!*");
        assert_eq!(encode_param("ü"), "%C3%BC");
    }

    #[test]
    fn test_build_url_appends_params() {
        let params = Params::pairs([("q", "rust lang"), ("page", "2")]);
        assert_eq!(
            build_url("http://api.test/search", &params),
            "http://api.test/search?q=rust+lang&page=2"
        );
        assert_eq!(
            build_url("http://api.test/search?x=1#top", &params),
            "http://api.test/search?x=1&q=rust+lang&page=2"
        );
    }

    #[test]
    fn test_build_url_without_params_keeps_fragment() {
        assert_eq!(
            build_url("http://api.test/page#top", &Params::default()),
            "http://api.test/page#top"
        );
    }

    #[test]
    fn test_build_url_with_serializer() {
        let params = Params::pairs([("ids", "1"), ("ids", "2")])
            .with_serializer(|pairs| {
                let ids: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
                format!("ids={}", ids.join(","))
            });
        assert_eq!(build_url("/items", &params), "/items?ids=1,2");
    }
}
