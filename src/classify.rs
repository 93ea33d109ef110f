//! Internal/external partitioning of script URLs.
//!
//! A script is internal when its URL has no network location (a relative or
//! path-only reference) or when the network location is exactly the scanned
//! subdomain. The comparison is literal: `www.example.com` and
//! `example.com:8080` are different hosts from `example.com`.

/// Returns the network location (`user@host:port`) of `url`, or `""` if it has none.
///
/// Only absolute (`scheme://...`) and protocol-relative (`//...`) URLs carry
/// a network location. The text is returned as written, without
/// normalisation of case or default ports.
///
/// # Example
///
/// ```
/// use scriptscout::classify::network_location;
///
/// assert_eq!(network_location("https://cdn.example:8443/a.js?v=1"), "cdn.example:8443");
/// assert_eq!(network_location("//cdn.example/a.js"), "cdn.example");
/// assert_eq!(network_location("/static/a.js"), "");
/// ```
pub fn network_location(url: &str) -> &str {
    let rest = match split_scheme(url) {
        Some((_, rest)) => rest,
        None => url,
    };

    let Some(after_slashes) = rest.strip_prefix("//") else {
        return "";
    };

    let end = after_slashes
        .find(['/', '?', '#'])
        .unwrap_or(after_slashes.len());
    &after_slashes[..end]
}

/// Splits `scheme:rest` when `url` begins with a syntactically valid scheme.
fn split_scheme(url: &str) -> Option<(&str, &str)> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];

    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic()
        || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }

    Some((scheme, &url[colon + 1..]))
}

/// Partitions `urls` into `(internal, external)`, preserving input order.
///
/// Every URL lands in exactly one of the two lists.
pub fn classify_scripts(urls: &[String], subdomain: &str) -> (Vec<String>, Vec<String>) {
    urls.iter().cloned().partition(|url| {
        let location = network_location(url);
        location.is_empty() || location == subdomain
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(urls: &[&str]) -> Vec<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_network_location() {
        assert_eq!(network_location("http://a.test/app.js"), "a.test");
        assert_eq!(network_location("http://a.test"), "a.test");
        assert_eq!(network_location("HTTPS://User@A.test:80/x"), "User@A.test:80");
        assert_eq!(network_location("//cdn.example?x=1"), "cdn.example");
        assert_eq!(network_location("app.js"), "");
        assert_eq!(network_location("./js/app.js"), "");
        assert_eq!(network_location("data:text/javascript,alert(1)"), "");
        assert_eq!(network_location("/path/with:colon.js"), "");
    }

    #[test]
    fn test_classify_scripts() {
        let urls = owned(&[
            "/app.js",
            "//cdn.example/jquery-1.9.0.min.js",
            "http://a.test/main.js",
            "https://www.a.test/other.js",
            "js/local.js",
            "http://a.test:8080/port.js",
        ]);

        let (internal, external) = classify_scripts(&urls, "a.test");

        assert_eq!(
            internal,
            owned(&["/app.js", "http://a.test/main.js", "js/local.js"])
        );
        assert_eq!(
            external,
            owned(&[
                "//cdn.example/jquery-1.9.0.min.js",
                "https://www.a.test/other.js",
                "http://a.test:8080/port.js",
            ])
        );
    }

    #[test]
    fn test_partition_is_complete_and_idempotent() {
        let urls = owned(&[
            "/a.js",
            "//b.test/b.js",
            "/a.js",
            "http://a.test/c.js",
            "mailto:someone",
        ]);

        let first = classify_scripts(&urls, "a.test");
        let second = classify_scripts(&urls, "a.test");
        assert_eq!(first, second);

        let (internal, external) = first;
        assert_eq!(internal.len() + external.len(), urls.len());

        let mut combined: Vec<_> = internal.into_iter().chain(external).collect();
        let mut expected = urls.clone();
        combined.sort();
        expected.sort();
        assert_eq!(combined, expected);
    }

    #[test]
    fn test_empty_input() {
        let (internal, external) = classify_scripts(&[], "a.test");
        assert!(internal.is_empty());
        assert!(external.is_empty());
    }
}
