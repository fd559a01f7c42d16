// src/utils/url.rs

//! URL canonicalization.

/// Reduce a URL to its dedup form: scheme + lower-cased host (without a
/// leading "www.") + path. Query string and fragment are dropped.
///
/// Anything that does not parse as an absolute URL yields an empty string.
///
/// # Examples
/// ```
/// use jobfeed::utils::canonical_url;
///
/// assert_eq!(
///     canonical_url("https://WWW.Acme.com/job?x=1#apply"),
///     "https://acme.com/job"
/// );
/// assert_eq!(canonical_url("not a url"), "");
/// ```
pub fn canonical_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let parsed = match url::Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(_) => return String::new(),
    };
    let host = match parsed.host_str() {
        Some(host) => host.to_lowercase(),
        None => return String::new(),
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);
    format!("{}://{}{}", parsed.scheme(), host, parsed.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_query_and_fragment() {
        assert_eq!(
            canonical_url("https://example.com/a/b?q=1&p=2#frag"),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn test_lowercases_host_and_strips_www() {
        assert_eq!(
            canonical_url("https://WWW.Example.COM/Path"),
            "https://example.com/Path"
        );
    }

    #[test]
    fn test_keeps_scheme() {
        assert_eq!(canonical_url("http://example.com/x"), "http://example.com/x");
    }

    #[test]
    fn test_unparseable_is_empty() {
        assert_eq!(canonical_url(""), "");
        assert_eq!(canonical_url("not a url"), "");
        assert_eq!(canonical_url("/relative/path"), "");
    }

    #[test]
    fn test_identical_after_canonicalization() {
        // Two spellings of the same posting collapse to one key.
        assert_eq!(
            canonical_url("https://Acme.com/job?x=1"),
            canonical_url("https://www.acme.com/job")
        );
    }
}
