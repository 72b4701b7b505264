//! Domain normalization.

use log::warn;
use rustls::pki_types::ServerName;

/// Hostnames longer than this are rejected (RFC 1035 limit).
const MAX_DOMAIN_LENGTH: usize = 253;

/// Normalizes one raw input value into a bare, lowercase hostname.
///
/// Accepts `example.com`, `https://Example.com/path`, `example.com:8443` and
/// similar. Returns `None` for blank values and for hosts that are neither a
/// valid DNS name nor an IPv4 literal.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = match url::Url::parse(&with_scheme) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Skipping invalid domain {trimmed:?}: {e}");
            return None;
        }
    };

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.trim_end_matches('.').to_ascii_lowercase(),
        _ => {
            warn!("Skipping value without a host: {trimmed:?}");
            return None;
        }
    };

    if host.is_empty() || host.len() > MAX_DOMAIN_LENGTH {
        warn!("Skipping domain with invalid length: {trimmed:?}");
        return None;
    }

    if let Err(e) = ServerName::try_from(host.as_str()) {
        warn!("Skipping {trimmed:?}: {e}");
        return None;
    }

    Some(host)
}

#[cfg(test)]
mod tests {
    use super::normalize_domain;

    #[test]
    fn test_bare_domain_is_lowercased() {
        assert_eq!(normalize_domain("  Example.COM "), Some("example.com".into()));
    }

    #[test]
    fn test_scheme_path_and_port_are_stripped() {
        assert_eq!(
            normalize_domain("https://www.example.com/about?x=1"),
            Some("www.example.com".into())
        );
        assert_eq!(normalize_domain("http://example.com:8443"), Some("example.com".into()));
        assert_eq!(normalize_domain("example.com/path"), Some("example.com".into()));
    }

    #[test]
    fn test_trailing_dot_is_removed() {
        assert_eq!(normalize_domain("example.com."), Some("example.com".into()));
    }

    #[test]
    fn test_blank_and_garbage_are_rejected() {
        assert_eq!(normalize_domain(""), None);
        assert_eq!(normalize_domain("   "), None);
        assert_eq!(normalize_domain("http://"), None);
        assert_eq!(normalize_domain("exa mple.com"), None);
    }

    #[test]
    fn test_hosts_that_are_not_dns_names_are_rejected() {
        assert_eq!(normalize_domain("rank,domain"), None);
        assert_eq!(normalize_domain("1,google.com"), None);
        assert_eq!(normalize_domain("a;b.example"), None);
        assert_eq!(normalize_domain("[::1]"), None);
        assert_eq!(normalize_domain("127.0.0.1"), Some("127.0.0.1".into()));
        assert_eq!(normalize_domain("xn--bcher-kva.example"), Some("xn--bcher-kva.example".into()));
    }

    #[test]
    fn test_overlong_domain_is_rejected() {
        let long = format!("{}.com", "a".repeat(260));
        assert_eq!(normalize_domain(&long), None);
    }
}
