//! URL normalization ahead of fingerprinting.
//!
//! Two spellings of the same address must produce the same fingerprint, so
//! every URL goes through [`UrlNormalizer::normalize`] first. Only the scheme
//! and host are canonicalized:
//!
//! - surrounding whitespace is trimmed
//! - `http://` is prepended when the input has no `://`
//! - the scheme is lowercased
//! - the host is IDNA-encoded (and therefore lowercased)
//! - userinfo, port, path, query and fragment are kept byte for byte

use thiserror::Error;

/// Default cap on URL length in bytes.
pub const DEFAULT_MAX_URL_LENGTH: usize = 4096;

/// Errors that can occur during URL normalization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UrlNormalizationError {
    #[error("URL is empty")]
    Empty,

    #[error("URL is {length} bytes long, the limit is {max}")]
    TooLong { length: usize, max: usize },

    #[error("Invalid host '{0}'")]
    InvalidHost(String),

    #[error("URL points back at this service")]
    SelfReference,
}

/// Normalizes URLs for one deployment.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    max_length: usize,
    own_host: Option<String>,
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_URL_LENGTH, None)
    }
}

impl UrlNormalizer {
    /// `own_host` is the public host of this service; links to it are refused.
    pub fn new(max_length: usize, own_host: Option<&str>) -> Self {
        Self {
            max_length,
            own_host: own_host.map(|host| host.to_ascii_lowercase()),
        }
    }

    /// # Errors
    ///
    /// See [`UrlNormalizationError`].
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let normalizer = UrlNormalizer::default();
    /// assert_eq!(
    ///     normalizer.normalize(" Bücher.example/Regal?x=1#top ").unwrap(),
    ///     "http://xn--bcher-kva.example/Regal?x=1#top"
    /// );
    /// ```
    pub fn normalize(&self, input: &str) -> Result<String, UrlNormalizationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UrlNormalizationError::Empty);
        }
        self.check_length(trimmed)?;

        let (scheme, rest) = trimmed.split_once("://").unwrap_or(("http", trimmed));

        let netloc_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (netloc, tail) = rest.split_at(netloc_end);
        let (userinfo, host, port) = split_netloc(netloc);

        let host = encode_host(host)?;
        if self.own_host.as_deref() == Some(host.as_str()) {
            return Err(UrlNormalizationError::SelfReference);
        }

        let mut normalized = String::with_capacity(trimmed.len() + 8);
        normalized.push_str(&scheme.to_ascii_lowercase());
        normalized.push_str("://");
        if let Some(userinfo) = userinfo {
            normalized.push_str(userinfo);
            normalized.push('@');
        }
        normalized.push_str(&host);
        if let Some(port) = port {
            normalized.push(':');
            normalized.push_str(port);
        }
        normalized.push_str(tail);

        self.check_length(&normalized)?;
        Ok(normalized)
    }

    fn check_length(&self, url: &str) -> Result<(), UrlNormalizationError> {
        if url.len() > self.max_length {
            return Err(UrlNormalizationError::TooLong {
                length: url.len(),
                max: self.max_length,
            });
        }
        Ok(())
    }
}

/// Splits `user:pass@host:port` into its parts. IPv6 literals keep their brackets.
fn split_netloc(netloc: &str) -> (Option<&str>, &str, Option<&str>) {
    let (userinfo, hostport) = match netloc.rsplit_once('@') {
        Some((userinfo, hostport)) => (Some(userinfo), hostport),
        None => (None, netloc),
    };

    let port_start = if hostport.starts_with('[') {
        hostport.find(']').map(|end| end + 1)
    } else {
        hostport.rfind(':')
    };

    match port_start {
        Some(idx) if hostport[idx..].starts_with(':') => {
            let port = &hostport[idx + 1..];
            if port.bytes().all(|b| b.is_ascii_digit()) {
                (userinfo, &hostport[..idx], Some(port))
            } else {
                (userinfo, hostport, None)
            }
        }
        _ => (userinfo, hostport, None),
    }
}

fn encode_host(host: &str) -> Result<String, UrlNormalizationError> {
    if host.is_empty() {
        return Err(UrlNormalizationError::InvalidHost(String::new()));
    }
    url::Host::parse(host)
        .map(|parsed| parsed.to_string())
        .map_err(|_| UrlNormalizationError::InvalidHost(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
        UrlNormalizer::default().normalize(input)
    }

    #[test]
    fn test_normalize_prepends_http() {
        assert_eq!(
            normalize_url("example.com/a").unwrap(),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_normalize_keeps_existing_scheme() {
        assert_eq!(
            normalize_url("https://example.com/a").unwrap(),
            "https://example.com/a"
        );
        assert_eq!(
            normalize_url("FTP://example.com/file").unwrap(),
            "ftp://example.com/file"
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(
            normalize_url("  http://example.com/  \n").unwrap(),
            "http://example.com/"
        );
    }

    #[test]
    fn test_normalize_bare_host_has_no_trailing_slash() {
        assert_eq!(normalize_url("example.com").unwrap(), "http://example.com");
    }

    #[test]
    fn test_normalize_lowercases_host_only() {
        assert_eq!(
            normalize_url("http://EXAMPLE.com/Path?Q=A").unwrap(),
            "http://example.com/Path?Q=A"
        );
    }

    #[test]
    fn test_normalize_idna_host() {
        assert_eq!(
            normalize_url("http://Bücher.example/x").unwrap(),
            "http://xn--bcher-kva.example/x"
        );
    }

    #[test]
    fn test_normalize_keeps_query_and_fragment_verbatim() {
        assert_eq!(
            normalize_url("example.com/a?b=%20c&d=Ü#Frag").unwrap(),
            "http://example.com/a?b=%20c&d=Ü#Frag"
        );
    }

    #[test]
    fn test_normalize_keeps_userinfo_and_port() {
        assert_eq!(
            normalize_url("http://user:pw@Example.com:8080/x").unwrap(),
            "http://user:pw@example.com:8080/x"
        );
    }

    #[test]
    fn test_normalize_ipv6_literal() {
        assert_eq!(
            normalize_url("http://[::1]:8080/x").unwrap(),
            "http://[::1]:8080/x"
        );
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(normalize_url("   "), Err(UrlNormalizationError::Empty));
        assert!(matches!(
            normalize_url("http:///path"),
            Err(UrlNormalizationError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_invalid_host() {
        assert!(matches!(
            normalize_url("http://exa mple.com/"),
            Err(UrlNormalizationError::InvalidHost(_))
        ));
    }

    #[test]
    fn test_normalize_enforces_length_cap() {
        let normalizer = UrlNormalizer::new(30, None);
        assert!(normalizer.normalize("http://example.com/").is_ok());
        assert!(matches!(
            normalizer.normalize(&format!("http://example.com/{}", "a".repeat(20))),
            Err(UrlNormalizationError::TooLong { max: 30, .. })
        ));
    }

    #[test]
    fn test_normalize_rejects_own_host() {
        let normalizer = UrlNormalizer::new(DEFAULT_MAX_URL_LENGTH, Some("yaturl.net"));
        assert_eq!(
            normalizer.normalize("https://YATURL.net/abcd"),
            Err(UrlNormalizationError::SelfReference)
        );
        assert!(normalizer.normalize("https://example.net/yaturl.net").is_ok());
    }
}
