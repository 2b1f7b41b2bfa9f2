//! Link entity: a stored mapping from a short hash to a URL.

use chrono::{DateTime, Utc};

use crate::domain::fingerprint::{FullHash, ShortHash};

/// A shortened URL as persisted by the link store.
///
/// `short_hash` is always a prefix of `full_hash`. `comment` is only set once
/// the link has been administratively blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub short_hash: ShortHash,
    pub full_hash: FullHash,
    pub url: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Link {
    pub fn new(
        id: i64,
        short_hash: ShortHash,
        full_hash: FullHash,
        url: String,
        comment: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            short_hash,
            full_hash,
            url,
            comment,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fingerprint::fingerprint;

    #[test]
    fn test_link_creation() {
        let full_hash = fingerprint("http://example.com/").unwrap();
        let short_hash = full_hash.prefix(4);
        let now = Utc::now();

        let link = Link::new(
            1,
            short_hash.clone(),
            full_hash.clone(),
            "http://example.com/".to_string(),
            None,
            now,
        );

        assert_eq!(link.id, 1);
        assert!(link.short_hash.is_prefix_of(&link.full_hash));
        assert_eq!(link.url, "http://example.com/");
        assert!(link.comment.is_none());
        assert_eq!(link.created_at, now);
    }
}
