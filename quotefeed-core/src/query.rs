//! Price queries and cache-key derivation

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A request for quotes of `fsyms` priced in each of `tsyms`.
///
/// Symbol order is preserved from the request and is significant for
/// identity: the cache key digests the joined lists exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuery {
    /// Symbols to quote (e.g. BTC, ETH).
    pub fsyms: Vec<String>,
    /// Currencies to quote them in (e.g. USD, EUR).
    pub tsyms: Vec<String>,
}

impl PriceQuery {
    pub fn new(fsyms: Vec<String>, tsyms: Vec<String>) -> Self {
        Self { fsyms, tsyms }
    }

    /// The from-symbols as a comma-joined list, the shape the upstream API
    /// accepts.
    pub fn fsyms_joined(&self) -> String {
        self.fsyms.join(",")
    }

    /// The to-symbols as a comma-joined list.
    pub fn tsyms_joined(&self) -> String {
        self.tsyms.join(",")
    }

    /// Digest identifying this query in the quote cache.
    pub fn cache_key(&self) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(self.fsyms_joined().as_bytes());
        hasher.update(self.tsyms_joined().as_bytes());
        CacheKey(hasher.finalize().into())
    }

    /// The (fsyms, tsyms) pair serialized as JSON arrays, the key shape of
    /// the persisted fallback store.
    pub fn store_key(&self) -> (String, String) {
        (
            serde_json::to_string(&self.fsyms).unwrap_or_default(),
            serde_json::to_string(&self.tsyms).unwrap_or_default(),
        )
    }
}

impl fmt::Display for PriceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.fsyms_joined(), self.tsyms_joined())
    }
}

/// Fixed-size digest of a query's joined symbol lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic() {
        let a = PriceQuery::new(vec!["BTC".into()], vec!["USD".into()]);
        let b = PriceQuery::new(vec!["BTC".into()], vec!["USD".into()]);
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn cache_key_is_order_sensitive() {
        let a = PriceQuery::new(vec!["BTC".into(), "ETH".into()], vec!["USD".into()]);
        let b = PriceQuery::new(vec!["ETH".into(), "BTC".into()], vec!["USD".into()]);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn distinct_queries_get_distinct_keys() {
        let a = PriceQuery::new(vec!["BTC".into()], vec!["USD".into()]);
        let b = PriceQuery::new(vec!["BTC".into()], vec!["EUR".into()]);
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn store_key_serializes_lists_as_json() {
        let query = PriceQuery::new(vec!["BTC".into(), "ETH".into()], vec!["USD".into()]);
        let (fsyms, tsyms) = query.store_key();
        assert_eq!(fsyms, r#"["BTC","ETH"]"#);
        assert_eq!(tsyms, r#"["USD"]"#);
    }
}
