//! Query key derivation.
//!
//! A query key identifies one (endpoint, argument) pair and is the unit of
//! request deduplication: two subscriptions whose arguments are deeply equal
//! must land on the same cache entry.

use std::fmt;

use serde_json::Value;

/// Deterministic identifier for one (endpoint, argument) pair.
///
/// Derived from the endpoint id plus the canonical JSON form of the argument.
/// `serde_json` keeps object keys sorted (`Map` is backed by a `BTreeMap`),
/// so deeply-equal arguments serialize identically regardless of how their
/// maps were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn derive(endpoint_id: &str, arg: &Value) -> Self {
        QueryKey(format!("{}({})", endpoint_id, arg))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deeply_equal_args_share_a_key() {
        let a = json!({ "name": "kb-1", "page": 2 });
        let b = json!({ "page": 2, "name": "kb-1" });
        assert_eq!(QueryKey::derive("getKnowledges", &a), QueryKey::derive("getKnowledges", &b));
    }

    #[test]
    fn test_nested_maps_are_canonicalized() {
        let a = json!({ "filter": { "status": "ready", "owner": "t" } });
        let b = json!({ "filter": { "owner": "t", "status": "ready" } });
        assert_eq!(QueryKey::derive("q", &a), QueryKey::derive("q", &b));
    }

    #[test]
    fn test_different_args_get_different_keys() {
        let a = json!("kb-1");
        let b = json!("kb-2");
        assert_ne!(QueryKey::derive("getKnowledgeDetails", &a), QueryKey::derive("getKnowledgeDetails", &b));
    }

    #[test]
    fn test_endpoint_id_is_part_of_the_key() {
        let arg = json!(null);
        assert_ne!(QueryKey::derive("getKnowledges", &arg), QueryKey::derive("getKnowledgeNames", &arg));
    }
}
