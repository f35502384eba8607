//! Per-test key derivation.
//!
//! The cluster's data root is wiped once per test class, not between test
//! methods, so seeded keys are namespaced by test identity to keep methods
//! from tripping over each other's documents. Two calls with the same test
//! name and the same additional prefixes collide; that is accepted, the
//! method name and the time-seeded cluster name carry the uniqueness.

use std::collections::HashMap;

use tracing::info;

/// Key prefix for a test: the lowercased test name and any additional
/// segments, each followed by `-`.
pub fn prefix_for(test_name: &str, additional_prefixes: &[&str]) -> String {
    let mut prefix = format!("{}-", test_name.to_lowercase());

    for additional in additional_prefixes {
        prefix.push_str(additional);
        prefix.push('-');
    }

    prefix
}

/// Build the seeded key/value pair for a test.
///
/// Returns the one-entry mapping `{prefix}key => {prefix}value`.
pub fn indexed_data(test_name: &str, additional_prefixes: &[&str]) -> HashMap<String, String> {
    let prefix = prefix_for(test_name, additional_prefixes);

    let key = format!("{prefix}key");
    let value = format!("{prefix}value");
    info!("creating indexed data using the key/value pair {key} => {value}");

    HashMap::from([(key, value)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_without_additional_segments() {
        assert_eq!(prefix_for("testFoo", &[]), "testfoo-");
    }

    #[test]
    fn test_prefix_appends_additional_segments_in_order() {
        assert_eq!(prefix_for("Bar", &["x", "y"]), "bar-x-y-");
    }

    #[test]
    fn test_indexed_data_without_additional_segments() {
        let data = indexed_data("testFoo", &[]);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("testfoo-key"), Some(&"testfoo-value".to_string()));
    }

    #[test]
    fn test_indexed_data_with_additional_segments() {
        let data = indexed_data("Bar", &["x", "y"]);
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("bar-x-y-key"), Some(&"bar-x-y-value".to_string()));
    }

    #[test]
    fn test_identical_inputs_collide() {
        // collision is the contract: same test, same segments, same key
        assert_eq!(indexed_data("testFoo", &["a"]), indexed_data("testFoo", &["a"]));
    }
}
