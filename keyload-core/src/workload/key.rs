//! Key identity and payload derivation
//!
//! A [`Key`] is an integer id namespaced by a run prefix. Its external form and
//! the payload stored under it are both derived from the id, so a reader can
//! check what it got back without any shared state.

use super::verify::VerificationMismatch;
use std::fmt;
use std::sync::Arc;

/// Literal tag prepended to the decimal id to form a payload
pub const VALUE_TAG: &str = "val:";

/// A key handed out to a worker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    id: i64,
    prefix: Arc<str>,
}

impl Key {
    /// Create a key from an id and the prefix that namespaces it
    pub fn new(id: i64, prefix: impl Into<Arc<str>>) -> Self {
        debug_assert!(id >= 0, "key ids are non-negative, got {id}");
        Self { id, prefix: prefix.into() }
    }

    /// The underlying integer id
    pub fn as_number(&self) -> i64 {
        self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// External string form: prefix followed by the decimal id
    pub fn as_string(&self) -> String {
        format!("{}{}", self.prefix, self.id)
    }

    /// Payload a writer stores under this key
    pub fn expected_payload(&self) -> String {
        format!("{VALUE_TAG}{}", self.id)
    }

    /// Check an observed payload against [`Key::expected_payload`]
    ///
    /// A mismatch is logged as a data-integrity alert and handed back to the
    /// caller; it never aborts the run.
    pub fn verify(&self, observed: &str) -> Result<(), VerificationMismatch> {
        let expected = self.expected_payload();
        if observed == expected {
            return Ok(());
        }

        tracing::error!(
            key = %self.as_string(),
            expected = %expected,
            got = %observed,
            "Value mismatch for key: {}, expected: {}, got: {}",
            self.id,
            expected,
            observed
        );
        Err(VerificationMismatch {
            key: self.as_string(),
            id: self.id,
            expected,
            actual: observed.to_string(),
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key: {}, value: {VALUE_TAG}{}", self.id, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_and_payload_forms() {
        let key = Key::new(7, "p-");
        assert_eq!(key.as_number(), 7);
        assert_eq!(key.as_string(), "p-7");
        assert_eq!(key.expected_payload(), "val:7");
    }

    #[test]
    fn test_verify_passes_on_expected_payload() {
        let key = Key::new(7, "p-");
        assert!(key.verify("val:7").is_ok());
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let key = Key::new(7, "p-");
        let mismatch = key.verify("val:8").unwrap_err();

        assert_eq!(mismatch.key, "p-7");
        assert_eq!(mismatch.id, 7);
        assert_eq!(mismatch.expected, "val:7");
        assert_eq!(mismatch.actual, "val:8");
    }

    #[test]
    fn test_verify_rejects_near_misses() {
        let key = Key::new(70, "");
        assert!(key.verify("val:7").is_err());
        assert!(key.verify("val:70 ").is_err());
        assert!(key.verify("").is_err());
        assert!(key.verify("val:70").is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::new(3, "x").to_string(), "Key: 3, value: val:3");
    }

    #[test]
    fn test_keys_share_prefix_allocation() {
        let prefix: Arc<str> = Arc::from("run-");
        let a = Key::new(1, prefix.clone());
        let b = Key::new(2, prefix.clone());
        assert_eq!(a.prefix(), b.prefix());
        assert_eq!(Arc::strong_count(&prefix), 3);
    }
}
