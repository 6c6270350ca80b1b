//! Assertion engine.
//!
//! Checks are non-fatal: each one records an [`AssertionRecord`] and the
//! scenario keeps collecting diagnostics (collect-all policy). Only the
//! aggregated report decides the final verdict. Comparisons are exact
//! string equality, no coercion.

use log::warn;

/// One evaluated expectation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionRecord {
    /// What was being checked
    pub description: String,
    /// Expected operand (or the negated operand for inequality checks)
    pub expected: String,
    /// Observed operand
    pub actual: String,
    /// Whether the check held
    pub passed: bool,
}

/// Accumulator for a scenario's assertion records
#[derive(Debug, Default)]
pub struct Assertions {
    records: Vec<AssertionRecord>,
}

impl Assertions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exact-equality expectation.
    ///
    /// With an empty `description` the failure message is auto-generated
    /// from both operands, rendered with `{:?}` so embedded whitespace or
    /// special characters stay unambiguous.
    pub fn check_eq(
        &mut self,
        description: impl Into<String>,
        actual: impl AsRef<str>,
        expected: impl AsRef<str>,
    ) -> bool {
        let (actual, expected) = (actual.as_ref(), expected.as_ref());
        let description = Self::describe(description.into(), actual, expected, "==");
        let passed = actual == expected;
        if !passed {
            warn!("assertion failed: {description}: expected {expected:?}, got {actual:?}");
        }
        self.records.push(AssertionRecord {
            description,
            expected: expected.to_string(),
            actual: actual.to_string(),
            passed,
        });
        passed
    }

    /// Record an inequality expectation
    pub fn check_ne(
        &mut self,
        description: impl Into<String>,
        actual: impl AsRef<str>,
        unexpected: impl AsRef<str>,
    ) -> bool {
        let (actual, unexpected) = (actual.as_ref(), unexpected.as_ref());
        let description = Self::describe(description.into(), actual, unexpected, "!=");
        let passed = actual != unexpected;
        if !passed {
            warn!("assertion failed: {description}: got {actual:?}, must differ from {unexpected:?}");
        }
        self.records.push(AssertionRecord {
            description,
            expected: unexpected.to_string(),
            actual: actual.to_string(),
            passed,
        });
        passed
    }

    fn describe(description: String, actual: &str, expected: &str, op: &str) -> String {
        if description.is_empty() {
            format!("{actual:?} {op} {expected:?}")
        } else {
            description
        }
    }

    /// Whether every recorded check held
    pub fn all_passed(&self) -> bool {
        self.records.iter().all(|r| r.passed)
    }

    /// The failed records, in evaluation order
    pub fn failures(&self) -> impl Iterator<Item = &AssertionRecord> {
        self.records.iter().filter(|r| !r.passed)
    }

    /// All records, in evaluation order
    pub fn records(&self) -> &[AssertionRecord] {
        &self.records
    }

    /// Number of evaluated checks
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been evaluated yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand the records over to the final report
    pub fn into_records(self) -> Vec<AssertionRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_accumulate_without_aborting() {
        let mut asserts = Assertions::new();
        assert!(asserts.check_eq("balance", "100", "100"));
        assert!(!asserts.check_eq("allowance", "30", "50"));
        assert!(asserts.check_ne("address", "secret1aaa", "secret1bbb"));
        assert!(!asserts.check_ne("key", "hunter2", "hunter2"));

        assert_eq!(asserts.len(), 4);
        assert!(!asserts.all_passed());
        let failed: Vec<&str> = asserts.failures().map(|r| r.description.as_str()).collect();
        assert_eq!(failed, vec!["allowance", "key"]);
    }

    #[test]
    fn auto_message_quotes_operands() {
        let mut asserts = Assertions::new();
        asserts.check_eq("", "a b", "a  b");
        let record = &asserts.records()[0];
        // Whitespace differences must stay visible in the description
        assert_eq!(record.description, r#""a b" == "a  b""#);
        assert!(!record.passed);
    }

    #[test]
    fn equality_is_exact_no_coercion() {
        let mut asserts = Assertions::new();
        // "050" and "50" are different strings even if numerically equal
        assert!(!asserts.check_eq("padded number", "050", "50"));
    }
}
