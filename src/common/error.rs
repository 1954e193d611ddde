//! Error types for the scenario runner
//!
//! Scenario-local failures (element lookups, assertions, dialogs) carry the
//! offending selector or key so a report line is enough to locate the problem.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario runner
#[derive(Error, Debug)]
pub enum Error {
    // === Scenario Failures ===
    #[error("Element '{selector}' not found after {timeout_ms}ms")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("Element '{selector}' is not interactable: {reason}")]
    ElementNotInteractable { selector: String, reason: String },

    #[error("Assertion failed on '{target}': expected {expected}, got {actual}")]
    AssertionFailed {
        target: String,
        expected: String,
        actual: String,
    },

    #[error("Dialog stub for {kind} was installed but no {kind} dialog fired")]
    DialogNotTriggered { kind: String },

    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === Browser Errors ===
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("Failed to reach WebDriver at {url}: {message}")]
    WebDriverConnection { url: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an element not found error
    pub fn not_found(selector: &str, timeout_ms: u64) -> Self {
        Self::ElementNotFound {
            selector: selector.to_string(),
            timeout_ms,
        }
    }

    /// Create an element not interactable error
    pub fn not_interactable(selector: &str, reason: &str) -> Self {
        Self::ElementNotInteractable {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an assertion failed error
    pub fn assertion_failed(
        target: &str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::AssertionFailed {
            target: target.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an invalid selector error
    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Stable code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            Error::ElementNotInteractable { .. } => "ELEMENT_NOT_INTERACTABLE",
            Error::AssertionFailed { .. } => "ASSERTION_FAILED",
            Error::DialogNotTriggered { .. } => "DIALOG_NOT_TRIGGERED",
            Error::ScenariosFailed { .. } => "SCENARIOS_FAILED",
            Error::StaleElement(_) => "STALE_ELEMENT",
            Error::InvalidSelector { .. } => "INVALID_SELECTOR",
            Error::Navigation(_) => "NAVIGATION_FAILED",
            Error::WebDriver(_) | Error::WebDriverConnection { .. } => "WEBDRIVER_ERROR",
            Error::Config(_) | Error::ConfigParse(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Whether the error may clear up on a later poll attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ElementNotFound { .. }
                | Error::ElementNotInteractable { .. }
                | Error::AssertionFailed { .. }
                | Error::StaleElement(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::not_found("#x", 10).code(), "ELEMENT_NOT_FOUND");
        assert_eq!(
            Error::not_interactable("#x", "hidden").code(),
            "ELEMENT_NOT_INTERACTABLE"
        );
        assert_eq!(
            Error::assertion_failed("#x", 1, 2).code(),
            "ASSERTION_FAILED"
        );
        assert_eq!(
            Error::DialogNotTriggered {
                kind: "confirm".into()
            }
            .code(),
            "DIALOG_NOT_TRIGGERED"
        );
        assert_eq!(Error::Internal("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_assertion_message_names_target() {
        let err = Error::assertion_failed("#task-count", "'0'", "'2'");
        assert_eq!(
            err.to_string(),
            "Assertion failed on '#task-count': expected '0', got '2'"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::StaleElement("1:0".into()).is_transient());
        assert!(!Error::Navigation("boom".into()).is_transient());
        assert!(!Error::invalid_selector("[", "unterminated").is_transient());
    }
}
