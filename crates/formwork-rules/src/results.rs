#![forbid(unsafe_code)]

//! Validation results.
//!
//! A [`ValidationResult`] describes one violation: the property, the value
//! that was rejected, the constraint it violated and a [`Severity`]. Results
//! are immutable. Form models hand them out as an [`ErrorMap`] keyed by
//! property name, in rule order.

use std::fmt;

use formwork_core::Value;
use indexmap::IndexMap;

use crate::constraint::Constraint;
use crate::message::MessageSource;

/// Severity of a violation. Only `Error` blocks a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One constraint violation.
#[derive(Clone)]
pub struct ValidationResult {
    property: String,
    rejected_value: Value,
    violated: Constraint,
    severity: Severity,
}

impl ValidationResult {
    #[must_use]
    pub fn new(
        property: impl Into<String>,
        rejected_value: Value,
        violated: Constraint,
        severity: Severity,
    ) -> Self {
        Self {
            property: property.into(),
            rejected_value,
            violated,
            severity,
        }
    }

    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[must_use]
    pub fn rejected_value(&self) -> &Value {
        &self.rejected_value
    }

    #[must_use]
    pub fn violated(&self) -> &Constraint {
        &self.violated
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Message key of the violated constraint.
    #[must_use]
    pub fn code(&self) -> &str {
        self.violated.code()
    }

    /// Human text from `messages`, or the built-in English rendering.
    #[must_use]
    pub fn message(&self, messages: &dyn MessageSource) -> String {
        messages.resolve(self).unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.property, self.violated)
    }
}

impl fmt::Debug for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationResult")
            .field("property", &self.property)
            .field("rejected_value", &self.rejected_value)
            .field("code", &self.code())
            .field("severity", &self.severity)
            .finish()
    }
}

/// Violations keyed by property name, in rule order.
pub type ErrorMap = IndexMap<String, ValidationResult>;

/// Whether any entry has `Error` severity.
#[must_use]
pub fn has_blocking(errors: &ErrorMap) -> bool {
    errors.values().any(ValidationResult::is_error)
}

/// Flattened, owned view of a result for an out-of-process renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViolationReport {
    pub property: String,
    pub rejected_value: String,
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

impl ViolationReport {
    #[must_use]
    pub fn new(result: &ValidationResult, messages: &dyn MessageSource) -> Self {
        Self {
            property: result.property.clone(),
            rejected_value: result.rejected_value.to_string(),
            code: result.code().to_string(),
            severity: result.severity,
            message: result.message(messages),
        }
    }

    /// Reports for every entry of `errors`, in map order.
    #[must_use]
    pub fn collect(errors: &ErrorMap, messages: &dyn MessageSource) -> Vec<Self> {
        errors.values().map(|r| Self::new(r, messages)).collect()
    }
}
