#![forbid(unsafe_code)]

//! Constraint and rule engine for formwork.
//!
//! - [`Constraint`]: immutable predicate tree with short-circuit `test`,
//!   violation reporting and non-short-circuit violation counting.
//! - [`RuleSet`] / [`RulesSource`]: constraints per property, per domain type.
//! - [`ValidationResult`] / [`ErrorMap`]: what form models report.
//! - [`MessageSource`]: the boundary to an external message catalog.

pub mod constraint;
pub mod message;
pub mod results;
pub mod rules;

pub use constraint::{Constraint, ConstraintKind, PropertySource, Relation};
pub use message::{BuiltinMessages, MessageSource, MessageTemplates};
pub use results::{ErrorMap, Severity, ValidationResult, ViolationReport, has_blocking};
pub use rules::{DefaultRulesSource, Rule, RuleSet, RulesSource};
