#![forbid(unsafe_code)]

//! Message rendering boundary.
//!
//! Violation text comes from a [`MessageSource`]. Catalog content is the
//! integrator's business; this module only ships the English fallback
//! ([`BuiltinMessages`]) and a small template table ([`MessageTemplates`]).
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | No template for the code | `None`, caller falls back to English |
//! | Unknown token | `{name}` not in the argument set | Token left as-is |

use ahash::AHashMap;

use crate::results::ValidationResult;

/// Resolves human-readable text for a violation.
pub trait MessageSource {
    /// Text for `result`, or `None` to use the built-in rendering.
    fn resolve(&self, result: &ValidationResult) -> Option<String>;
}

/// Always defers to the built-in English rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinMessages;

impl MessageSource for BuiltinMessages {
    fn resolve(&self, _result: &ValidationResult) -> Option<String> {
        None
    }
}

/// Templates keyed by `"<property>.<code>"` or plain `"<code>"`.
///
/// Templates may use `{property}`, `{value}` and `{constraint}`.
#[derive(Debug, Clone, Default)]
pub struct MessageTemplates {
    templates: AHashMap<String, String>,
}

impl MessageTemplates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl MessageSource for MessageTemplates {
    fn resolve(&self, result: &ValidationResult) -> Option<String> {
        let scoped = format!("{}.{}", result.property(), result.code());
        let template = self
            .templates
            .get(&scoped)
            .or_else(|| self.templates.get(result.code()))?;
        let args = [
            ("property", result.property().to_string()),
            ("value", result.rejected_value().to_string()),
            ("constraint", result.violated().to_string()),
        ];
        Some(interpolate(template, &args))
    }
}

/// Single-pass `{name}` substitution.
fn interpolate(template: &str, args: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match args.iter().find(|(k, _)| *k == name) {
                    Some((_, v)) => out.push_str(v),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
