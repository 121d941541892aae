//! Structural errors raised by the binding layer.
//!
//! A [`BindingError`] always signals a programmer error: an unknown property
//! path, a duplicate child name, a value of the wrong shape. Validation
//! violations are *not* errors; they surface as `ValidationResult` entries in
//! a form's error map and never travel through this type.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown path | Property not declared by the object's type | `UnknownProperty` |
//! | Wrong value shape | `Text` written to an `Int` property | `IncompatibleValue` |
//! | Null intermediate | `address.city` with `address == Null` | `NullInPath` |
//! | Duplicate child | Second child registered under a name | `DuplicateChild` |
//! | Derived cycle | Derived holder re-entered while recomputing | `DependencyCycle` |

use thiserror::Error;

/// Convenience alias used across the formwork crates.
pub type Result<T, E = BindingError> = std::result::Result<T, E>;

/// Structural failure in the binding layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// The property is not declared by the object's type.
    #[error("unknown property '{property}' on type '{type_name}'")]
    UnknownProperty { type_name: String, property: String },

    /// The value cannot be stored in the property.
    #[error("property '{property}' expects {expected}, got {found}")]
    IncompatibleValue {
        property: String,
        expected: String,
        found: String,
    },

    /// An intermediate segment of a nested path resolved to `Null`.
    #[error("null value at '{segment}' while resolving '{path}'")]
    NullInPath { path: String, segment: String },

    /// A value that must be an object is not one.
    #[error("'{path}' does not hold an object (found {found})")]
    NotAnObject { path: String, found: String },

    /// The object's type does not define the method.
    #[error("unknown method '{method}' on type '{type_name}'")]
    UnknownMethod { type_name: String, method: String },

    /// The value model cannot be written (derived values).
    #[error("value model is read-only")]
    ReadOnlyModel,

    /// A child form model with this name is already registered.
    #[error("child model '{0}' already exists")]
    DuplicateChild(String),

    /// No child form model with this name is registered.
    #[error("no child model named '{0}'")]
    UnknownChild(String),

    /// The form model already belongs to another compound model.
    #[error("form model '{0}' already has a parent")]
    AlreadyNested(String),

    /// A field-level operation was invoked on a compound model.
    #[error("operation '{0}' is not supported on a compound form model")]
    UnsupportedOnCompound(&'static str),

    /// A child-management operation was invoked on a flat form model.
    #[error("operation '{0}' requires a compound form model")]
    UnsupportedOnLeaf(&'static str),

    /// A derived holder was re-entered while recomputing.
    #[error("dependency cycle detected in derived value '{0}'")]
    DependencyCycle(String),

    /// Binder selection exhausted every lookup strategy.
    #[error("unable to select a binder for property '{property}' (control '{control}')")]
    NoBinder { control: String, property: String },

    /// A type name was referenced but never declared.
    #[error("unknown type '{0}'")]
    UnknownType(String),
}

impl BindingError {
    pub(crate) fn unknown_property(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    /// Whether the error names a property path the object does not know.
    #[must_use]
    pub fn is_unknown_path(&self) -> bool {
        matches!(self, Self::UnknownProperty { .. } | Self::NullInPath { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_property_and_type() {
        let err = BindingError::unknown_property("Person", "nmae");
        assert_eq!(err.to_string(), "unknown property 'nmae' on type 'Person'");
        assert!(err.is_unknown_path());
    }

    #[test]
    fn duplicate_child_display() {
        let err = BindingError::DuplicateChild("address".into());
        assert_eq!(err.to_string(), "child model 'address' already exists");
        assert!(!err.is_unknown_path());
    }
}
