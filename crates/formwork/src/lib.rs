#![forbid(unsafe_code)]

//! formwork: form models over observable value holders.
//!
//! A [`FormModel`] binds the properties of a domain object to value models,
//! buffers edits until [`FormModel::commit`], validates them against a
//! [`RuleSet`] and reports violations as data. Compound form models nest
//! child models and aggregate their state.
//!
//! # Example
//!
//! ```
//! use formwork::prelude::*;
//!
//! let schema = Schema::builder("Person")
//!     .property_with_default("name", ValueType::Text, "")
//!     .property_with_default("age", ValueType::Int, -1)
//!     .build();
//! let person = schema.instantiate();
//!
//! let form = FormModel::for_object(person.clone());
//! form.set_rules(
//!     RuleSet::new()
//!         .rule("name", Constraint::required())
//!         .rule("age", Constraint::compare(Relation::Ge, 0)),
//! )
//! .unwrap();
//! assert_eq!(form.errors().len(), 2);
//!
//! form.set_value("name", "Ann").unwrap();
//! form.set_value("age", 5).unwrap();
//! assert_eq!(form.commit().unwrap(), CommitOutcome::Committed);
//! assert_eq!(person.get("age").unwrap(), Value::from(5));
//! ```
//!
//! # Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `formwork-core` | [`Value`], [`Schema`], [`TypeGraph`], [`BindingError`] |
//! | `formwork-runtime` | [`Observable`], [`Derived`], [`Buffered`], bindings |
//! | `formwork-rules` | [`Constraint`], [`RuleSet`], [`ValidationResult`] |
//! | `formwork-form` | [`FormModel`], [`BinderRegistry`] |

pub use formwork_core as core;
pub use formwork_form as form;
pub use formwork_rules as rules;
pub use formwork_runtime as runtime;

pub use formwork_core::{
    BindingError, DomainObject, ObjectRef, Record, Result, Schema, TypeGraph, TypeName, Value,
    ValueType,
};
pub use formwork_form::{
    BinderRegistry, CommitOutcome, FieldMetadata, FormConfig, FormModel, ObjectAccessor,
    PropertyAccessor, PropertyAdapter,
};
pub use formwork_rules::{
    Constraint, DefaultRulesSource, ErrorMap, MessageSource, MessageTemplates, PropertySource,
    Relation, RuleSet, RulesSource, Severity, ValidationResult, ViolationReport,
};
pub use formwork_runtime::reactive::{
    BindingScope, Buffered, Buffering, Derived, Observable, Subscription, TwoWayBinding,
    ValueModel, ValueModelRef,
};

/// Everything needed to build and validate forms.
pub mod prelude {
    pub use crate::{
        BinderRegistry, BindingError, BindingScope, Buffered, Buffering, CommitOutcome,
        Constraint, Derived, FormConfig, FormModel, ObjectRef, Observable, Relation, RuleSet,
        Schema, Severity, Subscription, TypeGraph, TypeName, Value, ValueModel, ValueModelRef,
        ValueType,
    };
}
