#![forbid(unsafe_code)]

//! Form models for formwork.
//!
//! - [`accessor`]: path-based access to the bound domain object and the
//!   property adapters that expose one path as a value model.
//! - [`form`]: flat and compound [`FormModel`]s with buffering, validation
//!   and dirty tracking.
//! - [`field`]: per-field enabled/read-only flags combined with the form's.
//! - [`binder`]: nearest-match binder selection over a [`TypeGraph`].
//!
//! [`TypeGraph`]: formwork_core::TypeGraph

pub mod accessor;
pub mod binder;
pub mod config;
pub mod field;
pub mod form;

pub use accessor::{ObjectAccessor, PropertyAccessor, PropertyAdapter};
pub use binder::BinderRegistry;
pub use config::FormConfig;
pub use field::FieldMetadata;
pub use form::{CommitOutcome, FormModel};
