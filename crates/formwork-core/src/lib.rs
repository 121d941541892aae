#![forbid(unsafe_code)]

//! Core value model for formwork.
//!
//! This crate holds the data every other formwork crate speaks:
//!
//! - [`Value`]: dynamically typed property value with identity semantics for
//!   domain objects.
//! - [`DomainObject`] / [`ObjectRef`]: property-level access to a domain
//!   object, plus the schema-driven [`Record`].
//! - [`ValueType`] / [`TypeGraph`]: declared property types and the explicit
//!   "is-a" graph used for nearest-match lookups.
//! - [`path`]: dot-separated property path resolution.
//! - [`BindingError`]: structural errors (programmer errors, never validation
//!   failures).

pub mod error;
pub mod object;
pub mod path;
pub mod types;
pub mod value;

pub use error::{BindingError, Result};
pub use object::{DomainObject, ObjectRef, Record, Schema, SchemaBuilder};
pub use types::{TypeGraph, TypeName, ValueType};
pub use value::Value;
