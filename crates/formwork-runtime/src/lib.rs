#![forbid(unsafe_code)]

//! Value holders for formwork.
//!
//! Everything lives in [`reactive`]: plain observable cells, the
//! [`ValueModel`](reactive::ValueModel) boundary consumed by bindings and
//! form models, derived values, and commit/revert buffering.

pub mod reactive;

pub use reactive::{
    Binding, BindingScope, Buffered, Buffering, Derived, Observable, Subscription,
    TwoWayBinding, ValueModel, ValueModelRef,
};
