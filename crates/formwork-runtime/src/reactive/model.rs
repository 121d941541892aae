#![forbid(unsafe_code)]

//! The value-model boundary.
//!
//! Form models store fields as [`ValueModelRef`]s and bindings only ever see
//! this trait, so a plain holder, a derived value, a buffered holder and a
//! property adapter are interchangeable to every consumer. Holders that defer
//! writes expose the optional [`Buffering`] capability; the owning form model
//! uses it to commit, revert and aggregate dirty state.

use std::rc::Rc;

use formwork_core::Result;

use super::observable::Subscription;

/// Observable single-value holder.
pub trait ValueModel<T> {
    /// Current value as seen by consumers.
    fn value(&self) -> T;

    /// Write a value. Holders that cannot be written (derived values) or whose
    /// backing store rejects the value return a structural error.
    fn set_value(&self, value: T) -> Result<()>;

    /// Register a change callback for as long as the subscription lives.
    fn subscribe(&self, callback: Box<dyn Fn(&T)>) -> Subscription;

    /// Commit/revert capability, present on buffering holders only.
    fn buffering(&self) -> Option<&dyn Buffering> {
        None
    }
}

/// Shared, type-erased value model.
pub type ValueModelRef<T> = Rc<dyn ValueModel<T>>;

/// Deferred-write capability of a holder.
pub trait Buffering {
    /// Push the pending value to the source. A no-op when clean.
    fn commit(&self) -> Result<()>;

    /// Discard the pending value. Always succeeds.
    fn revert(&self);

    /// Whether a pending value exists and differs from the source.
    fn is_dirty(&self) -> bool;

    /// Whether writes are currently deferred (as opposed to pass-through).
    fn is_buffering(&self) -> bool;
}
