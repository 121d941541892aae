#![forbid(unsafe_code)]

//! Reactive value holders.
//!
//! This module provides the observer graph underneath every form model:
//!
//! - [`Observable`]: a shared, version-tracked value cell with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//! - [`ValueModel`]: the object-safe holder boundary. Bindings consume it and
//!   cannot tell a plain holder from a buffered one.
//! - [`Derived`]: a value recomputed from an ordered list of source models.
//! - [`Buffered`]: wraps a source model and defers writes until `commit()`.
//! - [`Binding`], [`TwoWayBinding`], [`BindingScope`]: connect models to
//!   control state and manage subscription lifetimes.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` function pointers and cleaned up lazily
//! during notification. The cell is never borrowed while callbacks run, so a
//! callback may call `set` again (on this or any other holder).
//!
//! `Derived<T>` subscribes to its sources and recomputes eagerly on every
//! source notification; the result lands in an inner `Observable`, so the
//! equality short-circuit decides whether its own listeners hear about it.
//!
//! `Buffered<T>` keeps a pending value next to its source and mirrors the
//! *visible* value into an inner `Observable` for notifications.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. A derived value re-entered while it is recomputing records a
//!    `DependencyCycle` error and stops propagating instead of looping.
//! 6. `Buffered::commit` leaves the holder clean only if the source accepted
//!    the write.

pub mod binding;
pub mod buffered;
pub mod derived;
pub mod model;
pub mod observable;

pub use binding::{Binding, BindingScope, TwoWayBinding, bind_mapped, bind_model};
pub use buffered::Buffered;
pub use derived::Derived;
pub use model::{Buffering, ValueModel, ValueModelRef};
pub use observable::{Observable, Subscription};
