#![forbid(unsafe_code)]

//! Connecting value models to the control side.
//!
//! A [`Binding<T>`] is a read-only view over a [`ValueModel`] plus an optional
//! transform, evaluated on each `get()`. A [`TwoWayBinding<T>`] keeps a model
//! and a control-side [`Observable`] in sync in both directions. Neither can
//! tell a plain holder from a buffered one; writes from the control go
//! through `set_value` and end up wherever the model routes them.
//!
//! # Invariants
//!
//! 1. `Binding::get()` always returns the current (not stale) value.
//! 2. `TwoWayBinding` prevents update cycles with a re-entrancy guard.
//! 3. Dropping a `TwoWayBinding` unsubscribes both directions.
//! 4. Dropping a [`BindingScope`] releases every subscription it holds.
//!
//! # Failure Modes
//!
//! - Model rejects a control write: the error is logged at `warn` and the
//!   control is reset to the model's value.
//! - Transform panic: propagates to the caller of `get()`.

use std::cell::Cell;
use std::rc::Rc;

use super::model::{ValueModel, ValueModelRef};
use super::observable::{Observable, Subscription};

// ---------------------------------------------------------------------------
// Binding<T>: one-way read binding
// ---------------------------------------------------------------------------

/// A read-only binding with an optional transform.
pub struct Binding<T> {
    eval: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("value", &self.get())
            .finish()
    }
}

impl<T: 'static> Binding<T> {
    /// Create a binding that evaluates `f` on each `get()` call.
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        Self { eval: Rc::new(f) }
    }

    #[must_use]
    pub fn get(&self) -> T {
        (self.eval)()
    }

    /// Apply a further transform, returning a new `Binding`.
    pub fn then<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Binding<U> {
        Binding {
            eval: Rc::new(move || f((self.eval)())),
        }
    }
}

/// Direct binding to a value model.
pub fn bind_model<T: 'static>(source: &ValueModelRef<T>) -> Binding<T> {
    let src = Rc::clone(source);
    Binding {
        eval: Rc::new(move || src.value()),
    }
}

/// Mapped binding: the model's value transformed by `map`.
pub fn bind_mapped<S: 'static, T: 'static>(
    source: &ValueModelRef<S>,
    map: impl Fn(&S) -> T + 'static,
) -> Binding<T> {
    let src = Rc::clone(source);
    Binding {
        eval: Rc::new(move || map(&src.value())),
    }
}

// ---------------------------------------------------------------------------
// TwoWayBinding<T>: model <-> control sync
// ---------------------------------------------------------------------------

/// Bidirectional binding between a value model and a control observable.
///
/// Drop the `TwoWayBinding` to disconnect both directions.
pub struct TwoWayBinding<T: Clone + PartialEq + 'static> {
    _model_to_control: Subscription,
    _control_to_model: Subscription,
    _guard: Rc<Cell<bool>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Clone + PartialEq + 'static> TwoWayBinding<T> {
    /// Bind `model` and `control`. The control first takes the model's value.
    pub fn new(model: &ValueModelRef<T>, control: &Observable<T>) -> Self {
        control.set(model.value());

        let syncing = Rc::new(Cell::new(false));

        let ctl = control.clone();
        let guard_mc = Rc::clone(&syncing);
        let sub_mc = model.subscribe(Box::new(move |val: &T| {
            if !guard_mc.get() {
                guard_mc.set(true);
                ctl.set(val.clone());
                guard_mc.set(false);
            }
        }));

        let mdl = Rc::clone(model);
        let ctl = control.clone();
        let guard_cm = Rc::clone(&syncing);
        let sub_cm = control.subscribe(move |val: &T| {
            if !guard_cm.get() {
                guard_cm.set(true);
                if let Err(err) = mdl.set_value(val.clone()) {
                    tracing::warn!(error = %err, "control write rejected by model");
                    ctl.set(mdl.value());
                }
                guard_cm.set(false);
            }
        });

        Self {
            _model_to_control: sub_mc,
            _control_to_model: sub_cm,
            _guard: syncing,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Clone + PartialEq + 'static> std::fmt::Debug for TwoWayBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoWayBinding").finish()
    }
}

// ---------------------------------------------------------------------------
// BindingScope: lifecycle management
// ---------------------------------------------------------------------------

/// Collects subscriptions for a logical owner (a form model, a control).
///
/// When the scope is dropped, all held subscriptions are released.
///
/// # Invariants
///
/// 1. After drop or `clear()`, no callbacks from this scope fire.
/// 2. `binding_count()` is the number of held subscriptions.
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Keep `sub` alive until the scope is dropped or cleared.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to a value model within this scope.
    pub fn subscribe<T: 'static>(
        &mut self,
        source: &ValueModelRef<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        let sub = source.subscribe(Box::new(callback));
        self.subscriptions.push(sub);
        self
    }

    /// Keep a two-way binding alive for the lifetime of the scope.
    pub fn bind_two_way<T: Clone + PartialEq + 'static>(
        &mut self,
        model: &ValueModelRef<T>,
        control: &Observable<T>,
    ) -> &mut Self {
        let binding = TwoWayBinding::new(model, control);
        self.subscriptions
            .push(Subscription::merge(vec![binding._model_to_control, binding._control_to_model]));
        self
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release all subscriptions immediately (scope becomes empty but reusable).
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Buffered, Buffering, Derived};
    use std::cell::RefCell;

    fn model(obs: &Observable<i32>) -> ValueModelRef<i32> {
        Rc::new(obs.clone())
    }

    #[test]
    fn binding_reads_current_value() {
        let obs = Observable::new(42);
        let b = bind_model(&model(&obs));
        assert_eq!(b.get(), 42);
        obs.set(100);
        assert_eq!(b.get(), 100);
    }

    #[test]
    fn binding_map_and_then() {
        let count = Observable::new(3);
        let label = bind_mapped(&model(&count), |c| format!("items: {c}"));
        assert_eq!(label.get(), "items: 3");
        let len = label.then(|s| s.len());
        count.set(12);
        assert_eq!(len.get(), "items: 12".len());
    }

    #[test]
    fn two_way_syncs_both_directions() {
        let source = Observable::new(1);
        let control = Observable::new(0);
        let _b = TwoWayBinding::new(&model(&source), &control);
        assert_eq!(control.get(), 1);
        source.set(5);
        assert_eq!(control.get(), 5);
        control.set(9);
        assert_eq!(source.get(), 9);
    }

    #[test]
    fn two_way_over_buffered_model_defers_source() {
        let source = Observable::new(1);
        let buffered = Buffered::new(model(&source));
        let m: ValueModelRef<i32> = Rc::new(buffered.clone());
        let control = Observable::new(0);
        let _b = TwoWayBinding::new(&m, &control);
        control.set(7);
        assert_eq!(buffered.get(), 7);
        assert_eq!(source.get(), 1);
        buffered.revert();
        assert_eq!(control.get(), 1);
    }

    #[test]
    fn rejected_control_write_resets_control() {
        let a = Observable::new(2);
        let d = Derived::new("double", vec![model(&a)], |v| Ok(v[0] * 2)).unwrap();
        let m: ValueModelRef<i32> = Rc::new(d);
        let control = Observable::new(0);
        let _b = TwoWayBinding::new(&m, &control);
        assert_eq!(control.get(), 4);
        control.set(11);
        assert_eq!(control.get(), 4);
    }

    #[test]
    fn two_way_drop_disconnects() {
        let source = Observable::new(1);
        let control = Observable::new(0);
        {
            let _b = TwoWayBinding::new(&model(&source), &control);
        }
        source.set(3);
        assert_eq!(control.get(), 1);
    }

    #[test]
    fn scope_holds_and_releases() {
        let obs = Observable::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut scope = BindingScope::new();
        let s = Rc::clone(&seen);
        scope.subscribe(&model(&obs), move |v| s.borrow_mut().push(*v));
        let control = Observable::new(0);
        scope.bind_two_way(&model(&obs), &control);
        assert_eq!(scope.binding_count(), 2);

        obs.set(1);
        assert_eq!(control.get(), 1);
        scope.clear();
        assert!(scope.is_empty());
        obs.set(2);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(control.get(), 1);
    }
}
