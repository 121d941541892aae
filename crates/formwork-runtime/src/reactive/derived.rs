#![forbid(unsafe_code)]

//! Values recomputed from other value models.
//!
//! A [`Derived`] subscribes to an ordered list of sources. Whenever any of
//! them notifies, the compute function runs over the sources' *current*
//! values and the result is stored in an inner [`Observable`]. Listeners of
//! the derived value therefore hear at most one notification per source
//! change, and none when the result did not change.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Compute error at construction | Bad method name, wrong arity | `Derived::new` returns the error |
//! | Compute error later | Function rejects new inputs | Previous value kept, `last_error()` set, warning logged |
//! | Dependency cycle | Recompute re-enters the same holder | `DependencyCycle` recorded, warning logged, propagation stops |
//! | Write attempt | `set_value` on a derived model | `ReadOnlyModel` |
//!
//! # Example
//!
//! ```
//! use formwork_runtime::reactive::{Derived, Observable, ValueModelRef};
//! use std::rc::Rc;
//!
//! let width = Observable::new(3);
//! let height = Observable::new(4);
//! let sources: Vec<ValueModelRef<i32>> = vec![Rc::new(width.clone()), Rc::new(height.clone())];
//! let area = Derived::new("area", sources, |v| Ok(v[0] * v[1])).unwrap();
//! assert_eq!(area.get(), 12);
//! width.set(5);
//! assert_eq!(area.get(), 20);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use formwork_core::{BindingError, Result};

use super::model::{ValueModel, ValueModelRef};
use super::observable::{Observable, Subscription};

type ComputeFn<T> = dyn Fn(&[T]) -> Result<T>;

struct DerivedInner<T> {
    name: String,
    value: Observable<T>,
    sources: Vec<ValueModelRef<T>>,
    compute: Box<ComputeFn<T>>,
    computing: Cell<bool>,
    error: RefCell<Option<BindingError>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

/// Resets the re-entrancy flag even if the compute function panics.
struct ComputingGuard<'a>(&'a Cell<bool>);

impl<'a> ComputingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for ComputingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: Clone + PartialEq + 'static> DerivedInner<T> {
    fn current_inputs(&self) -> Vec<T> {
        self.sources.iter().map(|s| s.value()).collect()
    }

    fn recompute(&self) {
        if self.computing.get() {
            tracing::warn!(
                derived = %self.name,
                "dependency cycle detected; propagation stopped"
            );
            *self.error.borrow_mut() = Some(BindingError::DependencyCycle(self.name.clone()));
            return;
        }
        let _guard = ComputingGuard::enter(&self.computing);
        match (self.compute)(&self.current_inputs()) {
            Ok(next) => {
                self.error.borrow_mut().take();
                // Listeners run inside this call; a cycle back into this
                // holder is caught by the `computing` flag above.
                self.value.set(next);
            }
            Err(err) => {
                tracing::warn!(derived = %self.name, error = %err, "recompute failed; keeping previous value");
                *self.error.borrow_mut() = Some(err);
            }
        }
    }
}

/// A value computed from other value models.
pub struct Derived<T> {
    inner: Rc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    /// Create a derived value over `sources`.
    ///
    /// The compute function runs once immediately; an error there is returned
    /// to the caller and nothing is subscribed.
    pub fn new(
        name: impl Into<String>,
        sources: Vec<ValueModelRef<T>>,
        compute: impl Fn(&[T]) -> Result<T> + 'static,
    ) -> Result<Self> {
        let inputs: Vec<T> = sources.iter().map(|s| s.value()).collect();
        let initial = compute(&inputs)?;
        let inner = Rc::new(DerivedInner {
            name: name.into(),
            value: Observable::new(initial),
            sources,
            compute: Box::new(compute),
            computing: Cell::new(false),
            error: RefCell::new(None),
            subscriptions: RefCell::new(Vec::new()),
        });

        let subscriptions = inner
            .sources
            .iter()
            .map(|source| {
                let weak = Rc::downgrade(&inner);
                source.subscribe(Box::new(move |_: &T| {
                    if let Some(inner) = weak.upgrade() {
                        inner.recompute();
                    }
                }))
            })
            .collect();
        *inner.subscriptions.borrow_mut() = subscriptions;

        Ok(Self { inner })
    }

    /// Last successfully computed value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    /// Current value, or the error recorded by the most recent recompute.
    pub fn try_get(&self) -> Result<T> {
        match self.last_error() {
            Some(err) => Err(err),
            None => Ok(self.get()),
        }
    }

    /// Error recorded by the most recent recompute, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<BindingError> {
        self.inner.error.borrow().clone()
    }

    /// Whether a dependency cycle was detected.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        matches!(
            *self.inner.error.borrow(),
            Some(BindingError::DependencyCycle(_))
        )
    }

    /// Force a recompute from the sources' current values.
    pub fn refresh(&self) {
        self.inner.recompute();
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of changes of the derived value.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.value.version()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.value.subscribe(callback)
    }
}

impl<T: Clone + PartialEq + 'static> ValueModel<T> for Derived<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn set_value(&self, _value: T) -> Result<()> {
        Err(BindingError::ReadOnlyModel)
    }

    fn subscribe(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.inner.value.subscribe(move |v: &T| callback(v))
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("name", &self.inner.name)
            .field("value", &self.get())
            .field("sources", &self.inner.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model<T: Clone + PartialEq + 'static>(obs: &Observable<T>) -> ValueModelRef<T> {
        Rc::new(obs.clone())
    }

    #[test]
    fn recomputes_on_any_dependency() {
        let a = Observable::new(1);
        let b = Observable::new(10);
        let sum = Derived::new("sum", vec![model(&a), model(&b)], |v| Ok(v[0] + v[1])).unwrap();
        assert_eq!(sum.get(), 11);
        a.set(2);
        assert_eq!(sum.get(), 12);
        b.set(20);
        assert_eq!(sum.get(), 22);
    }

    #[test]
    fn one_notification_per_source_change() {
        let a = Observable::new(1);
        let doubled = Derived::new("doubled", vec![model(&a)], |v| Ok(v[0] * 2)).unwrap();
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = doubled.subscribe(move |_| f.set(f.get() + 1));
        a.set(4);
        assert_eq!(fired.get(), 1);
        assert_eq!(doubled.get(), 8);
    }

    #[test]
    fn unchanged_result_does_not_notify() {
        let a = Observable::new(3);
        let parity = Derived::new("parity", vec![model(&a)], |v| Ok(v[0] % 2)).unwrap();
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = parity.subscribe(move |_| f.set(f.get() + 1));
        a.set(5);
        assert_eq!(fired.get(), 0);
        a.set(6);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn chained_derived_values() {
        let a = Observable::new(2);
        let sq = Derived::new("sq", vec![model(&a)], |v| Ok(v[0] * v[0])).unwrap();
        let sq_ref: ValueModelRef<i32> = Rc::new(sq.clone());
        let plus_one = Derived::new("plus_one", vec![sq_ref], |v| Ok(v[0] + 1)).unwrap();
        a.set(3);
        assert_eq!(plus_one.get(), 10);
    }

    #[test]
    fn write_is_rejected() {
        let a = Observable::new(1);
        let d = Derived::new("d", vec![model(&a)], |v| Ok(v[0])).unwrap();
        assert_eq!(d.set_value(5), Err(BindingError::ReadOnlyModel));
    }

    #[test]
    fn initial_compute_error_is_returned() {
        let a = Observable::new(1);
        let err = Derived::new("bad", vec![model(&a)], |_| -> Result<i32> {
            Err(BindingError::ReadOnlyModel)
        })
        .err();
        assert_eq!(err, Some(BindingError::ReadOnlyModel));
        assert_eq!(a.subscriber_count(), 0);
    }

    #[test]
    fn later_compute_error_keeps_previous_value() {
        let a = Observable::new(1);
        let d = Derived::new("checked", vec![model(&a)], |v| {
            if v[0] < 0 {
                Err(BindingError::UnknownType("negative".into()))
            } else {
                Ok(v[0] * 10)
            }
        })
        .unwrap();
        a.set(-1);
        assert_eq!(d.get(), 10);
        assert!(d.try_get().is_err());
        a.set(2);
        assert_eq!(d.try_get(), Ok(20));
    }

    #[test]
    fn cycle_is_detected_instead_of_looping() {
        // `seed` feeds `d`; a listener on `d` writes an ever-increasing value
        // back into `seed`, which would otherwise recurse without bound.
        let seed = Observable::new(0);
        let d = Derived::new("echo", vec![model(&seed)], |v| Ok(v[0] + 1)).unwrap();
        let s = seed.clone();
        let _sub = d.subscribe(move |v| s.set(*v));
        seed.set(5);
        assert!(d.is_cyclic());
        assert_eq!(d.try_get(), Err(BindingError::DependencyCycle("echo".into())));
        assert_eq!(d.get(), 6);
        assert_eq!(seed.get(), 6);
    }

    #[test]
    fn dropping_derived_detaches_from_sources() {
        let a = Observable::new(1);
        let d = Derived::new("d", vec![model(&a)], |v| Ok(v[0])).unwrap();
        assert_eq!(a.subscriber_count(), 1);
        drop(d);
        assert_eq!(a.subscriber_count(), 0);
    }
}
