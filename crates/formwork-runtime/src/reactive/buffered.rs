#![forbid(unsafe_code)]

//! Holders that defer writes until an explicit commit.
//!
//! A [`Buffered`] wraps a source [`ValueModel`]. While buffering is on,
//! `set_value` stores the value locally and only the buffered holder's own
//! listeners hear about it; the source is untouched until [`Buffering::commit`].
//! [`Buffering::revert`] discards the pending value and the holder reflects its
//! source again.
//!
//! # Invariants
//!
//! 1. `value()` is the pending value when one exists, else a fresh read of
//!    the source (sources that do not notify are still seen).
//! 2. A pending value exists only while it differs from the source; setting
//!    the source's value clears it. Source changes are forwarded to listeners
//!    only while no value is pending.
//! 3. `commit()` on a clean holder is a no-op; on failure the holder stays dirty
//!    and the source error is returned unmodified.
//! 4. `revert()` always succeeds.
//! 5. With buffering disabled, writes pass straight through to the source.
//!
//! Validation is not performed here. The owning form model decides whether a
//! commit may run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use formwork_core::Result;

use super::model::{Buffering, ValueModel, ValueModelRef};
use super::observable::{Observable, Subscription};

struct BufferedInner<T> {
    source: ValueModelRef<T>,
    pending: RefCell<Option<T>>,
    buffering: Cell<bool>,
    visible: Observable<T>,
    source_sub: RefCell<Option<Subscription>>,
}

impl<T: Clone + PartialEq + 'static> BufferedInner<T> {
    fn on_source_change(&self, value: &T) {
        if self.pending.borrow().is_none() {
            tracing::trace!("buffered holder follows source change");
            self.visible.set(value.clone());
        }
    }
}

/// A buffering wrapper around another value model.
pub struct Buffered<T> {
    inner: Rc<BufferedInner<T>>,
}

impl<T> Clone for Buffered<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Buffered<T> {
    /// Wrap `source`, buffering enabled.
    pub fn new(source: ValueModelRef<T>) -> Self {
        let inner = Rc::new(BufferedInner {
            visible: Observable::new(source.value()),
            source,
            pending: RefCell::new(None),
            buffering: Cell::new(true),
            source_sub: RefCell::new(None),
        });
        let weak = Rc::downgrade(&inner);
        let sub = inner.source.subscribe(Box::new(move |v: &T| {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_change(v);
            }
        }));
        *inner.source_sub.borrow_mut() = Some(sub);
        Self { inner }
    }

    /// The pending value, else a fresh read of the source.
    #[must_use]
    pub fn get(&self) -> T {
        match &*self.inner.pending.borrow() {
            Some(pending) => pending.clone(),
            None => self.inner.source.value(),
        }
    }

    /// Store `value`, or forward it to the source in pass-through mode.
    pub fn set(&self, value: T) -> Result<()> {
        if !self.inner.buffering.get() {
            self.inner.source.set_value(value)?;
            self.inner.pending.borrow_mut().take();
            self.inner.visible.set(self.inner.source.value());
            return Ok(());
        }
        let current = self.inner.source.value();
        if value == current {
            self.inner.pending.borrow_mut().take();
            self.inner.visible.set(current);
            return Ok(());
        }
        tracing::trace!("buffered holder stores pending value");
        *self.inner.pending.borrow_mut() = Some(value.clone());
        self.inner.visible.set(value);
        Ok(())
    }

    /// Toggle between buffering and pass-through mode. A pending value is kept.
    pub fn set_buffering(&self, on: bool) {
        self.inner.buffering.set(on);
    }

    #[must_use]
    pub fn source(&self) -> &ValueModelRef<T> {
        &self.inner.source
    }

    /// Pending value, if any.
    #[must_use]
    pub fn pending(&self) -> Option<T> {
        self.inner.pending.borrow().clone()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.visible.subscribe(callback)
    }
}

impl<T: Clone + PartialEq + 'static> Buffering for Buffered<T> {
    fn commit(&self) -> Result<()> {
        let Some(value) = self.pending() else {
            return Ok(());
        };
        if value == self.inner.source.value() {
            self.inner.pending.borrow_mut().take();
            return Ok(());
        }
        self.inner.source.set_value(value)?;
        self.inner.pending.borrow_mut().take();
        self.inner.visible.set(self.inner.source.value());
        Ok(())
    }

    fn revert(&self) {
        if self.inner.pending.borrow_mut().take().is_some() {
            tracing::trace!("buffered holder reverted");
        }
        self.inner.visible.set(self.inner.source.value());
    }

    fn is_dirty(&self) -> bool {
        match &*self.inner.pending.borrow() {
            Some(pending) => *pending != self.inner.source.value(),
            None => false,
        }
    }

    fn is_buffering(&self) -> bool {
        self.inner.buffering.get()
    }
}

impl<T: Clone + PartialEq + 'static> ValueModel<T> for Buffered<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn set_value(&self, value: T) -> Result<()> {
        self.set(value)
    }

    fn subscribe(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.inner.visible.subscribe(move |v: &T| callback(v))
    }

    fn buffering(&self) -> Option<&dyn Buffering> {
        Some(self)
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for Buffered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffered")
            .field("value", &self.get())
            .field("pending", &self.inner.pending.borrow().is_some())
            .field("buffering", &self.inner.buffering.get())
            .finish()
    }
}
