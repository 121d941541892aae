#![forbid(unsafe_code)]

//! Per-field enabled and read-only state.
//!
//! A field carries its own flags, set independently by whoever presents it.
//! Form-level flags never overwrite them; a consumer honors the combination:
//!
//! - effective enabled = form enabled AND field enabled
//! - effective read-only = form read-only OR field read-only
//!
//! Both combinations are [`Derived`] holders, so a control can subscribe to
//! them directly.

use std::rc::Rc;

use formwork_core::Result;
use formwork_runtime::reactive::{Derived, Observable, ValueModelRef};

/// State flags of one form field.
#[derive(Clone)]
pub struct FieldMetadata {
    enabled: Observable<bool>,
    read_only: Observable<bool>,
    effective_enabled: Derived<bool>,
    effective_read_only: Derived<bool>,
}

impl FieldMetadata {
    pub(crate) fn new(
        property: &str,
        form_enabled: &Observable<bool>,
        form_read_only: &Observable<bool>,
        read_only: bool,
    ) -> Result<Self> {
        let enabled = Observable::new(true);
        let read_only = Observable::new(read_only);
        let effective_enabled = Derived::new(
            format!("{property}.enabled"),
            vec![model(form_enabled), model(&enabled)],
            |v| Ok(v[0] && v[1]),
        )?;
        let effective_read_only = Derived::new(
            format!("{property}.read_only"),
            vec![model(form_read_only), model(&read_only)],
            |v| Ok(v[0] || v[1]),
        )?;
        Ok(Self {
            enabled,
            read_only,
            effective_enabled,
            effective_read_only,
        })
    }

    /// Field-level enabled flag.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Field-level read-only flag.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.set(read_only);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.effective_enabled.get()
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.effective_read_only.get()
    }

    /// Whether a control may write: enabled and not read-only.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.is_enabled() && !self.is_read_only()
    }

    #[must_use]
    pub fn enabled(&self) -> &Derived<bool> {
        &self.effective_enabled
    }

    #[must_use]
    pub fn read_only(&self) -> &Derived<bool> {
        &self.effective_read_only
    }
}

impl std::fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMetadata")
            .field("enabled", &self.is_enabled())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

fn model(obs: &Observable<bool>) -> ValueModelRef<bool> {
    Rc::new(obs.clone())
}
