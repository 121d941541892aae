#![forbid(unsafe_code)]

//! Binder selection.
//!
//! A [`BinderRegistry`] picks the binder (whatever the UI layer uses to
//! connect a control to a value model) for a `(control type, form, property)`
//! request. Lookup order:
//!
//! 1. a binder registered for the `(domain type, property)` pair, trying the
//!    domain type's lineage nearest first;
//! 2. a binder registered for the property's declared type, walking its
//!    [`TypeGraph::lineage`] (capabilities breadth-first, then ancestors);
//! 3. the default binder for the control type.
//!
//! The first type-walk hit is memoized under the requested type, so a repeat
//! lookup costs one map probe. The memo belongs to the registry instance and
//! is cleared by every registration.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Nothing matches | No pair, type or control registration | `NoBinder`, logged at warn |
//! | Unknown property | `select_for` on an undeclared path | `UnknownProperty` from the accessor |

use std::cell::RefCell;
use std::fmt;

use ahash::AHashMap;
use formwork_core::{BindingError, Result, TypeGraph, TypeName};

use crate::form::FormModel;

/// Registry of binders keyed by property, property type and control type.
pub struct BinderRegistry<B> {
    graph: TypeGraph,
    by_property: AHashMap<(TypeName, String), B>,
    by_type: AHashMap<TypeName, B>,
    by_control: AHashMap<String, B>,
    default_control: Option<String>,
    memo: RefCell<AHashMap<TypeName, B>>,
}

impl<B: Clone> Default for BinderRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Clone> BinderRegistry<B> {
    /// Registry over the builtin scalar types.
    #[must_use]
    pub fn new() -> Self {
        Self::with_type_graph(TypeGraph::with_builtins())
    }

    #[must_use]
    pub fn with_type_graph(graph: TypeGraph) -> Self {
        Self {
            graph,
            by_property: AHashMap::new(),
            by_type: AHashMap::new(),
            by_control: AHashMap::new(),
            default_control: None,
            memo: RefCell::new(AHashMap::new()),
        }
    }

    #[must_use]
    pub fn type_graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Mutable access to the type graph. Clears the memo.
    pub fn type_graph_mut(&mut self) -> &mut TypeGraph {
        self.memo.get_mut().clear();
        &mut self.graph
    }

    /// Binder for one property of one domain type.
    pub fn register_for_property(
        &mut self,
        domain_type: impl Into<TypeName>,
        property: impl Into<String>,
        binder: B,
    ) -> &mut Self {
        self.by_property
            .insert((domain_type.into(), property.into()), binder);
        self.memo.get_mut().clear();
        self
    }

    /// Binder for every property whose declared type is (or descends from)
    /// `property_type`.
    pub fn register_for_type(&mut self, property_type: impl Into<TypeName>, binder: B) -> &mut Self {
        self.by_type.insert(property_type.into(), binder);
        self.memo.get_mut().clear();
        self
    }

    /// Fallback binder for a control type.
    pub fn register_for_control(&mut self, control: impl Into<String>, binder: B) -> &mut Self {
        self.by_control.insert(control.into(), binder);
        self
    }

    /// Control type assumed when a request names none.
    pub fn set_default_control(&mut self, control: impl Into<String>) -> &mut Self {
        self.default_control = Some(control.into());
        self
    }

    /// Number of memoized type-walk results.
    #[must_use]
    pub fn memo_len(&self) -> usize {
        self.memo.borrow().len()
    }

    /// Select a binder.
    ///
    /// `domain_type` is the bound object's type, when known; `property_type`
    /// is the declared type of `property`.
    pub fn select(
        &self,
        control: Option<&str>,
        domain_type: Option<&TypeName>,
        property: &str,
        property_type: &TypeName,
    ) -> Result<B> {
        if let Some(binder) = domain_type.and_then(|ty| self.by_property_name(ty, property)) {
            tracing::trace!(property, "binder selected by property name");
            return Ok(binder);
        }
        if let Some(binder) = self.by_property_type(property_type) {
            return Ok(binder);
        }
        let control = control.or(self.default_control.as_deref());
        if let Some(binder) = control.and_then(|c| self.by_control.get(c)) {
            tracing::trace!(property, control, "binder selected by control type");
            return Ok(binder.clone());
        }
        let control = control.unwrap_or("<none>");
        tracing::warn!(property, control, %property_type, "no binder found");
        Err(BindingError::NoBinder {
            control: control.to_owned(),
            property: property.to_owned(),
        })
    }

    /// Select a binder for `property` of the object bound to `form`.
    pub fn select_for(&self, form: &FormModel, control: Option<&str>, property: &str) -> Result<B> {
        let accessor = form.accessor();
        let property_type = accessor.property_type(property)?.type_name();
        let domain_type = accessor.object_type();
        self.select(control, domain_type.as_ref(), property, &property_type)
    }

    fn by_property_name(&self, domain_type: &TypeName, property: &str) -> Option<B> {
        if self.by_property.is_empty() {
            return None;
        }
        self.graph.lineage(domain_type).into_iter().find_map(|ty| {
            self.by_property
                .get(&(ty, property.to_owned()))
                .cloned()
        })
    }

    fn by_property_type(&self, requested: &TypeName) -> Option<B> {
        if let Some(hit) = self.memo.borrow().get(requested) {
            return Some(hit.clone());
        }
        let (matched, binder) = self
            .graph
            .lineage(requested)
            .into_iter()
            .find_map(|ty| self.by_type.get(&ty).map(|b| (ty, b.clone())))?;
        tracing::debug!(%requested, %matched, "binder selected by property type");
        self.memo
            .borrow_mut()
            .insert(requested.clone(), binder.clone());
        Some(binder)
    }
}

impl<B> fmt::Debug for BinderRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderRegistry")
            .field("by_property", &self.by_property.len())
            .field("by_type", &self.by_type.len())
            .field("by_control", &self.by_control.len())
            .field("default_control", &self.default_control)
            .field("memoized", &self.memo.borrow().len())
            .finish()
    }
}
