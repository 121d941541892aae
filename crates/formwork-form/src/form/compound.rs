//! Compound form models: named children, sibling lookup and tree-wide state.
//!
//! Children are visited in registration order everywhere (commit, revert,
//! error merging, value-model search). A child's parent is set once, when it
//! is registered.
//!
//! Sub-forms created for a nested object path bind to that path through a
//! holder that is kept non-null: whenever the holder is observed holding
//! `Null`, a fresh instance of the declared type is written into it. With
//! buffering on, the holder is buffered and committed by the parent after
//! all children.

use std::rc::Rc;

use formwork_core::{BindingError, Result, Schema, Value, ValueType};
use formwork_runtime::reactive::{Buffered, Buffering, Subscription, ValueModelRef};

use super::{CommitOutcome, CompoundState, FormKind, FormModel, LeafState};
use crate::accessor::PropertyAdapter;

impl CompoundState {
    /// Children in registration order, cloned out so callbacks may re-enter.
    pub(super) fn snapshot(&self) -> Vec<FormModel> {
        self.children.borrow().values().cloned().collect()
    }
}

/// Writes a fresh instance into `holder` whenever it holds `Null`.
fn keep_non_null(holder: &ValueModelRef<Value>, schema: &Rc<Schema>) -> Result<Subscription> {
    if holder.value().is_null() {
        holder.set_value(Value::Object(schema.instantiate()))?;
    }
    let target = Rc::clone(holder);
    let schema = Rc::clone(schema);
    Ok(holder.subscribe(Box::new(move |value: &Value| {
        if value.is_null() {
            tracing::debug!(type_name = %schema.type_name(), "instantiating nested form object");
            if let Err(err) = target.set_value(Value::Object(schema.instantiate())) {
                tracing::warn!(error = %err, "failed to instantiate nested form object");
            }
        }
    })))
}

impl FormModel {
    fn compound_state(&self, op: &'static str) -> Result<&CompoundState> {
        match &self.inner.kind {
            FormKind::Compound(state) => Ok(state),
            FormKind::Leaf(_) => Err(BindingError::UnsupportedOnLeaf(op)),
        }
    }

    fn ensure_vacant(state: &CompoundState, name: &str) -> Result<()> {
        if state.children.borrow().contains_key(name) {
            return Err(BindingError::DuplicateChild(name.to_owned()));
        }
        Ok(())
    }

    /// Flat child over the same domain object as this model.
    pub fn create_child(&self, name: &str) -> Result<FormModel> {
        let state = self.compound_state("create_child")?;
        Self::ensure_vacant(state, name)?;
        let child = FormModel::build(
            Rc::clone(&self.inner.accessor),
            self.inner.config.for_child(name),
            FormKind::Leaf(LeafState::default()),
        );
        self.adopt(name, child)
    }

    /// Flat child bound to the sub-object at `path`.
    pub fn create_child_for(&self, name: &str, path: &str) -> Result<FormModel> {
        self.create_nested(name, path, false)
    }

    /// Compound child bound to the sub-object at `path`.
    pub fn create_compound_child_for(&self, name: &str, path: &str) -> Result<FormModel> {
        self.create_nested(name, path, true)
    }

    /// Flat child bound to the object held by a caller-supplied holder.
    pub fn create_child_on(&self, name: &str, holder: ValueModelRef<Value>) -> Result<FormModel> {
        let state = self.compound_state("create_child_on")?;
        Self::ensure_vacant(state, name)?;
        let child = FormModel::build(
            self.inner.accessor.scope(holder, None),
            self.inner.config.for_child(name),
            FormKind::Leaf(LeafState::default()),
        );
        self.adopt(name, child)
    }

    fn create_nested(&self, name: &str, path: &str, compound: bool) -> Result<FormModel> {
        let state = self.compound_state("create_child_for")?;
        Self::ensure_vacant(state, name)?;
        let schema = match self.inner.accessor.property_type(path)? {
            ValueType::Object(schema) => schema,
            other => {
                return Err(BindingError::NotAnObject {
                    path: path.to_owned(),
                    found: other.to_string(),
                });
            }
        };

        let adapter: ValueModelRef<Value> =
            Rc::new(PropertyAdapter::new(Rc::clone(&self.inner.accessor), path));
        let buffer = self
            .inner
            .config
            .buffer_changes
            .then(|| Buffered::new(Rc::clone(&adapter)));
        let holder: ValueModelRef<Value> = match &buffer {
            Some(buffered) => Rc::new(buffered.clone()),
            None => adapter,
        };

        let present = !holder.value().is_null();
        let keeper = keep_non_null(&holder, &schema)?;
        self.inner.listeners.borrow_mut().hold(keeper);
        if let Some(buffered) = buffer {
            state.object_buffers.borrow_mut().push(buffered);
        }

        let accessor = self.inner.accessor.scope(holder, Some(schema));
        let config = self.inner.config.for_child(name);
        let kind = if compound {
            FormKind::Compound(CompoundState::default())
        } else {
            FormKind::Leaf(LeafState::default())
        };
        let child = FormModel::build(accessor, config, kind);
        if !present {
            tracing::debug!(child = name, path, "sub-object absent, child starts disabled");
            child.set_enabled(false);
        }
        self.adopt(name, child)
    }

    /// Children inherit the rules source, then get registered.
    fn adopt(&self, name: &str, child: FormModel) -> Result<FormModel> {
        if let Some(source) = self.rules_source() {
            child.set_rules_source(source);
        }
        self.add_child_model(name, child)
    }

    /// Register a pre-built child under `name` and make this model its parent.
    pub fn add_child_model(&self, name: &str, child: FormModel) -> Result<FormModel> {
        let state = self.compound_state("add_child_model")?;
        Self::ensure_vacant(state, name)?;
        if child.ptr_eq(self) || child.inner.parent.borrow().is_some() {
            return Err(BindingError::AlreadyNested(child.id().to_owned()));
        }
        *child.inner.parent.borrow_mut() = Some(Rc::downgrade(&self.inner));
        tracing::debug!(form = %self.id(), child = name, "child form model registered");
        state
            .children
            .borrow_mut()
            .insert(name.to_owned(), child.clone());
        Ok(child)
    }

    /// Registered child by name.
    pub fn child(&self, name: &str) -> Result<FormModel> {
        let state = self.compound_state("child")?;
        state
            .children
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| BindingError::UnknownChild(name.to_owned()))
    }

    /// Child names in registration order.
    #[must_use]
    pub fn child_names(&self) -> Vec<String> {
        match &self.inner.kind {
            FormKind::Compound(state) => state.children.borrow().keys().cloned().collect(),
            FormKind::Leaf(_) => Vec::new(),
        }
    }

    /// Whether the named child has errors.
    pub fn has_errors_in(&self, name: &str) -> Result<bool> {
        Ok(self.child(name)?.has_errors())
    }

    /// First child, other than `excluding`, holding a value model for `path`.
    /// Does not create holders and does not consult the parent.
    pub fn find_value_model_for(
        &self,
        excluding: Option<&FormModel>,
        path: &str,
    ) -> Option<ValueModelRef<Value>> {
        let FormKind::Compound(state) = &self.inner.kind else {
            return None;
        };
        let found = state
            .snapshot()
            .into_iter()
            .filter(|child| !excluding.is_some_and(|ex| ex.ptr_eq(child)))
            .find_map(|child| match &child.inner.kind {
                FormKind::Leaf(_) => child.registered(path),
                FormKind::Compound(_) => child.find_value_model_for(None, path),
            });
        if found.is_none() {
            tracing::info!(form = %self.id(), path, "no value model found among nested form models");
        }
        found
    }

    pub(super) fn ask_parent(&self, path: &str) -> Option<ValueModelRef<Value>> {
        self.parent()?.find_value_model_for(Some(self), path)
    }

    pub(super) fn commit_compound(&self, state: &CompoundState) -> Result<CommitOutcome> {
        let mut committed = 0usize;
        let mut refused = 0usize;
        for child in state.snapshot() {
            match child.commit()? {
                CommitOutcome::Committed => committed += 1,
                CommitOutcome::Refused => refused += 1,
                CommitOutcome::Partial => {
                    committed += 1;
                    refused += 1;
                }
            }
        }
        let buffers: Vec<_> = state.object_buffers.borrow().clone();
        for buffer in &buffers {
            buffer.commit()?;
        }
        self.inner.commits.update(|n| *n += 1);

        let outcome = match (committed, refused) {
            (_, 0) => CommitOutcome::Committed,
            (0, _) => CommitOutcome::Refused,
            _ => CommitOutcome::Partial,
        };
        tracing::debug!(committed, refused, ?outcome, "compound commit complete");
        Ok(outcome)
    }
}
