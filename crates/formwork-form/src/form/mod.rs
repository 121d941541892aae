#![forbid(unsafe_code)]

//! Form models.
//!
//! A [`FormModel`] binds the editable properties of one domain object to
//! value models and tracks their validation and dirty state. It is a cheap
//! handle over shared state; the kind is a tagged variant:
//!
//! - **Leaf**: holds one value model per property path, created lazily and
//!   wrapped in a buffered holder when buffering is on.
//! - **Compound**: holds named child form models and aggregates their state
//!   (see the `compound` submodule).
//!
//! # Invariants
//!
//! 1. `add(path)` is idempotent: a second call returns the same holder.
//! 2. `commit()` on a leaf with errors mutates nothing and reports `Refused`.
//! 3. A successful commit writes every buffered holder in registration order
//!    and then notifies commit listeners once.
//! 4. `revert()` always succeeds and never consults validation.
//! 5. Validation reads the values the user sees (buffered values), not the
//!    values last committed to the domain object.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown path | `add("nmae")` | `UnknownProperty`, nothing registered |
//! | Unknown method | `add_method("nope", ..)` | `UnknownMethod`, nothing registered |
//! | Wrong kind | `add` on a compound model | `UnsupportedOnCompound` |
//! | Accessor rejects a write | Commit of an incompatible value | Error returned unmodified, later holders untouched |

mod compound;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use formwork_core::{BindingError, ObjectRef, Result, Value};
use formwork_rules::{ErrorMap, PropertySource, RuleSet, RulesSource};
use formwork_runtime::reactive::{
    BindingScope, Buffered, Derived, Observable, Subscription, ValueModelRef,
};
use indexmap::IndexMap;

use crate::accessor::{ObjectAccessor, PropertyAccessor, PropertyAdapter};
use crate::config::FormConfig;
use crate::field::FieldMetadata;

/// What a commit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every buffered value was written.
    Committed,
    /// Nothing was written because the form has errors.
    Refused,
    /// Some children committed while others refused (compound models only).
    Partial,
}

#[derive(Default)]
struct LeafState {
    fields: RefCell<IndexMap<String, ValueModelRef<Value>>>,
    metadata: RefCell<IndexMap<String, FieldMetadata>>,
}

#[derive(Default)]
struct CompoundState {
    children: RefCell<IndexMap<String, FormModel>>,
    object_buffers: RefCell<Vec<Buffered<Value>>>,
}

enum FormKind {
    Leaf(LeafState),
    Compound(CompoundState),
}

struct FormInner {
    config: FormConfig,
    accessor: Rc<dyn PropertyAccessor>,
    enabled: Observable<bool>,
    read_only: Observable<bool>,
    rules: RefCell<Option<Rc<RuleSet>>>,
    rules_source: RefCell<Option<Rc<dyn RulesSource>>>,
    parent: RefCell<Option<Weak<FormInner>>>,
    commits: Observable<u64>,
    listeners: RefCell<BindingScope>,
    kind: FormKind,
}

/// Handle to a form model. Clones share state.
#[derive(Clone)]
pub struct FormModel {
    inner: Rc<FormInner>,
}

// ---------------------------------------------------------------------------
// Construction and shared state
// ---------------------------------------------------------------------------

impl FormModel {
    /// Flat form model over `accessor`, buffering on.
    pub fn new(accessor: Rc<dyn PropertyAccessor>) -> Self {
        Self::with_config(accessor, FormConfig::default())
    }

    pub fn with_config(accessor: Rc<dyn PropertyAccessor>, config: FormConfig) -> Self {
        Self::build(accessor, config, FormKind::Leaf(LeafState::default()))
    }

    /// Flat form model over a domain object.
    pub fn for_object(object: ObjectRef) -> Self {
        Self::new(Rc::new(ObjectAccessor::for_value(object)))
    }

    /// Compound form model over `accessor`, buffering on.
    pub fn compound(accessor: Rc<dyn PropertyAccessor>) -> Self {
        Self::compound_with_config(accessor, FormConfig::default())
    }

    pub fn compound_with_config(accessor: Rc<dyn PropertyAccessor>, config: FormConfig) -> Self {
        Self::build(accessor, config, FormKind::Compound(CompoundState::default()))
    }

    /// Compound form model over a domain object.
    pub fn compound_for_object(object: ObjectRef) -> Self {
        Self::compound(Rc::new(ObjectAccessor::for_value(object)))
    }

    fn build(accessor: Rc<dyn PropertyAccessor>, config: FormConfig, kind: FormKind) -> Self {
        Self {
            inner: Rc::new(FormInner {
                config,
                accessor,
                enabled: Observable::new(true),
                read_only: Observable::new(false),
                rules: RefCell::new(None),
                rules_source: RefCell::new(None),
                parent: RefCell::new(None),
                commits: Observable::new(0),
                listeners: RefCell::new(BindingScope::new()),
                kind,
            }),
        }
    }

    /// Identifier from the config, `"form"` when none was given.
    #[must_use]
    pub fn id(&self) -> &str {
        self.inner.config.id.as_deref().unwrap_or("form")
    }

    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self.inner.kind, FormKind::Compound(_))
    }

    #[must_use]
    pub fn accessor(&self) -> &Rc<dyn PropertyAccessor> {
        &self.inner.accessor
    }

    /// The bound domain object.
    #[must_use]
    pub fn form_object(&self) -> Value {
        self.inner.accessor.object()
    }

    /// Compound model this form is registered under.
    #[must_use]
    pub fn parent(&self) -> Option<FormModel> {
        let parent = self.inner.parent.borrow();
        parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| FormModel { inner })
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &FormModel) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -- enabled / read-only ------------------------------------------------

    /// Form-level enabled flag. Compound models cascade it to every child.
    /// Field-level flags are left untouched.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.set(enabled);
        if let FormKind::Compound(state) = &self.inner.kind {
            for child in state.snapshot() {
                child.set_enabled(enabled);
            }
        }
    }

    /// Form-level read-only flag, cascaded like [`FormModel::set_enabled`].
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.read_only.set(read_only);
        if let FormKind::Compound(state) = &self.inner.kind {
            for child in state.snapshot() {
                child.set_read_only(read_only);
            }
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.read_only.get()
    }

    /// Observe the form-level enabled flag.
    pub fn subscribe_enabled(&self, callback: impl Fn(&bool) + 'static) -> Subscription {
        self.inner.enabled.subscribe(callback)
    }

    /// Called once after every completed commit.
    pub fn subscribe_committed(&self, callback: impl Fn() + 'static) -> Subscription {
        self.inner.commits.subscribe(move |_| callback())
    }

    /// Number of completed commits.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.inner.commits.get()
    }

    fn type_label(&self) -> String {
        self.inner
            .accessor
            .object_type()
            .map_or_else(|| "?".to_owned(), |t| t.to_string())
    }

    fn leaf(&self, op: &'static str) -> Result<&LeafState> {
        match &self.inner.kind {
            FormKind::Leaf(state) => Ok(state),
            FormKind::Compound(_) => Err(BindingError::UnsupportedOnCompound(op)),
        }
    }
}

// ---------------------------------------------------------------------------
// Leaf: value models
// ---------------------------------------------------------------------------

impl FormModel {
    /// Holder for `path`, created on first use.
    ///
    /// The path is checked against the accessor before anything is created.
    /// With buffering on, the property adapter is wrapped in a [`Buffered`].
    pub fn add(&self, path: &str) -> Result<ValueModelRef<Value>> {
        let leaf = self.leaf("add")?;
        if let Some(existing) = leaf.fields.borrow().get(path) {
            return Ok(Rc::clone(existing));
        }
        self.inner.accessor.property_type(path)?;
        let adapter: ValueModelRef<Value> =
            Rc::new(PropertyAdapter::new(Rc::clone(&self.inner.accessor), path));
        let model: ValueModelRef<Value> = if self.inner.config.buffer_changes {
            Rc::new(Buffered::new(adapter))
        } else {
            adapter
        };
        self.register(leaf, path, Rc::clone(&model), false)?;
        tracing::trace!(form = %self.id(), path, "value model added");
        Ok(model)
    }

    /// Register a caller-supplied holder for `path`, replacing any existing
    /// holder. The field's enabled and read-only flags survive the swap.
    pub fn add_model(&self, path: &str, model: ValueModelRef<Value>) -> Result<ValueModelRef<Value>> {
        let leaf = self.leaf("add_model")?;
        self.register(leaf, path, Rc::clone(&model), false)?;
        Ok(model)
    }

    /// Derived holder invoking `method` on the domain object with the value
    /// of `dependency`. Registered under the method name.
    pub fn add_method(&self, method: &str, dependency: &str) -> Result<ValueModelRef<Value>> {
        self.add_method_multi(method, &[dependency])
    }

    /// Derived holder invoking `method` with the values of `dependencies`, in
    /// order, recomputed whenever any of them changes.
    pub fn add_method_multi(
        &self,
        method: &str,
        dependencies: &[&str],
    ) -> Result<ValueModelRef<Value>> {
        let leaf = self.leaf("add_method")?;
        let sources = dependencies
            .iter()
            .map(|dep| self.value_model(dep))
            .collect::<Result<Vec<_>>>()?;
        let accessor = Rc::clone(&self.inner.accessor);
        let name = method.to_owned();
        let derived = Derived::new(method, sources, move |args| accessor.invoke(&name, args))?;
        let model: ValueModelRef<Value> = Rc::new(derived);
        self.register(leaf, method, Rc::clone(&model), true)?;
        Ok(model)
    }

    fn register(
        &self,
        leaf: &LeafState,
        path: &str,
        model: ValueModelRef<Value>,
        read_only: bool,
    ) -> Result<()> {
        // Re-registering a path swaps the holder but keeps its field flags.
        let existing = leaf.metadata.borrow().get(path).cloned();
        match existing {
            Some(meta) if read_only => meta.set_read_only(true),
            Some(_) => {}
            None => {
                let meta =
                    FieldMetadata::new(path, &self.inner.enabled, &self.inner.read_only, read_only)?;
                leaf.metadata.borrow_mut().insert(path.to_owned(), meta);
            }
        }
        leaf.fields.borrow_mut().insert(path.to_owned(), model);
        Ok(())
    }

    /// Registered holder for `path`, if any. Never creates one.
    #[must_use]
    pub fn registered(&self, path: &str) -> Option<ValueModelRef<Value>> {
        match &self.inner.kind {
            FormKind::Leaf(leaf) => leaf.fields.borrow().get(path).cloned(),
            FormKind::Compound(_) => None,
        }
    }

    /// Registered property paths, in registration order.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        match &self.inner.kind {
            FormKind::Leaf(leaf) => leaf.fields.borrow().keys().cloned().collect(),
            FormKind::Compound(_) => Vec::new(),
        }
    }

    /// Field flags of a registered property.
    pub fn field(&self, path: &str) -> Result<FieldMetadata> {
        let leaf = self.leaf("field")?;
        let metadata = leaf.metadata.borrow();
        metadata
            .get(path)
            .cloned()
            .ok_or_else(|| BindingError::UnknownProperty {
                type_name: self.type_label(),
                property: path.to_owned(),
            })
    }

    /// Holder for `path`.
    ///
    /// A leaf returns its registered holder, else creates one when its own
    /// accessor knows the path, else asks its parent to search the siblings.
    /// A compound model searches its children, then its parent.
    pub fn value_model(&self, path: &str) -> Result<ValueModelRef<Value>> {
        match &self.inner.kind {
            FormKind::Leaf(_) => {
                if let Some(model) = self.registered(path) {
                    return Ok(model);
                }
                match self.add(path) {
                    Ok(model) => Ok(model),
                    Err(err) if err.is_unknown_path() => self.ask_parent(path).ok_or(err),
                    Err(err) => Err(err),
                }
            }
            FormKind::Compound(_) => self
                .find_value_model_for(None, path)
                .or_else(|| self.ask_parent(path))
                .ok_or_else(|| BindingError::UnknownProperty {
                    type_name: self.type_label(),
                    property: path.to_owned(),
                }),
        }
    }

    /// Current value of `path` as the user sees it.
    pub fn value(&self, path: &str) -> Result<Value> {
        Ok(self.value_model(path)?.value())
    }

    /// Write `path` through its holder (buffered when buffering is on).
    pub fn set_value(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.value_model(path)?.set_value(value.into())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Property values as the form shows them: registered holders first, the
/// accessor otherwise.
struct FormValues<'a> {
    form: &'a FormModel,
}

impl PropertySource for FormValues<'_> {
    fn property_value(&self, property: &str) -> Value {
        match self.form.registered(property) {
            Some(model) => model.value(),
            None => self.form.inner.accessor.get(property).unwrap_or_default(),
        }
    }
}

impl FormModel {
    /// Use `rules` for this form. Every rule must name a property the
    /// accessor knows or a registered holder.
    pub fn set_rules(&self, rules: RuleSet) -> Result<()> {
        self.leaf("set_rules")?;
        for property in rules.properties() {
            if self.registered(property).is_none() {
                self.inner.accessor.property_type(property)?;
            }
        }
        *self.inner.rules.borrow_mut() = Some(Rc::new(rules));
        Ok(())
    }

    /// Source consulted when no explicit rule set was given. Children created
    /// afterwards inherit it.
    pub fn set_rules_source(&self, source: Rc<dyn RulesSource>) {
        *self.inner.rules_source.borrow_mut() = Some(source);
    }

    #[must_use]
    pub fn rules_source(&self) -> Option<Rc<dyn RulesSource>> {
        self.inner.rules_source.borrow().clone()
    }

    /// Effective rule set: the explicit one, else the rules source's set for
    /// the bound object's type.
    #[must_use]
    pub fn rules(&self) -> Option<Rc<RuleSet>> {
        if let Some(rules) = self.inner.rules.borrow().as_ref() {
            return Some(Rc::clone(rules));
        }
        let source = self.rules_source()?;
        let type_name = self.inner.accessor.object_type()?;
        source.rules_for(&type_name)
    }

    /// Whether any error-severity rule fails (any child, for compound models).
    #[must_use]
    pub fn has_errors(&self) -> bool {
        match &self.inner.kind {
            FormKind::Leaf(_) => self
                .rules()
                .is_some_and(|rules| rules.has_errors(&FormValues { form: self })),
            FormKind::Compound(state) => state.snapshot().iter().any(FormModel::has_errors),
        }
    }

    /// Every violated property with its result.
    ///
    /// Compound models merge their children's maps in registration order; a
    /// property reported by several children keeps the last child's entry.
    #[must_use]
    pub fn errors(&self) -> ErrorMap {
        match &self.inner.kind {
            FormKind::Leaf(_) => self
                .rules()
                .map(|rules| rules.validate(&FormValues { form: self }))
                .unwrap_or_default(),
            FormKind::Compound(state) => {
                let mut all = ErrorMap::new();
                for child in state.snapshot() {
                    all.extend(child.errors());
                }
                all
            }
        }
    }

    /// Number of failing constraint leaves across the form (or tree).
    #[must_use]
    pub fn violation_count(&self) -> usize {
        match &self.inner.kind {
            FormKind::Leaf(_) => self
                .rules()
                .map_or(0, |rules| rules.violation_count(&FormValues { form: self })),
            FormKind::Compound(state) => state
                .snapshot()
                .iter()
                .map(FormModel::violation_count)
                .sum(),
        }
    }
}

// ---------------------------------------------------------------------------
// Buffering: commit / revert / dirty
// ---------------------------------------------------------------------------

impl FormModel {
    /// Write every buffered value to the domain object.
    ///
    /// A leaf with errors refuses and mutates nothing. A compound model
    /// commits each child (each child refusing on its own), then its
    /// sub-object buffers; it does not check the tree as a whole first.
    pub fn commit(&self) -> Result<CommitOutcome> {
        let span = tracing::debug_span!("form.commit", form = %self.id());
        let _enter = span.enter();
        match &self.inner.kind {
            FormKind::Leaf(leaf) => {
                if self.has_errors() {
                    tracing::debug!(
                        violations = self.violation_count(),
                        "commit refused: form has errors"
                    );
                    return Ok(CommitOutcome::Refused);
                }
                let fields: Vec<_> = leaf.fields.borrow().values().cloned().collect();
                for model in &fields {
                    if let Some(buffer) = model.buffering() {
                        buffer.commit()?;
                    }
                }
                self.inner.commits.update(|n| *n += 1);
                tracing::debug!(fields = fields.len(), "commit complete");
                Ok(CommitOutcome::Committed)
            }
            FormKind::Compound(state) => self.commit_compound(state),
        }
    }

    /// Discard every buffered value. Never fails.
    pub fn revert(&self) {
        let span = tracing::debug_span!("form.revert", form = %self.id());
        let _enter = span.enter();
        match &self.inner.kind {
            FormKind::Leaf(leaf) => {
                let fields: Vec<_> = leaf.fields.borrow().values().cloned().collect();
                for model in &fields {
                    if let Some(buffer) = model.buffering() {
                        buffer.revert();
                    }
                }
            }
            FormKind::Compound(state) => {
                for child in state.snapshot() {
                    child.revert();
                }
            }
        }
    }

    /// Whether any buffered holder differs from its source (any child, for
    /// compound models).
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match &self.inner.kind {
            FormKind::Leaf(leaf) => leaf
                .fields
                .borrow()
                .values()
                .any(|m| m.buffering().is_some_and(|b| b.is_dirty())),
            FormKind::Compound(state) => state.snapshot().iter().any(FormModel::is_dirty),
        }
    }
}

impl fmt::Debug for FormModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FormModel");
        s.field("id", &self.id())
            .field("compound", &self.is_compound())
            .field("enabled", &self.is_enabled())
            .field("read_only", &self.is_read_only());
        match &self.inner.kind {
            FormKind::Leaf(leaf) => s.field("paths", &leaf.fields.borrow().keys().collect::<Vec<_>>()),
            FormKind::Compound(state) => {
                s.field("children", &state.children.borrow().keys().collect::<Vec<_>>())
            }
        };
        s.finish()
    }
}
