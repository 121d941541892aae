#![forbid(unsafe_code)]

//! Property access for form models.
//!
//! A [`PropertyAccessor`] reads and writes dot-separated paths on the domain
//! object held by a value model (the *form object holder*). Accessors created
//! with [`PropertyAccessor::scope`] address a nested object but share a
//! revision counter with the accessor they came from: a write through any of
//! them bumps the counter, and every [`PropertyAdapter`] over the same tree
//! re-reads its path. Replacing the object in a holder has the same effect
//! for the adapters bound to that holder.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown path | Property not declared | `UnknownProperty` from `get`/`set`/`property_type` |
//! | Bad value | Type mismatch on write | `IncompatibleValue`, nothing written |
//! | Null intermediate on read | `address.city` with `address == Null` | Adapter reads `Null` |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use formwork_core::{BindingError, Result, Schema, TypeName, Value, ValueType, path};
use formwork_runtime::reactive::{Observable, Subscription, ValueModel, ValueModelRef};

/// Path-based access to a domain object.
pub trait PropertyAccessor {
    /// The current domain object (usually `Value::Object`, possibly `Null`).
    fn object(&self) -> Value;

    /// Type of the bound object: the live object's type, else the declared one.
    fn object_type(&self) -> Option<TypeName>;

    fn get(&self, path: &str) -> Result<Value>;

    fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Declared type at `path`, known even while intermediates are `Null`.
    fn property_type(&self, path: &str) -> Result<ValueType>;

    /// Invoke a named method on the bound object.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value>;

    /// Accessor for the object held by `holder`, declared as `declared`.
    fn scope(
        &self,
        holder: ValueModelRef<Value>,
        declared: Option<Rc<Schema>>,
    ) -> Rc<dyn PropertyAccessor>;

    /// Call `callback` whenever values read through this accessor may have
    /// changed.
    fn watch(&self, callback: Rc<dyn Fn()>) -> Subscription;
}

/// Accessor over a holder of a schema-described domain object.
#[derive(Clone)]
pub struct ObjectAccessor {
    holder: ValueModelRef<Value>,
    declared: Option<Rc<Schema>>,
    revision: Observable<u64>,
}

impl ObjectAccessor {
    /// Accessor over the object in `holder`.
    pub fn new(holder: ValueModelRef<Value>) -> Self {
        Self {
            holder,
            declared: None,
            revision: Observable::new(0),
        }
    }

    /// Accessor over a fixed object, held in a fresh observable.
    pub fn for_value(object: impl Into<Value>) -> Self {
        Self::new(Rc::new(Observable::new(object.into())))
    }

    /// Declare the object's schema so types resolve while the holder is `Null`.
    #[must_use]
    pub fn with_schema(mut self, schema: Rc<Schema>) -> Self {
        self.declared = Some(schema);
        self
    }

    #[must_use]
    pub fn holder(&self) -> &ValueModelRef<Value> {
        &self.holder
    }

    /// Number of writes made through this accessor tree.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.get()
    }
}

impl PropertyAccessor for ObjectAccessor {
    fn object(&self) -> Value {
        self.holder.value()
    }

    fn object_type(&self) -> Option<TypeName> {
        match self.holder.value() {
            Value::Object(obj) => Some(obj.type_name()),
            _ => self.declared.as_ref().map(|s| s.type_name().clone()),
        }
    }

    fn get(&self, path: &str) -> Result<Value> {
        path::get(&self.holder.value(), path)
    }

    fn set(&self, path: &str, value: Value) -> Result<()> {
        path::set(&self.holder.value(), path, value)?;
        self.revision.update(|r| *r += 1);
        Ok(())
    }

    fn property_type(&self, path: &str) -> Result<ValueType> {
        match (self.holder.value(), &self.declared) {
            (Value::Object(obj), _) => path::value_type(&obj, path),
            (_, Some(schema)) => path::schema_value_type(schema, path),
            (Value::Null, None) => Err(BindingError::NullInPath {
                path: path.to_owned(),
                segment: String::new(),
            }),
            (other, None) => Err(BindingError::NotAnObject {
                path: String::new(),
                found: other.kind().to_owned(),
            }),
        }
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        match self.holder.value() {
            Value::Object(obj) => obj.invoke(method, args),
            other => Err(BindingError::NotAnObject {
                path: String::new(),
                found: other.kind().to_owned(),
            }),
        }
    }

    fn scope(
        &self,
        holder: ValueModelRef<Value>,
        declared: Option<Rc<Schema>>,
    ) -> Rc<dyn PropertyAccessor> {
        Rc::new(Self {
            holder,
            declared,
            revision: self.revision.clone(),
        })
    }

    fn watch(&self, callback: Rc<dyn Fn()>) -> Subscription {
        let on_object = Rc::clone(&callback);
        let object_sub = self.holder.subscribe(Box::new(move |_: &Value| on_object()));
        let revision_sub = self.revision.subscribe(move |_| callback());
        Subscription::merge(vec![object_sub, revision_sub])
    }
}

impl fmt::Debug for ObjectAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectAccessor")
            .field("object", &self.holder.value())
            .field("revision", &self.revision.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PropertyAdapter
// ---------------------------------------------------------------------------

struct AdapterInner {
    accessor: Rc<dyn PropertyAccessor>,
    path: String,
    mirror: Observable<Value>,
    watch: RefCell<Option<Subscription>>,
}

impl AdapterInner {
    fn read(&self) -> Value {
        read_path(self.accessor.as_ref(), &self.path)
    }

    fn refresh(&self) {
        tracing::trace!(path = %self.path, "property adapter refresh");
        self.mirror.set(self.read());
    }
}

fn read_path(accessor: &dyn PropertyAccessor, path: &str) -> Value {
    accessor.get(path).unwrap_or_else(|err| {
        tracing::trace!(path, error = %err, "property read failed; using null");
        Value::Null
    })
}

/// A value model over one property path of an accessor.
#[derive(Clone)]
pub struct PropertyAdapter {
    inner: Rc<AdapterInner>,
}

impl PropertyAdapter {
    pub fn new(accessor: Rc<dyn PropertyAccessor>, path: impl Into<String>) -> Self {
        let path = path.into();
        let inner = Rc::new(AdapterInner {
            mirror: Observable::new(read_path(accessor.as_ref(), &path)),
            accessor,
            path,
            watch: RefCell::new(None),
        });
        let weak = Rc::downgrade(&inner);
        let sub = inner.accessor.watch(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        }));
        *inner.watch.borrow_mut() = Some(sub);
        Self { inner }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Re-read the path and notify listeners if the value changed.
    pub fn refresh(&self) {
        self.inner.refresh();
    }
}

impl ValueModel<Value> for PropertyAdapter {
    /// Always a fresh read, so writes that bypassed the accessor are seen.
    fn value(&self) -> Value {
        self.inner.read()
    }

    fn set_value(&self, value: Value) -> Result<()> {
        self.inner.accessor.set(&self.inner.path, value)?;
        // Not every accessor reports its own writes through `watch`.
        self.inner.refresh();
        Ok(())
    }

    fn subscribe(&self, callback: Box<dyn Fn(&Value)>) -> Subscription {
        self.inner.mirror.subscribe(move |v: &Value| callback(v))
    }
}

impl fmt::Debug for PropertyAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAdapter")
            .field("path", &self.inner.path)
            .field("value", &self.inner.mirror.get())
            .finish()
    }
}
