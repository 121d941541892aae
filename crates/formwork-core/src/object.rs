//! Domain objects and the schema-driven [`Record`].
//!
//! Form models never touch concrete Rust structs directly: they reach domain
//! objects through the [`DomainObject`] trait, which exposes named properties,
//! their declared types, and named methods. Any type can implement it; the
//! crate ships [`Record`], a dynamic object whose shape is described by a
//! [`Schema`].
//!
//! # Example
//!
//! ```
//! use formwork_core::object::Schema;
//! use formwork_core::types::ValueType;
//! use formwork_core::value::Value;
//!
//! let person = Schema::builder("Person")
//!     .property("name", ValueType::Text)
//!     .property_with_default("age", ValueType::Int, 0)
//!     .method("describe", |rec, _args| {
//!         Ok(Value::from(format!("{} ({})", rec.value("name"), rec.value("age"))))
//!     })
//!     .build();
//!
//! let ann = person.instantiate();
//! ann.set("name", "Ann".into()).unwrap();
//! assert_eq!(ann.get("age").unwrap(), Value::Int(0));
//! assert_eq!(ann.invoke("describe", &[]).unwrap(), Value::from("\"Ann\" (0)"));
//! ```

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::error::{BindingError, Result};
use crate::types::{TypeName, ValueType};
use crate::value::Value;

/// Property-level access to a domain object.
pub trait DomainObject {
    /// Name of the object's type, used for rule and binder lookups.
    fn type_name(&self) -> TypeName;

    /// Read a property.
    fn get(&self, property: &str) -> Result<Value>;

    /// Write a property. Unknown properties and incompatible values fail.
    fn set(&mut self, property: &str, value: Value) -> Result<()>;

    /// Declared type of a property.
    fn property_type(&self, property: &str) -> Result<ValueType>;

    /// Invoke a named method with positional arguments.
    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
        Err(BindingError::UnknownMethod {
            type_name: self.type_name().to_string(),
            method: method.to_owned(),
        })
    }
}

/// Shared handle to a domain object.
///
/// Cloning the handle shares the object; equality of [`Value::Object`] is
/// identity of the underlying allocation.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<dyn DomainObject>>);

impl ObjectRef {
    /// Wrap a domain object in a shared handle.
    pub fn new<T: DomainObject + 'static>(object: T) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    #[must_use]
    pub fn type_name(&self) -> TypeName {
        self.0.borrow().type_name()
    }

    pub fn get(&self, property: &str) -> Result<Value> {
        self.0.borrow().get(property)
    }

    pub fn set(&self, property: &str, value: Value) -> Result<()> {
        self.0.borrow_mut().set(property, value)
    }

    pub fn property_type(&self, property: &str) -> Result<ValueType> {
        self.0.borrow().property_type(property)
    }

    /// Invoke a method. The object stays borrowed for the duration of the
    /// call, so the method must not write back to the same object.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.0.borrow().invoke(method, args)
    }

    /// Borrow the underlying object.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, dyn DomainObject> {
        self.0.borrow()
    }

    /// Whether both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef")
            .field(&self.type_name().as_str())
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// A named method on a [`Record`].
pub type Method = Rc<dyn Fn(&Record, &[Value]) -> Result<Value>>;

/// Custom constructor used by [`Schema::instantiate`].
pub type Constructor = Rc<dyn Fn() -> ObjectRef>;

#[derive(Debug, Clone)]
struct PropertyDef {
    value_type: ValueType,
    default: Value,
}

/// Shape of a dynamic domain object type.
pub struct Schema {
    type_name: TypeName,
    properties: IndexMap<String, PropertyDef>,
    methods: AHashMap<String, Method>,
    constructor: Option<Constructor>,
}

impl Schema {
    /// Start describing a type.
    #[must_use]
    pub fn builder(type_name: impl Into<TypeName>) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                type_name: type_name.into(),
                properties: IndexMap::new(),
                methods: AHashMap::new(),
                constructor: None,
            },
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Declared type of a property.
    pub fn property_type(&self, property: &str) -> Result<ValueType> {
        self.properties
            .get(property)
            .map(|def| def.value_type.clone())
            .ok_or_else(|| BindingError::unknown_property(self.type_name.as_str(), property))
    }

    /// Property names in declaration order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Create a fresh object of this type.
    ///
    /// Uses the custom constructor when one was registered, otherwise a
    /// [`Record`] with every property at its default.
    #[must_use]
    pub fn instantiate(self: &Rc<Self>) -> ObjectRef {
        match &self.constructor {
            Some(construct) => construct(),
            None => ObjectRef::new(Record::new(Rc::clone(self))),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Builder for [`Schema`].
#[must_use]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Declare a property whose default is `Null`.
    pub fn property(self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.property_with_default(name, value_type, Value::Null)
    }

    /// Declare a property with an initial value.
    pub fn property_with_default(
        mut self,
        name: impl Into<String>,
        value_type: ValueType,
        default: impl Into<Value>,
    ) -> Self {
        self.schema.properties.insert(
            name.into(),
            PropertyDef {
                value_type,
                default: default.into(),
            },
        );
        self
    }

    /// Register a named method.
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Record, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.schema.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Replace the default [`Record`] construction.
    pub fn constructor(mut self, construct: impl Fn() -> ObjectRef + 'static) -> Self {
        self.schema.constructor = Some(Rc::new(construct));
        self
    }

    #[must_use]
    pub fn build(self) -> Rc<Schema> {
        Rc::new(self.schema)
    }
}

/// Dynamic domain object described by a [`Schema`].
#[derive(Debug, Clone)]
pub struct Record {
    schema: Rc<Schema>,
    values: IndexMap<String, Value>,
}

impl Record {
    /// Create a record with every property at its default.
    #[must_use]
    pub fn new(schema: Rc<Schema>) -> Self {
        let values = schema
            .properties
            .iter()
            .map(|(name, def)| (name.clone(), def.default.clone()))
            .collect();
        Self { schema, values }
    }

    #[must_use]
    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    /// Current value of a property, `Null` when undeclared.
    #[must_use]
    pub fn value(&self, property: &str) -> Value {
        self.values.get(property).cloned().unwrap_or_default()
    }
}

impl DomainObject for Record {
    fn type_name(&self) -> TypeName {
        self.schema.type_name.clone()
    }

    fn get(&self, property: &str) -> Result<Value> {
        self.values
            .get(property)
            .cloned()
            .ok_or_else(|| BindingError::unknown_property(self.schema.type_name.as_str(), property))
    }

    fn set(&mut self, property: &str, value: Value) -> Result<()> {
        let def = self
            .schema
            .properties
            .get(property)
            .ok_or_else(|| BindingError::unknown_property(self.schema.type_name.as_str(), property))?;
        if !def.value_type.accepts(&value) {
            return Err(BindingError::IncompatibleValue {
                property: property.to_owned(),
                expected: def.value_type.to_string(),
                found: value.kind().to_owned(),
            });
        }
        self.values.insert(property.to_owned(), value);
        Ok(())
    }

    fn property_type(&self, property: &str) -> Result<ValueType> {
        self.schema.property_type(property)
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let Some(m) = self.schema.methods.get(method) else {
            return Err(BindingError::UnknownMethod {
                type_name: self.schema.type_name.to_string(),
                method: method.to_owned(),
            });
        };
        m(self, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Rc<Schema> {
        Schema::builder("Address")
            .property("city", ValueType::Text)
            .property_with_default("zip", ValueType::Text, "00000")
            .build()
    }

    #[test]
    fn record_defaults() {
        let rec = Record::new(address());
        assert_eq!(rec.get("city").unwrap(), Value::Null);
        assert_eq!(rec.get("zip").unwrap(), Value::from("00000"));
    }

    #[test]
    fn unknown_property_is_structural() {
        let obj = address().instantiate();
        let err = obj.get("street").unwrap_err();
        assert_eq!(err, BindingError::unknown_property("Address", "street"));
        assert!(obj.set("street", "x".into()).is_err());
    }

    #[test]
    fn incompatible_value_rejected_without_mutation() {
        let obj = address().instantiate();
        let err = obj.set("city", Value::Int(3)).unwrap_err();
        assert!(matches!(err, BindingError::IncompatibleValue { .. }));
        assert_eq!(obj.get("city").unwrap(), Value::Null);
    }

    #[test]
    fn object_identity_equality() {
        let schema = address();
        let a = schema.instantiate();
        let b = schema.instantiate();
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn unknown_method() {
        let obj = address().instantiate();
        let err = obj.invoke("format", &[]).unwrap_err();
        assert!(matches!(err, BindingError::UnknownMethod { .. }));
    }

    #[test]
    fn custom_constructor_is_used() {
        let inner = address();
        let schema = Schema::builder("Address")
            .property("city", ValueType::Text)
            .constructor(move || {
                let rec = Record::new(Rc::clone(&inner));
                let obj = ObjectRef::new(rec);
                let _ = obj.set("city", "Springfield".into());
                obj
            })
            .build();
        let obj = schema.instantiate();
        assert_eq!(obj.get("city").unwrap(), Value::from("Springfield"));
    }

    #[test]
    fn object_typed_property_checks_type_name() {
        let addr = address();
        let person = Schema::builder("Person")
            .property("address", ValueType::Object(Rc::clone(&addr)))
            .build();
        let other = Schema::builder("Company").build();
        let p = person.instantiate();
        p.set("address", Value::Object(addr.instantiate())).unwrap();
        assert!(p.set("address", Value::Object(other.instantiate())).is_err());
    }
}
