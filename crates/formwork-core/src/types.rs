//! Type descriptors and the explicit "is-a" graph.
//!
//! Property types are described by [`ValueType`]. Binder selection needs to
//! find the *nearest* registration for a type, so type relationships are
//! declared up front in a [`TypeGraph`]: every type may name one parent (the
//! ancestor chain) and an ordered list of capabilities. Nothing is discovered
//! by runtime reflection.
//!
//! # Lineage order
//!
//! [`TypeGraph::lineage`] yields the search order used for nearest-match
//! lookups:
//!
//! 1. the type itself,
//! 2. its capabilities, breadth-first (direct capabilities, then theirs, ...),
//! 3. for each ancestor in turn: the ancestor, then its capabilities
//!    breadth-first,
//! 4. finally the universal root [`TypeName::ANY`].
//!
//! Every name appears at most once, so malformed graphs with cycles still
//! terminate.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::object::Schema;
use crate::value::Value;

/// Name of a type in the [`TypeGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TypeName(String);

impl TypeName {
    /// Universal root of every lineage.
    pub const ANY: &'static str = "any";
    pub const BOOL: &'static str = "bool";
    pub const INT: &'static str = "int";
    pub const FLOAT: &'static str = "float";
    pub const TEXT: &'static str = "text";
    pub const LIST: &'static str = "list";

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared type of a property.
#[derive(Debug, Clone)]
pub enum ValueType {
    /// Accepts any value.
    Any,
    Bool,
    Int,
    /// Accepts `Float` and `Int` values.
    Float,
    Text,
    List,
    /// A nested domain object described by a schema.
    Object(Rc<Schema>),
}

impl ValueType {
    /// Whether `value` may be stored in a property of this type.
    ///
    /// `Null` is accepted by every type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::Int, Value::Int(_)) => true,
            (Self::Float, Value::Float(_) | Value::Int(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::List, Value::List(_)) => true,
            (Self::Object(schema), Value::Object(obj)) => obj.type_name() == *schema.type_name(),
            _ => false,
        }
    }

    /// Name used for type-keyed lookups.
    #[must_use]
    pub fn type_name(&self) -> TypeName {
        match self {
            Self::Any => TypeName::from(TypeName::ANY),
            Self::Bool => TypeName::from(TypeName::BOOL),
            Self::Int => TypeName::from(TypeName::INT),
            Self::Float => TypeName::from(TypeName::FLOAT),
            Self::Text => TypeName::from(TypeName::TEXT),
            Self::List => TypeName::from(TypeName::LIST),
            Self::Object(schema) => schema.type_name().clone(),
        }
    }

    /// The schema of an object-typed property.
    #[must_use]
    pub fn schema(&self) -> Option<&Rc<Schema>> {
        match self {
            Self::Object(schema) => Some(schema),
            _ => None,
        }
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.type_name() == b.type_name(),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[derive(Debug, Clone, Default)]
struct TypeNode {
    parent: Option<TypeName>,
    capabilities: Vec<TypeName>,
}

/// Explicit "is-a" edges between type names.
///
/// # Example
///
/// ```
/// use formwork_core::types::{TypeGraph, TypeName};
///
/// let mut graph = TypeGraph::with_builtins();
/// graph.declare("Employee", Some("Person"), &["Payable"]);
/// graph.declare("Person", None, &["Named"]);
///
/// let order: Vec<_> = graph.lineage(&"Employee".into()).into_iter().map(|t| t.to_string()).collect();
/// assert_eq!(order, ["Employee", "Payable", "Person", "Named", "any"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    nodes: AHashMap<TypeName, TypeNode>,
}

impl TypeGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with the scalar types declared: `int` and `float` both
    /// carry the `number` capability.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut graph = Self::new();
        graph
            .declare(TypeName::INT, None, &["number"])
            .declare(TypeName::FLOAT, None, &["number"])
            .declare(TypeName::BOOL, None, &[])
            .declare(TypeName::TEXT, None, &[])
            .declare(TypeName::LIST, None, &[]);
        graph
    }

    /// Declare (or redeclare) a type with its parent and capabilities.
    pub fn declare(
        &mut self,
        name: impl Into<TypeName>,
        parent: Option<&str>,
        capabilities: &[&str],
    ) -> &mut Self {
        self.nodes.insert(
            name.into(),
            TypeNode {
                parent: parent.map(TypeName::from),
                capabilities: capabilities.iter().map(|c| TypeName::from(*c)).collect(),
            },
        );
        self
    }

    /// Whether the type was declared.
    #[must_use]
    pub fn contains(&self, name: &TypeName) -> bool {
        self.nodes.contains_key(name)
    }

    /// Declared parent of a type.
    #[must_use]
    pub fn parent(&self, name: &TypeName) -> Option<&TypeName> {
        self.nodes.get(name).and_then(|n| n.parent.as_ref())
    }

    /// Declared capabilities of a type, in declaration order.
    #[must_use]
    pub fn capabilities(&self, name: &TypeName) -> &[TypeName] {
        self.nodes
            .get(name)
            .map_or(&[][..], |n| n.capabilities.as_slice())
    }

    /// Full nearest-match search order for `name` (see module docs).
    #[must_use]
    pub fn lineage(&self, name: &TypeName) -> Vec<TypeName> {
        let mut seen = AHashSet::new();
        let mut order = Vec::new();

        let mut current = Some(name.clone());
        while let Some(ty) = current {
            if !seen.insert(ty.clone()) {
                break;
            }
            order.push(ty.clone());
            self.push_capabilities(&ty, &mut seen, &mut order);
            current = self.parent(&ty).cloned();
        }

        let any = TypeName::from(TypeName::ANY);
        if seen.insert(any.clone()) {
            order.push(any);
        }
        order
    }

    fn push_capabilities(
        &self,
        ty: &TypeName,
        seen: &mut AHashSet<TypeName>,
        order: &mut Vec<TypeName>,
    ) {
        let mut queue: VecDeque<&TypeName> = self.capabilities(ty).iter().collect();
        while let Some(cap) = queue.pop_front() {
            if !seen.insert(cap.clone()) {
                continue;
            }
            order.push(cap.clone());
            queue.extend(self.capabilities(cap));
        }
    }

    /// Whether `name` reaches `other` through parents or capabilities.
    #[must_use]
    pub fn is_a(&self, name: &TypeName, other: &TypeName) -> bool {
        self.lineage(name).iter().any(|t| t == other)
    }
}
