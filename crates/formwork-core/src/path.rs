//! Dot-separated property paths (`"address.city"`).
//!
//! Reads and writes walk the path one segment at a time through
//! [`ObjectRef`]s. Type lookups walk declared [`ValueType`]s instead, so the
//! type of `address.city` is known even while `address` is `Null`.

use crate::error::{BindingError, Result};
use crate::object::{ObjectRef, Schema};
use crate::types::ValueType;
use crate::value::Value;

/// Segments of a property path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

/// Whether `path` names a nested property.
#[must_use]
pub fn is_nested(path: &str) -> bool {
    path.contains('.')
}

fn as_object<'a>(value: &'a Value, path: &str, upto: &str) -> Result<&'a ObjectRef> {
    match value {
        Value::Object(obj) => Ok(obj),
        Value::Null => Err(BindingError::NullInPath {
            path: path.to_owned(),
            segment: upto.to_owned(),
        }),
        other => Err(BindingError::NotAnObject {
            path: upto.to_owned(),
            found: other.kind().to_owned(),
        }),
    }
}

/// Prefix of `path` covering everything before segment `index`.
fn prefix(path: &str, index: usize) -> &str {
    if index == 0 {
        return "";
    }
    let end = path
        .match_indices('.')
        .nth(index - 1)
        .map_or(path.len(), |(i, _)| i);
    &path[..end]
}

/// Read `path` starting from `root`.
pub fn get(root: &Value, path: &str) -> Result<Value> {
    let mut current = root.clone();
    for (i, segment) in segments(path).enumerate() {
        let obj = as_object(&current, path, prefix(path, i))?.clone();
        current = obj.get(segment)?;
    }
    Ok(current)
}

/// Write `value` at `path` starting from `root`.
///
/// Every intermediate segment must resolve to an object.
pub fn set(root: &Value, path: &str, value: Value) -> Result<()> {
    let (parent_path, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };
    let parent = match parent_path {
        Some(p) => get(root, p)?,
        None => root.clone(),
    };
    as_object(&parent, path, parent_path.unwrap_or(""))?.set(last, value)
}

/// Declared type at `path` for an object whose own type is `root`.
pub fn value_type(root: &ObjectRef, path: &str) -> Result<ValueType> {
    let (first, rest) = split_first(path);
    walk_type(root.property_type(first)?, first, rest)
}

/// Declared type at `path` below a schema, without needing an instance.
pub fn schema_value_type(schema: &Schema, path: &str) -> Result<ValueType> {
    let (first, rest) = split_first(path);
    walk_type(schema.property_type(first)?, first, rest)
}

fn split_first(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((first, rest)) => (first, Some(rest)),
        None => (path, None),
    }
}

fn walk_type(mut ty: ValueType, first: &str, rest: Option<&str>) -> Result<ValueType> {
    let mut walked = first.to_owned();
    for segment in rest.into_iter().flat_map(segments) {
        let schema = match &ty {
            ValueType::Object(schema) => schema.clone(),
            other => {
                return Err(BindingError::NotAnObject {
                    path: walked,
                    found: other.to_string(),
                });
            }
        };
        ty = schema.property_type(segment)?;
        walked.push('.');
        walked.push_str(segment);
    }
    Ok(ty)
}
