#![forbid(unsafe_code)]

//! Composable constraints.
//!
//! A [`Constraint`] is an immutable predicate tree. Leaves test a single value
//! (`required`, `length`, `range`, ...); property-scoped nodes pull other
//! property values out of a [`PropertySource`]; `When` makes a requirement
//! conditional; `All`, `Any` and `Not` compose. Cloning a constraint is a
//! reference-count bump.
//!
//! # Evaluation
//!
//! - [`Constraint::test`] short-circuits: `All` stops at the first failure,
//!   `Any` at the first success.
//! - [`Constraint::validate`] returns the violated constraint: the failing
//!   leaf inside an `All` chain, the composite itself for `Any` and `Not`.
//! - [`Constraint::violation_count`] visits every leaf and counts the failing
//!   ones. It is not clamped to 1.
//!
//! # Example
//!
//! ```
//! use formwork_core::Value;
//! use formwork_rules::{Constraint, Relation};
//!
//! let age = Constraint::all([
//!     Constraint::required(),
//!     Constraint::compare(Relation::Ge, 0),
//! ]);
//! assert!(age.test(&Value::from(5), None));
//! assert!(!age.test(&Value::from(-1), None));
//! assert_eq!(age.violation_count(&Value::Null, None), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use formwork_core::Value;
use regex::Regex;

/// Read access to the other properties of the object under validation.
pub trait PropertySource {
    /// Current value of `property`, `Null` when unknown or unreadable.
    fn property_value(&self, property: &str) -> Value;
}

impl<F: Fn(&str) -> Value> PropertySource for F {
    fn property_value(&self, property: &str) -> Value {
        self(property)
    }
}

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// Binary relation between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    /// Whether `left <relation> right` holds.
    ///
    /// `Eq`/`Ne` use value equality. Ordering relations need comparable
    /// operands (numbers, text, booleans) and fail otherwise.
    #[must_use]
    pub fn holds(self, left: &Value, right: &Value) -> bool {
        match self {
            Self::Eq => left == right || left.compare(right) == Some(Ordering::Equal),
            Self::Ne => !Self::Eq.holds(left, right),
            Self::Lt => left.compare(right) == Some(Ordering::Less),
            Self::Le => matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => left.compare(right) == Some(Ordering::Greater),
            Self::Ge => matches!(
                left.compare(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Self::Eq => "equal to",
            Self::Ne => "different from",
            Self::Lt => "less than",
            Self::Le => "at most",
            Self::Gt => "greater than",
            Self::Ge => "at least",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Constraint tree
// ---------------------------------------------------------------------------

/// User-supplied value predicate.
pub type Predicate = Rc<dyn Fn(&Value) -> bool>;

/// The node kinds of a constraint tree.
#[derive(Clone)]
pub enum ConstraintKind {
    /// Not blank: `Null`, whitespace-only text and empty lists fail.
    Required,
    /// Length of text (chars) or list, inclusive bounds. `Null` has length 0.
    Length { min: Option<usize>, max: Option<usize> },
    /// Inclusive range over comparable values. `Null` fails.
    Range { min: Option<Value>, max: Option<Value> },
    Compare { relation: Relation, bound: Value },
    /// Text must match the whole regex. Non-text fails.
    Pattern(Regex),
    EqualTo(Value),
    OneOf(Vec<Value>),
    Custom { name: String, predicate: Predicate },
    /// Evaluate `constraint` against another property's value.
    Property { name: String, constraint: Constraint },
    PropertiesCompare {
        left: String,
        relation: Relation,
        right: String,
    },
    /// Enforce `then` only while `guard` holds.
    When { guard: Constraint, then: Constraint },
    All(Vec<Constraint>),
    Any(Vec<Constraint>),
    Not(Constraint),
}

/// An immutable, shareable constraint.
#[derive(Clone)]
pub struct Constraint {
    kind: Rc<ConstraintKind>,
}

impl From<ConstraintKind> for Constraint {
    fn from(kind: ConstraintKind) -> Self {
        Self { kind: Rc::new(kind) }
    }
}

impl Constraint {
    #[must_use]
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Whether both handles share the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Constraint) -> bool {
        Rc::ptr_eq(&self.kind, &other.kind)
    }

    // -- builders -----------------------------------------------------------

    #[must_use]
    pub fn required() -> Self {
        ConstraintKind::Required.into()
    }

    #[must_use]
    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        ConstraintKind::Length { min, max }.into()
    }

    #[must_use]
    pub fn min_length(min: usize) -> Self {
        Self::length(Some(min), None)
    }

    #[must_use]
    pub fn max_length(max: usize) -> Self {
        Self::length(None, Some(max))
    }

    #[must_use]
    pub fn range(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        ConstraintKind::Range {
            min: Some(min.into()),
            max: Some(max.into()),
        }
        .into()
    }

    #[must_use]
    pub fn compare(relation: Relation, bound: impl Into<Value>) -> Self {
        ConstraintKind::Compare {
            relation,
            bound: bound.into(),
        }
        .into()
    }

    /// Whole-value regex match. The pattern is anchored on both ends.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(ConstraintKind::Pattern(anchored).into())
    }

    #[must_use]
    pub fn equal_to(value: impl Into<Value>) -> Self {
        ConstraintKind::EqualTo(value.into()).into()
    }

    #[must_use]
    pub fn one_of(values: impl IntoIterator<Item = Value>) -> Self {
        ConstraintKind::OneOf(values.into_iter().collect()).into()
    }

    #[must_use]
    pub fn custom(name: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        ConstraintKind::Custom {
            name: name.into(),
            predicate: Rc::new(predicate),
        }
        .into()
    }

    #[must_use]
    pub fn property(name: impl Into<String>, constraint: Constraint) -> Self {
        ConstraintKind::Property {
            name: name.into(),
            constraint,
        }
        .into()
    }

    #[must_use]
    pub fn properties_compare(
        left: impl Into<String>,
        relation: Relation,
        right: impl Into<String>,
    ) -> Self {
        ConstraintKind::PropertiesCompare {
            left: left.into(),
            relation,
            right: right.into(),
        }
        .into()
    }

    #[must_use]
    pub fn when(guard: Constraint, then: Constraint) -> Self {
        ConstraintKind::When { guard, then }.into()
    }

    /// Required only while `guard` holds.
    #[must_use]
    pub fn required_if(guard: Constraint) -> Self {
        Self::when(guard, Self::required())
    }

    #[must_use]
    pub fn all(children: impl IntoIterator<Item = Constraint>) -> Self {
        ConstraintKind::All(children.into_iter().collect()).into()
    }

    #[must_use]
    pub fn any(children: impl IntoIterator<Item = Constraint>) -> Self {
        ConstraintKind::Any(children.into_iter().collect()).into()
    }

    #[must_use]
    pub fn negate(inner: Constraint) -> Self {
        ConstraintKind::Not(inner).into()
    }

    #[must_use]
    pub fn and(self, other: Constraint) -> Self {
        Self::all([self, other])
    }

    #[must_use]
    pub fn or(self, other: Constraint) -> Self {
        Self::any([self, other])
    }

    // -- evaluation ---------------------------------------------------------

    /// Whether `value` satisfies the constraint.
    #[must_use]
    pub fn test(&self, value: &Value, props: Option<&dyn PropertySource>) -> bool {
        match &*self.kind {
            ConstraintKind::Property { name, constraint } => {
                constraint.test(&lookup(props, name), props)
            }
            ConstraintKind::PropertiesCompare {
                left,
                relation,
                right,
            } => relation.holds(&lookup(props, left), &lookup(props, right)),
            ConstraintKind::When { guard, then } => {
                !guard.test(value, props) || then.test(value, props)
            }
            ConstraintKind::All(children) => children.iter().all(|c| c.test(value, props)),
            ConstraintKind::Any(children) => children.iter().any(|c| c.test(value, props)),
            ConstraintKind::Not(inner) => !inner.test(value, props),
            leaf => test_leaf(leaf, value),
        }
    }

    /// The violated constraint, or `None` when `value` passes.
    #[must_use]
    pub fn validate(&self, value: &Value, props: Option<&dyn PropertySource>) -> Option<Constraint> {
        match &*self.kind {
            ConstraintKind::Property { name, constraint } => {
                constraint.validate(&lookup(props, name), props)
            }
            ConstraintKind::When { guard, then } => {
                if guard.test(value, props) {
                    then.validate(value, props)
                } else {
                    None
                }
            }
            ConstraintKind::All(children) => {
                children.iter().find_map(|c| c.validate(value, props))
            }
            _ => (!self.test(value, props)).then(|| self.clone()),
        }
    }

    /// Number of currently failing leaves, without short-circuiting.
    ///
    /// A passing `Any` counts 0; a failing one counts the failures of all its
    /// children. `Not` and `PropertiesCompare` count as single leaves. An
    /// inactive `When` counts 0.
    #[must_use]
    pub fn violation_count(&self, value: &Value, props: Option<&dyn PropertySource>) -> usize {
        match &*self.kind {
            ConstraintKind::Property { name, constraint } => {
                constraint.violation_count(&lookup(props, name), props)
            }
            ConstraintKind::When { guard, then } => {
                if guard.test(value, props) {
                    then.violation_count(value, props)
                } else {
                    0
                }
            }
            ConstraintKind::All(children) => children
                .iter()
                .map(|c| c.violation_count(value, props))
                .sum(),
            ConstraintKind::Any(children) => {
                if self.test(value, props) {
                    0
                } else {
                    children
                        .iter()
                        .map(|c| c.violation_count(value, props))
                        .sum()
                }
            }
            _ => usize::from(!self.test(value, props)),
        }
    }

    /// Number of leaves in the tree. Guards of `When` are not counted.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match &*self.kind {
            ConstraintKind::Property { constraint, .. } => constraint.leaf_count(),
            ConstraintKind::When { then, .. } => then.leaf_count(),
            ConstraintKind::All(children) | ConstraintKind::Any(children) => {
                children.iter().map(Constraint::leaf_count).sum()
            }
            _ => 1,
        }
    }

    /// Message key identifying the kind of violation.
    #[must_use]
    pub fn code(&self) -> &str {
        match &*self.kind {
            ConstraintKind::Required => "required",
            ConstraintKind::Length { .. } => "length",
            ConstraintKind::Range { .. } => "range",
            ConstraintKind::Compare { .. } => "compare",
            ConstraintKind::Pattern(_) => "pattern",
            ConstraintKind::EqualTo(_) => "equal_to",
            ConstraintKind::OneOf(_) => "one_of",
            ConstraintKind::Custom { name, .. } => name,
            ConstraintKind::Property { constraint, .. } => constraint.code(),
            ConstraintKind::PropertiesCompare { .. } => "properties_compare",
            ConstraintKind::When { then, .. } => then.code(),
            ConstraintKind::All(_) => "all",
            ConstraintKind::Any(_) => "any",
            ConstraintKind::Not(_) => "not",
        }
    }
}

fn lookup(props: Option<&dyn PropertySource>, name: &str) -> Value {
    match props {
        Some(source) => source.property_value(name),
        None => {
            tracing::warn!(property = name, "property constraint evaluated without a property source");
            Value::Null
        }
    }
}

fn test_leaf(kind: &ConstraintKind, value: &Value) -> bool {
    match kind {
        ConstraintKind::Required => !value.is_blank(),
        ConstraintKind::Length { min, max } => value
            .len()
            .is_some_and(|n| min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m)),
        ConstraintKind::Range { min, max } => {
            !value.is_null()
                && min.as_ref().is_none_or(|m| Relation::Ge.holds(value, m))
                && max.as_ref().is_none_or(|m| Relation::Le.holds(value, m))
        }
        ConstraintKind::Compare { relation, bound } => {
            !value.is_null() && relation.holds(value, bound)
        }
        ConstraintKind::Pattern(re) => value.as_text().is_some_and(|s| re.is_match(s)),
        ConstraintKind::EqualTo(expected) => Relation::Eq.holds(value, expected),
        ConstraintKind::OneOf(options) => options.iter().any(|o| Relation::Eq.holds(value, o)),
        ConstraintKind::Custom { predicate, .. } => predicate(value),
        // Composite kinds are handled by `Constraint::test`.
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Display: English description, used by the default message rendering
// ---------------------------------------------------------------------------

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ConstraintKind::Required => f.write_str("is required"),
            ConstraintKind::Length { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => write!(f, "must be {lo} to {hi} characters long"),
                (Some(lo), None) => write!(f, "must be at least {lo} characters long"),
                (None, Some(hi)) => write!(f, "must be at most {hi} characters long"),
                (None, None) => f.write_str("may have any length"),
            },
            ConstraintKind::Range { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => write!(f, "must be between {lo} and {hi}"),
                (Some(lo), None) => write!(f, "must be at least {lo}"),
                (None, Some(hi)) => write!(f, "must be at most {hi}"),
                (None, None) => f.write_str("must be present"),
            },
            ConstraintKind::Compare { relation, bound } => {
                write!(f, "must be {} {bound}", relation.phrase())
            }
            ConstraintKind::Pattern(re) => write!(f, "must match `{}`", re.as_str()),
            ConstraintKind::EqualTo(v) => write!(f, "must equal {v}"),
            ConstraintKind::OneOf(options) => {
                f.write_str("must be one of ")?;
                for (i, o) in options.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{o}")?;
                }
                Ok(())
            }
            ConstraintKind::Custom { name, .. } => write!(f, "must satisfy {name}"),
            ConstraintKind::Property { name, constraint } => write!(f, "{name} {constraint}"),
            ConstraintKind::PropertiesCompare {
                left,
                relation,
                right,
            } => write!(f, "{left} must be {} {right}", relation.phrase()),
            ConstraintKind::When { guard, then } => write!(f, "{then} when {guard}"),
            ConstraintKind::All(children) => join(f, children, " and "),
            ConstraintKind::Any(children) => join(f, children, " or "),
            ConstraintKind::Not(inner) => write!(f, "must not hold: {inner}"),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, children: &[Constraint], sep: &str) -> fmt::Result {
    for (i, c) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({}: {self})", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn props(pairs: &[(&str, Value)]) -> impl Fn(&str) -> Value + use<> {
        let map: Vec<(String, Value)> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        move |name: &str| {
            map.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        }
    }

    #[test]
    fn required_rejects_blank_values() {
        let c = Constraint::required();
        assert!(!c.test(&Value::Null, None));
        assert!(!c.test(&Value::from("  "), None));
        assert!(!c.test(&Value::List(vec![]), None));
        assert!(c.test(&Value::from("Ann"), None));
        assert!(c.test(&Value::from(0), None));
    }

    #[test]
    fn length_counts_chars_and_null_as_zero() {
        let c = Constraint::length(Some(2), Some(4));
        assert!(c.test(&Value::from("héé"), None));
        assert!(!c.test(&Value::from("a"), None));
        assert!(!c.test(&Value::from("abcde"), None));
        assert!(!c.test(&Value::Null, None));
        assert!(Constraint::max_length(3).test(&Value::Null, None));
    }

    #[test]
    fn range_and_compare_mix_ints_and_floats() {
        let r = Constraint::range(0, 10);
        assert!(r.test(&Value::from(2.5), None));
        assert!(r.test(&Value::from(10), None));
        assert!(!r.test(&Value::from(10.5), None));
        assert!(!r.test(&Value::Null, None));
        let ge = Constraint::compare(Relation::Ge, 0);
        assert!(ge.test(&Value::from(0.0), None));
        assert!(!ge.test(&Value::from(-1), None));
        assert!(!ge.test(&Value::Null, None));
    }

    #[test]
    fn pattern_matches_whole_text() {
        let c = Constraint::pattern("[a-z]+").unwrap();
        assert!(c.test(&Value::from("abc"), None));
        assert!(!c.test(&Value::from("abc1"), None));
        assert!(!c.test(&Value::from(3), None));
        assert!(Constraint::pattern("(").is_err());
    }

    #[test]
    fn equality_and_membership() {
        assert!(Constraint::equal_to(1).test(&Value::from(1.0), None));
        let c = Constraint::one_of([Value::from("a"), Value::from("b")]);
        assert!(c.test(&Value::from("b"), None));
        assert!(!c.test(&Value::from("c"), None));
    }

    #[test]
    fn all_short_circuits_on_first_failure() {
        let calls = Rc::new(Cell::new(0));
        let k = Rc::clone(&calls);
        let counting = Constraint::custom("counting", move |_| {
            k.set(k.get() + 1);
            true
        });
        let c = Constraint::all([Constraint::required(), counting.clone()]);
        assert!(!c.test(&Value::Null, None));
        assert_eq!(calls.get(), 0);
        let any = Constraint::any([Constraint::required(), counting]);
        assert!(any.test(&Value::from(1), None));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn validate_reports_failing_leaf_of_all() {
        let ge = Constraint::compare(Relation::Ge, 0);
        let c = Constraint::all([Constraint::required(), ge.clone()]);
        let violated = c.validate(&Value::from(-3), None).unwrap();
        assert!(violated.ptr_eq(&ge));
        assert!(c.validate(&Value::from(3), None).is_none());
    }

    #[test]
    fn validate_reports_composite_for_any_and_not() {
        let any = Constraint::any([Constraint::equal_to(1), Constraint::equal_to(2)]);
        assert!(any.validate(&Value::from(3), None).unwrap().ptr_eq(&any));
        let not = Constraint::negate(Constraint::equal_to(1));
        assert!(not.validate(&Value::from(1), None).unwrap().ptr_eq(&not));
    }

    #[test]
    fn required_if_enforces_only_while_guard_holds() {
        let c = Constraint::required_if(Constraint::property("married", Constraint::equal_to(true)));
        let single = props(&[("married", Value::from(false))]);
        let married = props(&[("married", Value::from(true))]);
        assert!(c.test(&Value::Null, Some(&single)));
        assert!(!c.test(&Value::Null, Some(&married)));
        assert!(c.test(&Value::from("Bob"), Some(&married)));
        assert_eq!(c.validate(&Value::Null, Some(&married)).unwrap().code(), "required");
        assert_eq!(c.violation_count(&Value::Null, Some(&single)), 0);
    }

    #[test]
    fn properties_compare_reads_both_sides() {
        let c = Constraint::properties_compare("min", Relation::Le, "max");
        let ok = props(&[("min", Value::from(1)), ("max", Value::from(5))]);
        let bad = props(&[("min", Value::from(9)), ("max", Value::from(5))]);
        assert!(c.test(&Value::Null, Some(&ok)));
        assert!(!c.test(&Value::Null, Some(&bad)));
    }

    #[test]
    fn property_constraint_without_source_sees_null() {
        let c = Constraint::property("name", Constraint::required());
        assert!(!c.test(&Value::from("ignored"), None));
    }

    #[test]
    fn violation_count_sums_without_short_circuit() {
        let c = Constraint::all([
            Constraint::required(),
            Constraint::min_length(3),
            Constraint::pattern("[0-9]+").unwrap(),
        ]);
        assert_eq!(c.violation_count(&Value::Null, None), 3);
        assert_eq!(c.violation_count(&Value::from("ab"), None), 2);
        assert_eq!(c.violation_count(&Value::from("123"), None), 0);
        assert_eq!(c.leaf_count(), 3);
    }

    #[test]
    fn violation_count_for_any_is_zero_when_one_passes() {
        let c = Constraint::any([Constraint::equal_to(1), Constraint::equal_to(2)]);
        assert_eq!(c.violation_count(&Value::from(2), None), 0);
        assert_eq!(c.violation_count(&Value::from(3), None), 2);
    }

    #[test]
    fn descriptions_read_as_english() {
        assert_eq!(Constraint::compare(Relation::Ge, 0).to_string(), "must be at least 0");
        assert_eq!(Constraint::required().to_string(), "is required");
        assert_eq!(
            Constraint::one_of([Value::from(1), Value::from(2)]).to_string(),
            "must be one of 1, 2"
        );
    }

    proptest! {
        #[test]
        fn failing_leaf_count_matches_violation_count(values in proptest::collection::vec(-50i64..50, 1..12)) {
            let leaves: Vec<Constraint> = values
                .iter()
                .map(|_| Constraint::compare(Relation::Ge, 0))
                .collect();
            let tree = Constraint::all(leaves.clone());
            let source = move |name: &str| -> Value {
                name.parse::<usize>().ok().and_then(|i| values.get(i).copied()).map(Value::from).unwrap_or_default()
            };
            let scoped = Constraint::all(
                (0..leaves.len()).map(|i| Constraint::property(i.to_string(), Constraint::compare(Relation::Ge, 0))),
            );
            let expected = (0..leaves.len())
                .filter(|i| source(&i.to_string()).as_int().is_some_and(|v| v < 0))
                .count();
            prop_assert_eq!(scoped.violation_count(&Value::Null, Some(&source)), expected);
            prop_assert_eq!(tree.leaf_count(), leaves.len());
        }
    }
}
