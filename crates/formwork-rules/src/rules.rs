#![forbid(unsafe_code)]

//! Rule sets and where they come from.
//!
//! A [`RuleSet`] maps property names to [`Rule`]s for one domain-object
//! shape, in insertion order. Adding a second constraint for the same
//! property combines both under `All`. A [`RulesSource`] resolves the rule
//! set for a domain type; [`DefaultRulesSource`] is a plain registry that can
//! also fall back through a [`TypeGraph`] so rules declared for a parent type
//! apply to its descendants.
//!
//! # Invariants
//!
//! 1. `validate` reports every violated property, not just the first, in
//!    rule order.
//! 2. `violation_count` is the sum over all rules of failing leaves.
//! 3. Only `Severity::Error` results make `has_errors` true.

use std::rc::Rc;

use ahash::AHashMap;
use formwork_core::{TypeGraph, TypeName};
use indexmap::IndexMap;

use crate::constraint::{Constraint, PropertySource};
use crate::results::{ErrorMap, Severity, ValidationResult};

/// A constraint attached to one property.
#[derive(Debug, Clone)]
pub struct Rule {
    pub constraint: Constraint,
    pub severity: Severity,
}

impl Rule {
    #[must_use]
    pub fn new(constraint: Constraint, severity: Severity) -> Self {
        Self {
            constraint,
            severity,
        }
    }
}

/// Ordered property → rule mapping.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: IndexMap<String, Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error-severity constraint for `property`.
    #[must_use]
    pub fn rule(self, property: impl Into<String>, constraint: Constraint) -> Self {
        self.rule_with_severity(property, constraint, Severity::Error)
    }

    /// Add a constraint with an explicit severity.
    ///
    /// An existing rule for the same property is combined with the new
    /// constraint under `All` and keeps the more severe of the two levels.
    #[must_use]
    pub fn rule_with_severity(
        mut self,
        property: impl Into<String>,
        constraint: Constraint,
        severity: Severity,
    ) -> Self {
        self.insert(property, constraint, severity);
        self
    }

    pub fn insert(&mut self, property: impl Into<String>, constraint: Constraint, severity: Severity) {
        let property = property.into();
        let merged = match self.rules.get(&property) {
            Some(existing) => Rule::new(
                existing.constraint.clone().and(constraint),
                existing.severity.max(severity),
            ),
            None => Rule::new(constraint, severity),
        };
        self.rules.insert(property, merged);
    }

    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Rule> {
        self.rules.get(property)
    }

    /// Property names, in rule order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against the current property values.
    #[must_use]
    pub fn validate(&self, props: &dyn PropertySource) -> ErrorMap {
        let mut errors = ErrorMap::new();
        for (property, rule) in &self.rules {
            let value = props.property_value(property);
            if let Some(violated) = rule.constraint.validate(&value, Some(props)) {
                errors.insert(
                    property.clone(),
                    ValidationResult::new(property.clone(), value, violated, rule.severity),
                );
            }
        }
        errors
    }

    /// Whether any error-severity rule currently fails.
    #[must_use]
    pub fn has_errors(&self, props: &dyn PropertySource) -> bool {
        self.rules.iter().any(|(property, rule)| {
            rule.severity == Severity::Error
                && !rule
                    .constraint
                    .test(&props.property_value(property), Some(props))
        })
    }

    /// Total number of currently failing leaves across all rules.
    #[must_use]
    pub fn violation_count(&self, props: &dyn PropertySource) -> usize {
        self.rules
            .iter()
            .map(|(property, rule)| {
                rule.constraint
                    .violation_count(&props.property_value(property), Some(props))
            })
            .sum()
    }

    /// Total number of leaves across all rules.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.rules.values().map(|r| r.constraint.leaf_count()).sum()
    }
}

/// Resolves the rule set for a domain type.
pub trait RulesSource {
    fn rules_for(&self, type_name: &TypeName) -> Option<Rc<RuleSet>>;
}

/// Registry of rule sets keyed by domain type.
#[derive(Debug, Clone, Default)]
pub struct DefaultRulesSource {
    by_type: AHashMap<TypeName, Rc<RuleSet>>,
    graph: Option<TypeGraph>,
}

impl DefaultRulesSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fall back through `graph` (parents and capabilities) when a type has no
    /// rules of its own.
    #[must_use]
    pub fn with_type_graph(mut self, graph: TypeGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn register(&mut self, type_name: impl Into<TypeName>, rules: RuleSet) -> &mut Self {
        self.by_type.insert(type_name.into(), Rc::new(rules));
        self
    }
}

impl RulesSource for DefaultRulesSource {
    fn rules_for(&self, type_name: &TypeName) -> Option<Rc<RuleSet>> {
        if let Some(rules) = self.by_type.get(type_name) {
            return Some(Rc::clone(rules));
        }
        let graph = self.graph.as_ref()?;
        graph
            .lineage(type_name)
            .iter()
            .find_map(|ty| self.by_type.get(ty))
            .cloned()
    }
}
