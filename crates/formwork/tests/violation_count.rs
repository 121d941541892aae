#![forbid(unsafe_code)]

//! Violation counting on a form.
//!
//! Invariants checked:
//! - N independent failing leaf constraints report `violation_count == N`.
//! - Fixing exactly one value lowers the count by exactly one.
//! - Composite rules count failing leaves, not failing properties.
//!
//! Run: `cargo test -p formwork --test violation_count`

use std::rc::Rc;

use formwork::prelude::*;
use proptest::prelude::*;

const FIELDS: usize = 8;

fn wide_schema() -> Rc<Schema> {
    (0..FIELDS)
        .fold(Schema::builder("Wide"), |b, i| {
            b.property_with_default(format!("f{i}"), ValueType::Int, 0)
        })
        .build()
}

/// Every field must be positive; `failing[i]` leaves field `i` at zero.
fn form_with_failures(failing: &[bool]) -> FormModel {
    let form = FormModel::for_object(wide_schema().instantiate());
    let rules = (0..FIELDS).fold(RuleSet::new(), |rules, i| {
        rules.rule(format!("f{i}"), Constraint::compare(Relation::Gt, 0))
    });
    form.set_rules(rules).unwrap();
    for (i, fails) in failing.iter().enumerate() {
        if !fails {
            form.set_value(&format!("f{i}"), 1).unwrap();
        }
    }
    form
}

proptest! {
    #[test]
    fn count_matches_failing_leaves(failing in prop::collection::vec(any::<bool>(), FIELDS)) {
        let form = form_with_failures(&failing);
        let expected = failing.iter().filter(|f| **f).count();
        prop_assert_eq!(form.violation_count(), expected);
        prop_assert_eq!(form.errors().len(), expected);
    }

    #[test]
    fn fixing_one_value_drops_count_by_one(
        failing in prop::collection::vec(any::<bool>(), FIELDS),
        pick in 0usize..FIELDS,
    ) {
        let form = form_with_failures(&failing);
        let before = form.violation_count();
        prop_assume!(failing[pick]);
        form.set_value(&format!("f{pick}"), 7).unwrap();
        prop_assert_eq!(form.violation_count(), before - 1);
    }
}

#[test]
fn composite_rule_counts_each_failing_leaf() {
    let schema = Schema::builder("Account")
        .property_with_default("login", ValueType::Text, "")
        .build();
    let form = FormModel::for_object(schema.instantiate());
    let login = Constraint::required()
        .and(Constraint::min_length(3))
        .and(Constraint::pattern("[a-z]+").unwrap());
    form.set_rules(RuleSet::new().rule("login", login)).unwrap();

    // Blank fails all three leaves.
    assert_eq!(form.violation_count(), 3);
    assert_eq!(form.errors().len(), 1);
    form.set_value("login", "AB").unwrap();
    assert_eq!(form.violation_count(), 2);
    form.set_value("login", "abc").unwrap();
    assert_eq!(form.violation_count(), 0);
    assert!(!form.has_errors());
}
