#![forbid(unsafe_code)]

//! Structured log events and violation reports.
//!
//! Invariants checked:
//! - A refused commit logs at debug and mutates nothing.
//! - A failed binder lookup logs at warn and returns `NoBinder`.
//! - A derived holder depending on itself reports a cycle at warn.
//! - Violation reports carry catalog text when a template exists and the
//!   built-in English otherwise.
//!
//! Run: `cargo test -p formwork --test diagnostics`

use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use formwork::prelude::*;
use formwork::{MessageTemplates, ViolationReport};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

type Captured = Arc<Mutex<Vec<(Level, String)>>>;

struct Capture(Captured);

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<(Level, String)>) {
    let events: Captured = Arc::default();
    let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&events)));
    let out = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().unwrap().clone();
    (out, events)
}

fn logged(events: &[(Level, String)], level: Level, needle: &str) -> bool {
    events
        .iter()
        .any(|(l, msg)| *l == level && msg.contains(needle))
}

fn contact() -> ObjectRef {
    Schema::builder("Contact")
        .property_with_default("email", ValueType::Text, "")
        .property_with_default("age", ValueType::Int, 0)
        .build()
        .instantiate()
}

#[test]
fn refused_commit_is_logged() {
    let object = contact();
    let form = FormModel::for_object(object.clone());
    form.set_rules(RuleSet::new().rule("email", Constraint::required()))
        .unwrap();
    form.set_value("age", 30).unwrap();

    let (outcome, events) = capture(|| form.commit().unwrap());
    assert_eq!(outcome, CommitOutcome::Refused);
    assert!(logged(&events, Level::DEBUG, "commit refused"));
    assert_eq!(object.get("age").unwrap(), Value::from(0));
}

#[test]
fn missing_binder_is_logged() {
    let registry: BinderRegistry<&str> = BinderRegistry::new();
    let form = FormModel::for_object(contact());
    let (result, events) = capture(|| registry.select_for(&form, Some("slider"), "email"));
    assert!(matches!(result, Err(BindingError::NoBinder { .. })));
    assert!(logged(&events, Level::WARN, "no binder"));
}

#[test]
fn derived_cycle_is_reported() {
    let seed = Observable::new(1);
    let source: ValueModelRef<i32> = Rc::new(seed.clone());
    let derived = Derived::new("double", vec![Rc::clone(&source)], |v| Ok(v[0] * 2)).unwrap();
    let derived_ref: ValueModelRef<i32> = Rc::new(derived.clone());
    // Writing the derived value back into its own source closes a loop.
    let _loop = derived_ref.subscribe(Box::new(move |v: &i32| seed.set(*v)));

    let (_, events) = capture(|| source.set_value(2).unwrap());
    assert!(derived.is_cyclic());
    assert!(logged(&events, Level::WARN, "dependency cycle"));
}

#[test]
fn reports_prefer_catalog_text() {
    let form = FormModel::for_object(contact());
    form.set_rules(
        RuleSet::new()
            .rule("email", Constraint::required())
            .rule("age", Constraint::range(18, 120)),
    )
    .unwrap();

    let mut catalog = MessageTemplates::new();
    catalog.insert("email.required", "Enter an email address");
    let reports = ViolationReport::collect(&form.errors(), &catalog);

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].property, "email");
    assert_eq!(reports[0].message, "Enter an email address");
    assert_eq!(reports[1].code, "range");
    assert!(reports[1].message.starts_with("age "));
}
