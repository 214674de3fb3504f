#![forbid(unsafe_code)]

//! End-to-end behavior of properties, bindings, and bidirectional sync.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ftui_reactive::bindings::{self, when};
use ftui_reactive::{
    BidirectionalBinding, Binding, BindingError, BindingScope, ChangeListener,
    InvalidationListener, ListenerError, ListenerKind, NumberExpressionBase, Observable,
    ObservableValue, Property, PropertyError, StorageKind, StringExpression, dependency,
};

fn change_log<T: Clone + 'static>() -> (Rc<RefCell<Vec<(T, T)>>>, ChangeListener<T>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let listener = ChangeListener::new(move |old: &T, new: &T| {
        sink.borrow_mut().push((old.clone(), new.clone()));
    });
    (log, listener)
}

#[test]
fn bidirectional_bind_copies_second_into_first() {
    let p1 = Property::new(1.5_f64);
    let p2 = Property::new(3.25_f64);
    let _binding = BidirectionalBinding::bind(&p1, &p2).unwrap();
    assert_eq!(p1.get(), 3.25);
    assert_eq!(p2.get(), 3.25);

    p1.set(2.0).unwrap();
    assert_eq!(p2.get(), 2.0);
    p2.set(7.5).unwrap();
    assert_eq!(p1.get(), 7.5);
}

#[test]
fn bidirectional_unbind_stops_sync_both_ways() {
    let p1 = Property::new(0_i32);
    let p2 = Property::new(1_i32);
    bindings::bind_bidirectional(&p1, &p2).unwrap();
    bindings::unbind_bidirectional(&p2, &p1).unwrap();

    p1.set(10).unwrap();
    assert_eq!(p2.get(), 1);
    p2.set(20).unwrap();
    assert_eq!(p1.get(), 10);
    assert_eq!(p1.listener_count(), 0);
    assert_eq!(p2.listener_count(), 0);
}

#[test]
fn bidirectional_rejects_missing_and_identical_endpoints() {
    let p = Property::new(0_i32);
    assert!(matches!(
        BidirectionalBinding::bind(None, &p),
        Err(BindingError::MissingEndpoint)
    ));
    assert!(matches!(
        BidirectionalBinding::bind(&p, &p),
        Err(BindingError::SelfBinding)
    ));
    assert_eq!(p.listener_count(), 0);
}

#[test]
fn bidirectional_chain_converges() {
    let a = Property::new(1_i32);
    let b = Property::new(2_i32);
    let c = Property::new(3_i32);
    let _ab = BidirectionalBinding::bind(&a, &b).unwrap();
    let _bc = BidirectionalBinding::bind(&b, &c).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (3, 3, 3));

    a.set(9).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (9, 9, 9));
    c.set(4).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (4, 4, 4));
}

#[test]
fn converted_binding_keeps_text_and_number_in_sync() {
    let number = Property::new(0_i32);
    let text = Property::new(String::from("12"));
    let _binding = BidirectionalBinding::bind_converted(
        &number,
        &text,
        |s: &String| s.trim().parse::<i32>().map_err(|e| ListenerError::new(e.to_string())),
        |n: &i32| Ok(n.to_string()),
    )
    .unwrap();
    assert_eq!(number.get(), 12);

    number.set(40).unwrap();
    assert_eq!(text.get(), "40");

    text.set("not a number".into()).unwrap();
    assert_eq!(number.get(), 40);
    let faults = text.take_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, ListenerKind::Change);
}

#[test]
fn binding_chain_recomputes_lazily() {
    let base = Property::new(2_i32);
    let evaluations = Rc::new(Cell::new(0));
    let squared = {
        let deps = [dependency(&base)];
        let base = base.clone();
        let evaluations = Rc::clone(&evaluations);
        Binding::new(
            move || {
                evaluations.set(evaluations.get() + 1);
                base.get() * base.get()
            },
            deps,
        )
    };
    let label = squared.add(1_i32);
    assert_eq!(evaluations.get(), 0);

    assert_eq!(label.get(), 5);
    assert_eq!(evaluations.get(), 1);
    base.set(3).unwrap();
    base.set(4).unwrap();
    assert_eq!(evaluations.get(), 1);
    assert_eq!(label.get(), 17);
    assert_eq!(evaluations.get(), 2);
}

#[test]
fn invalidation_fires_once_until_revalidated() {
    let a = Property::new(1_i32);
    let sum = bindings::add(&a, 10_i32);
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    sum.add_listener(InvalidationListener::new(move |_| h.set(h.get() + 1)));

    let _ = sum.get();
    a.set(2).unwrap();
    a.set(3).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(sum.get(), 13);
    a.set(4).unwrap();
    assert_eq!(hits.get(), 2);
}

#[test]
fn change_listener_on_binding_sees_old_and_new() {
    let a = Property::new(1_i32);
    let doubled = bindings::multiply(&a, 2_i32);
    let (log, listener) = change_log::<i32>();
    doubled.add_change_listener(listener);

    a.set(5).unwrap();
    a.set(5).unwrap();
    a.set(6).unwrap();
    assert_eq!(*log.borrow(), vec![(2, 10), (10, 12)]);
}

#[test]
fn bound_property_follows_source_and_rejects_set() {
    let source = Property::named("source", 1_i32);
    let target = Property::named("target", 0_i32);
    target.bind(&source).unwrap();
    assert_eq!(target.get(), 1);
    assert!(matches!(target.set(5), Err(PropertyError::Bound { .. })));

    source.set(8).unwrap();
    assert_eq!(target.get(), 8);
    target.unbind();
    source.set(9).unwrap();
    assert_eq!(target.get(), 8);
    assert!(target.set(5).is_ok());
}

#[test]
fn conditional_and_string_bindings_compose() {
    let count = Property::new(1_i32);
    let noun = when(count.greater_than(1_i32))
        .then("items".to_string())
        .otherwise("item".to_string());
    let summary = bindings::concat([(&count).into(), " ".into(), (&noun).into()]);
    assert_eq!(summary.get(), "1 item");
    count.set(3).unwrap();
    assert_eq!(summary.get(), "3 items");
    assert_eq!(summary.length().get(), 7);
}

#[test]
fn faulting_listener_does_not_block_others() {
    let p = Property::named("volume", 0_i32);
    let seen = Rc::new(Cell::new(0));
    p.add_listener(InvalidationListener::try_new(|_| Err("boom".into())));
    let s = Rc::clone(&seen);
    p.add_listener(InvalidationListener::new(move |_| s.set(s.get() + 1)));

    p.set(1).unwrap();
    assert_eq!(seen.get(), 1);
    let faults = p.take_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].source, "volume");
    assert_eq!(faults[0].error.message(), "boom");
    assert!(p.take_faults().is_empty());
}

#[test]
fn listener_may_remove_itself_during_dispatch() {
    let p = Property::new(0_i32);
    let hits = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<InvalidationListener>>> = Rc::new(RefCell::new(None));
    let listener = {
        let hits = Rc::clone(&hits);
        let slot = Rc::clone(&slot);
        let p = p.clone();
        InvalidationListener::new(move |_| {
            hits.set(hits.get() + 1);
            if let Some(me) = slot.borrow_mut().take() {
                p.remove_listener(&me);
            }
        })
    };
    *slot.borrow_mut() = Some(listener.clone());
    p.add_listener(listener);
    p.add_listener(InvalidationListener::new(|_| {}));
    assert_eq!(p.storage_kind(), StorageKind::Many);

    p.set(1).unwrap();
    p.set(2).unwrap();
    assert_eq!(hits.get(), 1);
    assert_eq!(p.storage_kind(), StorageKind::One);
}

#[test]
fn dropping_binding_detaches_from_sources() {
    let a = Property::new(1_i32);
    {
        let sum = bindings::add(&a, 1_i32);
        assert_eq!(sum.get(), 2);
        assert_eq!(a.listener_count(), 1);
    }
    assert_eq!(a.listener_count(), 0);
}

#[test]
fn scope_releases_mixed_wiring() {
    let model = Property::new(String::from("title"));
    let view = Property::new(String::new());
    let mirror = Property::new(String::new());
    {
        let mut scope = BindingScope::new();
        scope.bind(&view, &model).unwrap();
        scope.bind_bidirectional(&mirror, &model).unwrap();
        scope.on_change(&model, ChangeListener::new(|_: &String, _: &String| {}));
        assert_eq!(view.get(), "title");
        assert_eq!(mirror.get(), "title");
    }
    assert!(!view.is_bound());
    assert_eq!(model.listener_count(), 0);
    assert_eq!(mirror.listener_count(), 0);
}
