#![forbid(unsafe_code)]

//! Property-based invariant tests for the list change protocol.
//!
//! 1. Replaying the steps of any change onto the previous contents yields the
//!    current contents, for lists and for every view kind.
//! 2. A filtered view equals the source filtered by the predicate.
//! 3. A sorted view equals a stable sort of the source.
//! 4. A content-bound list equals its source after every mutation.

use std::cell::RefCell;
use std::rc::Rc;

use ftui_collections::{
    ListChangeListener, ListSource, ObservableList, ReadOnlyListView, SortedList, bind_content,
    collect_steps,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    AddAt(usize, u8),
    Remove(usize),
    Set(usize, u8),
    Update(usize, u8),
    RemoveRange(usize, usize),
    RetainBelow(u8),
    AddAll(Vec<u8>),
    SetAll(Vec<u8>),
    Sort,
    SortDescending,
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u8>().prop_map(Op::Add),
        3 => (any::<usize>(), any::<u8>()).prop_map(|(i, v)| Op::AddAt(i, v)),
        3 => any::<usize>().prop_map(Op::Remove),
        2 => (any::<usize>(), any::<u8>()).prop_map(|(i, v)| Op::Set(i, v)),
        2 => (any::<usize>(), any::<u8>()).prop_map(|(i, v)| Op::Update(i, v)),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::RemoveRange(a, b)),
        1 => any::<u8>().prop_map(Op::RetainBelow),
        1 => proptest::collection::vec(any::<u8>(), 0..4).prop_map(Op::AddAll),
        1 => proptest::collection::vec(any::<u8>(), 0..6).prop_map(Op::SetAll),
        1 => Just(Op::Sort),
        1 => Just(Op::SortDescending),
        1 => Just(Op::Clear),
    ]
}

fn apply(list: &ObservableList<u8>, op: &Op) {
    let len = list.len();
    match op {
        Op::Add(v) => list.add(*v),
        Op::AddAt(i, v) => list.add_at(i % (len + 1), *v).unwrap(),
        Op::Remove(i) if len > 0 => {
            list.remove(i % len).unwrap();
        }
        Op::Set(i, v) if len > 0 => {
            list.set(i % len, *v).unwrap();
        }
        Op::Update(i, v) if len > 0 => {
            let v = *v;
            list.update(i % len, |slot| *slot = v).unwrap();
        }
        Op::RemoveRange(a, b) => {
            let (a, b) = (a % (len + 1), b % (len + 1));
            list.remove_range(a.min(b), a.max(b)).unwrap();
        }
        Op::RetainBelow(limit) => {
            let limit = *limit;
            list.retain(|v| *v < limit);
        }
        Op::AddAll(values) => list.add_all(values.iter().copied()),
        Op::SetAll(values) => list.set_all(values.iter().copied()),
        Op::Sort => list.sort(),
        Op::SortDescending => list.sort_by(|a, b| b.cmp(a)),
        Op::Clear => list.clear(),
        Op::Remove(_) | Op::Set(..) | Op::Update(..) => {}
    }
}

/// Watches a list source and records whether every change replays exactly.
struct ReplayCheck {
    mismatches: Rc<RefCell<Vec<String>>>,
}

impl ReplayCheck {
    fn attach(source: &impl ListSource<u8>) -> Self {
        let mismatches = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&mismatches);
        let previous = Rc::new(RefCell::new(source.to_vec()));
        source.add_list_listener(ListChangeListener::try_new(move |change| {
            let steps = collect_steps(change)?;
            let mut replayed = previous.borrow().clone();
            for step in &steps {
                if let Err(err) = step.apply(&mut replayed) {
                    sink.borrow_mut().push(format!("step {step:?} rejected: {err}"));
                }
            }
            let current = change.list().to_vec();
            if replayed != current {
                sink.borrow_mut()
                    .push(format!("replayed {replayed:?} but list is {current:?}"));
            }
            *previous.borrow_mut() = current;
            Ok(())
        }));
        Self { mismatches }
    }

    fn mismatches(&self) -> Vec<String> {
        self.mismatches.borrow().clone()
    }
}

fn initial_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..8)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op_strategy(), 1..24)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Replay
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn list_changes_replay(initial in initial_strategy(), ops in ops_strategy()) {
        let list = ObservableList::from_vec(initial);
        let check = ReplayCheck::attach(&list);
        for op in &ops {
            apply(&list, op);
        }
        prop_assert_eq!(check.mismatches(), Vec::<String>::new());
    }

    #[test]
    fn view_changes_replay(
        initial in initial_strategy(),
        ops in ops_strategy(),
        cut in any::<u8>()
    ) {
        let list = ObservableList::from_vec(initial);
        let filtered = list.filtered(move |v: &u8| *v >= cut);
        let sorted = list.sorted();
        let sorted_filtered =
            SortedList::with_comparator(&filtered, |a: &u8, b: &u8| (a % 7).cmp(&(b % 7)));
        let read_only = ReadOnlyListView::new(&sorted_filtered);

        let checks = [
            ReplayCheck::attach(&filtered),
            ReplayCheck::attach(&sorted),
            ReplayCheck::attach(&sorted_filtered),
            ReplayCheck::attach(&read_only),
        ];
        for op in &ops {
            apply(&list, op);
        }
        for check in &checks {
            prop_assert_eq!(check.mismatches(), Vec::<String>::new());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2–4. Views match their definitions
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn views_match_model(initial in initial_strategy(), ops in ops_strategy(), cut in any::<u8>()) {
        let list = ObservableList::from_vec(initial);
        let filtered = list.filtered(move |v: &u8| *v >= cut);
        let by_residue = list.sorted_by(|a: &u8, b: &u8| (a % 5).cmp(&(b % 5)));
        let mirror = ObservableList::new();
        let _binding = bind_content(&mirror, &filtered);

        for op in &ops {
            apply(&list, op);

            let source = list.to_vec();
            let expected_filtered: Vec<u8> = source.iter().copied().filter(|v| *v >= cut).collect();
            prop_assert_eq!(filtered.to_vec(), expected_filtered.clone());
            prop_assert_eq!(mirror.to_vec(), expected_filtered);

            let mut expected_sorted = source.clone();
            expected_sorted.sort_by_key(|v| v % 5);
            prop_assert_eq!(by_residue.to_vec(), expected_sorted);

            for i in 0..by_residue.len() {
                let origin = by_residue.source_index(i).unwrap();
                prop_assert_eq!(by_residue.get(i), list.get(origin));
            }
        }
    }
}
