#![forbid(unsafe_code)]

//! Sorted list view.
//!
//! [`SortedList`] presents a source list ordered by a comparator, breaking
//! ties by source index so equal elements keep their source order.
//!
//! Source steps are translated individually: removals and insertions become
//! view removals and insertions at the sorted position; an update that moves
//! an element becomes a permutation followed by an update; a source
//! permutation only reorders ties and is reported as a view permutation when
//! it does.
//!
//! # Invariants
//!
//! 1. The view is sorted by `(comparator, source index)`.
//! 2. `view[i] == source[mapping[i]]`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use ftui_reactive::{
    InvalidationListener, ListenerFault, ListenerResult, Observable, ObservableConfig,
    ObservableId, storage,
};

use crate::change::{ListChange, ListStep, collect_steps};
use crate::listener::ListChangeListener;
use crate::notifier::ListNotifier;
use crate::source::ListSource;

const LABEL: &str = "SortedList";

type Comparator<E> = Rc<dyn Fn(&E, &E) -> Ordering>;

#[derive(Debug, Clone)]
struct SortState<E> {
    mapping: Vec<usize>,
    items: Vec<E>,
}

impl<E> Default for SortState<E> {
    fn default() -> Self {
        Self {
            mapping: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<E: Clone> SortState<E> {
    fn build(source: Vec<E>, compare: &dyn Fn(&E, &E) -> Ordering) -> Self {
        let mut state = Self {
            mapping: (0..source.len()).collect(),
            items: source,
        };
        state.resort(compare);
        state
    }

    /// Sorted insertion point for `element` coming from `source_index`.
    fn insertion_point(
        &self,
        element: &E,
        source_index: usize,
        compare: &dyn Fn(&E, &E) -> Ordering,
    ) -> usize {
        let (items, mapping) = (&self.items, &self.mapping);
        let mut lo = 0;
        let mut hi = items.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let before = match compare(&items[mid], element) {
                Ordering::Less => true,
                Ordering::Equal => mapping[mid] < source_index,
                Ordering::Greater => false,
            };
            if before {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Re-sort everything; returns the permutation step if the order changed.
    fn resort(&mut self, compare: &dyn Fn(&E, &E) -> Ordering) -> Option<ListStep<E>> {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by(|&a, &b| {
            compare(&self.items[a], &self.items[b]).then(self.mapping[a].cmp(&self.mapping[b]))
        });
        if order.iter().enumerate().all(|(new, &old)| new == old) {
            return None;
        }
        let mut permutation = vec![0; order.len()];
        for (new, &old) in order.iter().enumerate() {
            permutation[old] = new;
        }
        self.mapping = order.iter().map(|&old| self.mapping[old]).collect();
        self.items = order.iter().map(|&old| self.items[old].clone()).collect();
        Some(ListStep::permutation(0, permutation))
    }

    fn apply(
        &mut self,
        step: &ListStep<E>,
        compare: &dyn Fn(&E, &E) -> Ordering,
        out: &mut Vec<ListStep<E>>,
    ) {
        if let Some(indices) = step.permutation_indices() {
            for m in &mut self.mapping {
                if (step.from()..step.to()).contains(&*m) {
                    *m = indices[*m - step.from()];
                }
            }
            out.extend(self.resort(compare));
        } else if step.was_updated() {
            self.update(step, compare, out);
        } else {
            self.add_remove(step, compare, out);
        }
    }

    fn add_remove(
        &mut self,
        step: &ListStep<E>,
        compare: &dyn Fn(&E, &E) -> Ordering,
        out: &mut Vec<ListStep<E>>,
    ) {
        let from = step.from();
        let removed_len = step.removed_elements().len();
        let added = step.added_elements();
        let gone = from..from + removed_len;

        let mut doomed: Vec<usize> = (0..self.mapping.len())
            .filter(|&j| gone.contains(&self.mapping[j]))
            .collect();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for j in doomed {
            self.mapping.remove(j);
            let old = self.items.remove(j);
            out.push(ListStep::removed(j, vec![old]));
        }
        for m in &mut self.mapping {
            if *m >= from {
                *m = *m - removed_len + added.len();
            }
        }
        for (k, element) in added.iter().enumerate() {
            let source_index = from + k;
            let pos = self.insertion_point(element, source_index, compare);
            self.mapping.insert(pos, source_index);
            self.items.insert(pos, element.clone());
            out.push(ListStep::added(pos, vec![element.clone()]));
        }
    }

    fn update(
        &mut self,
        step: &ListStep<E>,
        compare: &dyn Fn(&E, &E) -> Ordering,
        out: &mut Vec<ListStep<E>>,
    ) {
        for (k, element) in step.added_elements().iter().enumerate() {
            let source_index = step.from() + k;
            let Some(old_pos) = self.mapping.iter().position(|&m| m == source_index) else {
                continue;
            };
            self.mapping.remove(old_pos);
            self.items.remove(old_pos);
            let new_pos = self.insertion_point(element, source_index, compare);
            self.mapping.insert(new_pos, source_index);
            self.items.insert(new_pos, element.clone());

            if new_pos != old_pos {
                out.push(move_permutation(old_pos, new_pos));
            }
            out.push(ListStep::updated(new_pos, vec![element.clone()]));
        }
    }
}

/// Permutation moving one element from `old` to `new`, shifting the rest.
fn move_permutation<E>(old: usize, new: usize) -> ListStep<E> {
    let (lo, hi) = (old.min(new), old.max(new));
    let permutation = (lo..=hi)
        .map(|i| {
            if i == old {
                new
            } else if old < new {
                i - 1
            } else {
                i + 1
            }
        })
        .collect();
    ListStep::permutation(lo, permutation)
}

pub(crate) struct SortedInner<E> {
    source: Box<dyn ListSource<E>>,
    comparator: RefCell<Comparator<E>>,
    state: RefCell<SortState<E>>,
    notifier: ListNotifier<E>,
    listener: ListChangeListener<E>,
}

impl<E> Drop for SortedInner<E> {
    fn drop(&mut self) {
        self.source.remove_list_listener(&self.listener);
    }
}

impl<E: Clone + 'static> SortedInner<E> {
    fn on_source_change(self: &Rc<Self>, change: &mut dyn ListChange<E>) -> ListenerResult {
        let steps = collect_steps(change)?;
        let compare = Rc::clone(&*self.comparator.borrow());
        let mut state = self.state.borrow().clone();
        let mut out = Vec::new();
        for step in &steps {
            state.apply(step, &*compare, &mut out);
        }
        *self.state.borrow_mut() = state;

        let view = SortedList {
            inner: Rc::clone(self),
        };
        let report = self.notifier.fire_steps(&view, &view, LABEL, out);
        storage::propagate(report, "sorted view propagation failed")
    }
}

/// Live view of a source list in sorted order.
pub struct SortedList<E> {
    inner: Rc<SortedInner<E>>,
}

impl<E> Clone for SortedList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone + 'static> SortedList<E> {
    /// Sort `source` in natural order.
    pub fn new<S>(source: &S) -> Self
    where
        S: ListSource<E> + Clone + 'static,
        E: Ord,
    {
        Self::with_comparator(source, Ord::cmp)
    }

    /// Sort `source` by `compare`.
    pub fn with_comparator<S>(source: &S, compare: impl Fn(&E, &E) -> Ordering + 'static) -> Self
    where
        S: ListSource<E> + Clone + 'static,
    {
        Self::with_config(source, compare, ObservableConfig::default())
    }

    /// Sort `source` by `compare` with explicit configuration.
    pub fn with_config<S>(
        source: &S,
        compare: impl Fn(&E, &E) -> Ordering + 'static,
        config: ObservableConfig,
    ) -> Self
    where
        S: ListSource<E> + Clone + 'static,
    {
        let comparator: Comparator<E> = Rc::new(compare);
        let state = SortState::build(source.to_vec(), &*comparator);
        let inner = Rc::new_cyclic(|weak: &Weak<SortedInner<E>>| SortedInner {
            source: Box::new(source.clone()),
            comparator: RefCell::new(comparator),
            state: RefCell::new(state),
            notifier: ListNotifier::new(config),
            listener: ListChangeListener::from_weak(weak.clone(), |inner, change| {
                inner.on_source_change(change)
            }),
        });
        source.add_list_listener(inner.listener.clone());
        Self { inner }
    }

    /// Replace the comparator and re-sort, firing one permutation if the
    /// order changed.
    pub fn set_comparator(&self, compare: impl Fn(&E, &E) -> Ordering + 'static) {
        let comparator: Comparator<E> = Rc::new(compare);
        let mut state = self.inner.state.borrow().clone();
        let step = state.resort(&*comparator);
        *self.inner.state.borrow_mut() = state;
        *self.inner.comparator.borrow_mut() = comparator;
        if let Some(step) = step {
            self.inner.notifier.fire_steps(self, self, LABEL, vec![step]);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.state.borrow().items.get(index).cloned()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.inner.state.borrow().items.clone()
    }

    /// Source index of the element at `view_index`.
    #[must_use]
    pub fn source_index(&self, view_index: usize) -> Option<usize> {
        self.inner.state.borrow().mapping.get(view_index).copied()
    }

    pub fn add_list_listener(&self, listener: ListChangeListener<E>) {
        self.inner.notifier.add_list_listener(listener);
    }

    pub fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        self.inner.notifier.remove_list_listener(listener);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }
}

impl<E: Clone + 'static> Observable for SortedList<E> {
    fn add_listener(&self, listener: InvalidationListener) {
        self.inner.notifier.add_listener(listener);
    }

    fn remove_listener(&self, listener: &InvalidationListener) {
        self.inner.notifier.remove_listener(listener);
    }

    fn observable_id(&self) -> ObservableId {
        ObservableId::of(&self.inner)
    }

    fn take_faults(&self) -> Vec<ListenerFault> {
        self.inner.notifier.take_faults()
    }
}

impl<E: Clone + 'static> ListSource<E> for SortedList<E> {
    fn len(&self) -> usize {
        SortedList::len(self)
    }

    fn get(&self, index: usize) -> Option<E> {
        SortedList::get(self, index)
    }

    fn to_vec(&self) -> Vec<E> {
        SortedList::to_vec(self)
    }

    fn add_list_listener(&self, listener: ListChangeListener<E>) {
        SortedList::add_list_listener(self, listener);
    }

    fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        SortedList::remove_list_listener(self, listener);
    }
}

impl<E: fmt::Debug> fmt::Debug for SortedList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SortedList");
        match self.inner.state.try_borrow() {
            Ok(state) => s.field("items", &state.items).field("mapping", &state.mapping),
            Err(_) => s.field("items", &"<borrowed>"),
        };
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ObservableList;

    fn record<E: Clone + 'static>(view: &SortedList<E>) -> Rc<RefCell<Vec<Vec<ListStep<E>>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        view.add_list_listener(ListChangeListener::try_new(move |change| {
            sink.borrow_mut().push(collect_steps(change)?);
            Ok(())
        }));
        log
    }

    #[test]
    fn sorts_and_inserts_in_place() {
        let source = ObservableList::from_vec(vec!["gamma", "alpha"]);
        let view = source.sorted();
        assert_eq!(view.to_vec(), vec!["alpha", "gamma"]);

        let log = record(&view);
        source.add("beta");
        assert_eq!(view.to_vec(), vec!["alpha", "beta", "gamma"]);
        let step = &log.borrow()[0][0];
        assert!(step.was_added());
        assert_eq!(step.from(), 1);
        assert_eq!(view.source_index(1), Some(2));
    }

    #[test]
    fn ties_keep_source_order() {
        let source = ObservableList::from_vec(vec![(1, 'a'), (0, 'b'), (1, 'c')]);
        let view = source.sorted_by(|x: &(i32, char), y: &(i32, char)| x.0.cmp(&y.0));
        assert_eq!(view.to_vec(), vec![(0, 'b'), (1, 'a'), (1, 'c')]);
        source.add_at(0, (1, 'z')).unwrap();
        assert_eq!(view.to_vec(), vec![(0, 'b'), (1, 'z'), (1, 'a'), (1, 'c')]);
    }

    #[test]
    fn removal_and_replacement() {
        let source = ObservableList::from_vec(vec![5, 1, 3]);
        let view = source.sorted();
        let log = record(&view);
        source.remove(0).unwrap();
        assert_eq!(view.to_vec(), vec![1, 3]);
        source.set(0, 4).unwrap();
        assert_eq!(view.to_vec(), vec![3, 4]);
        let changes = log.borrow();
        assert_eq!(changes[0][0].removed_elements(), [5]);
        assert_eq!(changes[0][0].from(), 2);
    }

    #[test]
    fn update_that_reorders_is_a_permutation() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let view = source.sorted();
        let log = record(&view);
        source.update(0, |n| *n = 10).unwrap();
        assert_eq!(view.to_vec(), vec![2, 3, 10]);
        {
            let steps = &log.borrow()[0];
            assert!(steps[0].was_permutated());
            assert_eq!(steps[0].permutation_indices(), Some(&[2, 0, 1][..]));
            assert!(steps[1].was_updated());
            assert_eq!(steps[1].from(), 2);
        }

        source.update(1, |n| *n = 2).unwrap();
        let steps = &log.borrow()[1];
        assert_eq!(steps.len(), 1);
        assert!(steps[0].was_updated());
    }

    /// Comparator that records the view length before comparing.
    fn len_reading_comparator(
        slot: &Rc<RefCell<Option<SortedList<i32>>>>,
        seen: &Rc<RefCell<Vec<usize>>>,
        reverse: bool,
    ) -> impl Fn(&i32, &i32) -> Ordering + 'static {
        let (reader, sink) = (Rc::clone(slot), Rc::clone(seen));
        move |a: &i32, b: &i32| {
            if let Some(view) = reader.borrow().as_ref() {
                sink.borrow_mut().push(view.len());
            }
            if reverse { b.cmp(a) } else { a.cmp(b) }
        }
    }

    #[test]
    fn comparator_reads_settled_view_during_source_change() {
        let source = ObservableList::from_vec(vec![1, 3]);
        let slot: Rc<RefCell<Option<SortedList<i32>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let view = source.sorted_by(len_reading_comparator(&slot, &seen, false));
        *slot.borrow_mut() = Some(view.clone());

        source.add(2);
        assert_eq!(view.to_vec(), vec![1, 2, 3]);
        assert!(!seen.borrow().is_empty());
        assert!(seen.borrow().iter().all(|&len| len == 2));
        slot.borrow_mut().take();
    }

    #[test]
    fn replacement_comparator_reads_settled_view() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let slot: Rc<RefCell<Option<SortedList<i32>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let view = source.sorted();
        *slot.borrow_mut() = Some(view.clone());

        view.set_comparator(len_reading_comparator(&slot, &seen, true));
        assert_eq!(view.to_vec(), vec![3, 2, 1]);
        assert!(!seen.borrow().is_empty());
        assert!(seen.borrow().iter().all(|&len| len == 3));
        slot.borrow_mut().take();
    }

    #[test]
    fn set_comparator_permutes() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let view = source.sorted();
        let log = record(&view);
        view.set_comparator(|a: &i32, b: &i32| b.cmp(a));
        assert_eq!(view.to_vec(), vec![3, 2, 1]);
        view.set_comparator(|a: &i32, b: &i32| b.cmp(a));
        assert_eq!(log.borrow().len(), 1);
        assert!(log.borrow()[0][0].was_permutated());
    }

    #[test]
    fn source_permutation_of_distinct_values_is_silent() {
        let source = ObservableList::from_vec(vec![3, 1, 2]);
        let view = source.sorted();
        let log = record(&view);
        source.sort();
        assert_eq!(view.to_vec(), vec![1, 2, 3]);
        assert!(log.borrow().is_empty());
        assert_eq!(view.source_index(0), Some(0));
    }

    #[test]
    fn sorted_over_filtered() {
        let source = ObservableList::from_vec(vec![4, 9, 2, 7]);
        let odd = source.filtered(|n: &i32| n % 2 == 1);
        let view = SortedList::new(&odd);
        assert_eq!(view.to_vec(), vec![7, 9]);
        source.add(1);
        assert_eq!(view.to_vec(), vec![1, 7, 9]);
    }

    #[test]
    fn move_permutation_shapes() {
        let up: ListStep<u8> = move_permutation(0, 2);
        assert_eq!(up.permutation_indices(), Some(&[2, 0, 1][..]));
        let down: ListStep<u8> = move_permutation(3, 1);
        assert_eq!(down.from(), 1);
        assert_eq!(down.permutation_indices(), Some(&[2, 3, 1][..]));
    }
}
