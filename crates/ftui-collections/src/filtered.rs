#![forbid(unsafe_code)]

//! Filtered list view.
//!
//! [`FilteredList`] shows the elements of a source list that match a
//! predicate, in source order. It keeps an ascending view-index →
//! source-index mapping plus a copy of the visible elements, and translates
//! each source step into view steps:
//!
//! ```text
//! source  [alpha, beta, gamma]     predicate: len > 4
//! mapping [0,        2]
//! view    [alpha,    gamma]
//! ```
//!
//! # Invariants
//!
//! 1. `mapping` is strictly ascending and `view[i] == source[mapping[i]]`.
//! 2. A source step only touches the view entries whose source index falls
//!    in the step's range.
//! 3. One source change fires at most one view change, whose `list()` is the
//!    view.

use std::cell::RefCell;
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

const LABEL: &str = "FilteredList";

type Predicate<E> = Rc<dyn Fn(&E) -> bool>;

#[derive(Debug, Clone)]
struct FilterState<E> {
    mapping: Vec<usize>,
    items: Vec<E>,
}

impl<E> Default for FilterState<E> {
    fn default() -> Self {
        Self {
            mapping: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<E: Clone> FilterState<E> {
    fn build(source: Vec<E>, keep: &dyn Fn(&E) -> bool) -> Self {
        let mut state = Self::default();
        for (index, element) in source.into_iter().enumerate() {
            if keep(&element) {
                state.mapping.push(index);
                state.items.push(element);
            }
        }
        state
    }

    /// View position of the first entry whose source index is `>= source_index`.
    fn position(&self, source_index: usize) -> usize {
        self.mapping.partition_point(|&m| m < source_index)
    }

    fn apply(&mut self, step: &ListStep<E>, keep: &dyn Fn(&E) -> bool, out: &mut Vec<ListStep<E>>) {
        if step.was_permutated() {
            self.permute(step, out);
        } else if step.was_updated() {
            self.update(step, keep, out);
        } else {
            self.add_remove(step, keep, out);
        }
    }

    fn add_remove(
        &mut self,
        step: &ListStep<E>,
        keep: &dyn Fn(&E) -> bool,
        out: &mut Vec<ListStep<E>>,
    ) {
        let from = step.from();
        let removed_len = step.removed_elements().len();
        let added = step.added_elements();

        let start = self.position(from);
        let end = self.position(from + removed_len);
        self.mapping.drain(start..end);
        let removed: Vec<E> = self.items.drain(start..end).collect();
        for m in &mut self.mapping[start..] {
            *m = *m - removed_len + added.len();
        }

        let mut mapping = Vec::new();
        let mut items = Vec::new();
        for (k, element) in added.iter().enumerate() {
            if keep(element) {
                mapping.push(from + k);
                items.push(element.clone());
            }
        }
        self.mapping.splice(start..start, mapping);
        self.items.splice(start..start, items.iter().cloned());
        out.push(ListStep::add_remove(start, removed, items));
    }

    fn update(
        &mut self,
        step: &ListStep<E>,
        keep: &dyn Fn(&E) -> bool,
        out: &mut Vec<ListStep<E>>,
    ) {
        for (k, element) in step.added_elements().iter().enumerate() {
            let source_index = step.from() + k;
            let pos = self.position(source_index);
            let present = self.mapping.get(pos) == Some(&source_index);
            match (present, keep(element)) {
                (true, true) => {
                    self.items[pos] = element.clone();
                    out.push(ListStep::updated(pos, vec![element.clone()]));
                }
                (true, false) => {
                    self.mapping.remove(pos);
                    let old = self.items.remove(pos);
                    out.push(ListStep::removed(pos, vec![old]));
                }
                (false, true) => {
                    self.mapping.insert(pos, source_index);
                    self.items.insert(pos, element.clone());
                    out.push(ListStep::added(pos, vec![element.clone()]));
                }
                (false, false) => {}
            }
        }
    }

    fn permute(&mut self, step: &ListStep<E>, out: &mut Vec<ListStep<E>>) {
        let Some(indices) = step.permutation_indices() else {
            return;
        };
        let start = self.position(step.from());
        let end = self.position(step.to());
        if end <= start {
            return;
        }
        let mut moved: Vec<(usize, usize)> = (start..end)
            .map(|j| (indices[self.mapping[j] - step.from()], j))
            .collect();
        moved.sort_unstable();

        let old_items = self.items[start..end].to_vec();
        let mut permutation = vec![0; end - start];
        for (rank, &(source_index, old)) in moved.iter().enumerate() {
            permutation[old - start] = start + rank;
            self.mapping[start + rank] = source_index;
            self.items[start + rank] = old_items[old - start].clone();
        }
        out.push(ListStep::permutation(start, permutation));
    }
}

pub(crate) struct FilteredInner<E> {
    source: Box<dyn ListSource<E>>,
    predicate: RefCell<Predicate<E>>,
    state: RefCell<FilterState<E>>,
    notifier: ListNotifier<E>,
    listener: ListChangeListener<E>,
}

impl<E> Drop for FilteredInner<E> {
    fn drop(&mut self) {
        self.source.remove_list_listener(&self.listener);
    }
}

impl<E: Clone + 'static> FilteredInner<E> {
    fn on_source_change(self: &Rc<Self>, change: &mut dyn ListChange<E>) -> ListenerResult {
        let steps = collect_steps(change)?;
        let keep = Rc::clone(&*self.predicate.borrow());
        let mut state = self.state.borrow().clone();
        let mut out = Vec::new();
        for step in &steps {
            state.apply(step, &*keep, &mut out);
        }
        *self.state.borrow_mut() = state;

        let view = FilteredList {
            inner: Rc::clone(self),
        };
        let report = self.notifier.fire_steps(&view, &view, LABEL, out);
        storage::propagate(report, "filtered view propagation failed")
    }
}

/// Live view of the source elements that match a predicate.
pub struct FilteredList<E> {
    inner: Rc<FilteredInner<E>>,
}

impl<E> Clone for FilteredList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone + 'static> FilteredList<E> {
    /// Filter `source` by `predicate`.
    pub fn new<S>(source: &S, predicate: impl Fn(&E) -> bool + 'static) -> Self
    where
        S: ListSource<E> + Clone + 'static,
    {
        Self::with_config(source, predicate, ObservableConfig::default())
    }

    /// Filter `source` by `predicate` with explicit configuration.
    pub fn with_config<S>(
        source: &S,
        predicate: impl Fn(&E) -> bool + 'static,
        config: ObservableConfig,
    ) -> Self
    where
        S: ListSource<E> + Clone + 'static,
    {
        let predicate: Predicate<E> = Rc::new(predicate);
        let state = FilterState::build(source.to_vec(), &*predicate);
        let inner = Rc::new_cyclic(|weak: &Weak<FilteredInner<E>>| FilteredInner {
            source: Box::new(source.clone()),
            predicate: RefCell::new(predicate),
            state: RefCell::new(state),
            notifier: ListNotifier::new(config),
            listener: ListChangeListener::from_weak(weak.clone(), |inner, change| {
                inner.on_source_change(change)
            }),
        });
        source.add_list_listener(inner.listener.clone());
        Self { inner }
    }

    /// Replace the predicate and refilter, firing one change.
    pub fn set_predicate(&self, predicate: impl Fn(&E) -> bool + 'static) {
        let predicate: Predicate<E> = Rc::new(predicate);
        let next = FilterState::build(self.inner.source.to_vec(), &*predicate);
        *self.inner.predicate.borrow_mut() = predicate;
        let previous = std::mem::replace(&mut *self.inner.state.borrow_mut(), next.clone());
        if previous.mapping == next.mapping {
            return;
        }
        let step = ListStep::add_remove(0, previous.items, next.items);
        self.inner.notifier.fire_steps(self, self, LABEL, vec![step]);
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

    /// View index of the source element at `source_index`, if it is visible.
    #[must_use]
    pub fn view_index(&self, source_index: usize) -> Option<usize> {
        self.inner.state.borrow().mapping.binary_search(&source_index).ok()
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

impl<E: Clone + 'static> Observable for FilteredList<E> {
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

impl<E: Clone + 'static> ListSource<E> for FilteredList<E> {
    fn len(&self) -> usize {
        FilteredList::len(self)
    }

    fn get(&self, index: usize) -> Option<E> {
        FilteredList::get(self, index)
    }

    fn to_vec(&self) -> Vec<E> {
        FilteredList::to_vec(self)
    }

    fn add_list_listener(&self, listener: ListChangeListener<E>) {
        FilteredList::add_list_listener(self, listener);
    }

    fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        FilteredList::remove_list_listener(self, listener);
    }
}

impl<E: fmt::Debug> fmt::Debug for FilteredList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FilteredList");
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
    use std::cell::Cell;

    fn record<E: Clone + 'static>(view: &FilteredList<E>) -> Rc<RefCell<Vec<Vec<ListStep<E>>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        view.add_list_listener(ListChangeListener::try_new(move |change| {
            sink.borrow_mut().push(collect_steps(change)?);
            Ok(())
        }));
        log
    }

    #[test]
    fn filters_and_follows_adds() {
        let source = ObservableList::from_vec(vec!["alpha", "beta"]);
        let view = source.filtered(|s: &&str| s.len() > 4);
        assert_eq!(view.to_vec(), vec!["alpha"]);

        let log = record(&view);
        source.add("gamma");
        assert_eq!(view.to_vec(), vec!["alpha", "gamma"]);
        let step = &log.borrow()[0][0];
        assert!(step.was_added());
        assert_eq!((step.from(), step.to()), (1, 2));
    }

    #[test]
    fn predicate_reads_settled_view_during_source_change() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let slot: Rc<RefCell<Option<FilteredList<i32>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (reader, sink) = (Rc::clone(&slot), Rc::clone(&seen));
        let view = source.filtered(move |_: &i32| {
            if let Some(view) = reader.borrow().as_ref() {
                sink.borrow_mut().push(view.to_vec());
            }
            true
        });
        *slot.borrow_mut() = Some(view.clone());

        source.add(4);
        assert_eq!(*seen.borrow(), vec![vec![1, 2, 3]]);
        assert_eq!(view.to_vec(), vec![1, 2, 3, 4]);
        slot.borrow_mut().take();
    }

    #[test]
    fn invisible_changes_fire_nothing() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let view = source.filtered(|n: &i32| n % 2 == 1);
        let log = record(&view);
        source.add(4);
        source.remove(1).unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(view.to_vec(), vec![1, 3]);
        assert_eq!(view.source_index(1), Some(1));
    }

    #[test]
    fn removal_translates_to_view_coordinates() {
        let source = ObservableList::from_vec(vec![1, 2, 3, 5, 7]);
        let view = source.filtered(|n: &i32| n % 2 == 1);
        let log = record(&view);
        source.remove_range(1, 4).unwrap();
        let step = &log.borrow()[0][0];
        assert_eq!(step.from(), 1);
        assert_eq!(step.removed_elements(), [3, 5]);
        assert_eq!(view.to_vec(), vec![1, 7]);
    }

    #[test]
    fn update_moves_element_in_or_out() {
        let source = ObservableList::from_vec(vec![1, 2, 3]);
        let view = source.filtered(|n: &i32| n % 2 == 1);
        let log = record(&view);
        source.update(1, |n| *n = 9).unwrap();
        assert_eq!(view.to_vec(), vec![1, 9, 3]);
        source.update(0, |n| *n = 4).unwrap();
        assert_eq!(view.to_vec(), vec![9, 3]);
        source.update(1, |n| *n = 11).unwrap();
        let changes = log.borrow();
        assert!(changes[0][0].was_added());
        assert!(changes[1][0].was_removed());
        assert!(changes[2][0].was_updated());
    }

    #[test]
    fn permutation_reorders_view() {
        let source = ObservableList::from_vec(vec![3, 2, 1]);
        let view = source.filtered(|n: &i32| *n != 2);
        let log = record(&view);
        source.sort();
        assert_eq!(view.to_vec(), vec![1, 3]);
        let step = &log.borrow()[0][0];
        assert_eq!(step.permutation_indices(), Some(&[1, 0][..]));
    }

    #[test]
    fn set_predicate_fires_once() {
        let source = ObservableList::from_vec(vec![1, 2, 3, 4]);
        let view = source.filtered(|n: &i32| *n > 2);
        let log = record(&view);
        view.set_predicate(|n: &i32| n % 2 == 0);
        assert_eq!(view.to_vec(), vec![2, 4]);
        view.set_predicate(|n: &i32| n % 2 == 0);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn chained_views() {
        let source = ObservableList::from_vec(vec![1, 2, 3, 4, 5, 6]);
        let even = source.filtered(|n: &i32| n % 2 == 0);
        let big = FilteredList::new(&even, |n: &i32| *n > 2);
        assert_eq!(big.to_vec(), vec![4, 6]);
        source.add(8);
        assert_eq!(big.to_vec(), vec![4, 6, 8]);
    }

    #[test]
    fn drop_detaches_from_source() {
        let source = ObservableList::from_vec(vec![1]);
        {
            let _view = source.filtered(|_: &i32| true);
            assert_eq!(source.listener_count(), 1);
        }
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn invalidation_listeners_fire_on_view_change() {
        let source = ObservableList::from_vec(vec![1]);
        let view = source.filtered(|n: &i32| *n > 0);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        view.add_listener(InvalidationListener::new(move |_| h.set(h.get() + 1)));
        source.add(-1);
        source.add(2);
        assert_eq!(hits.get(), 1);
    }
}
