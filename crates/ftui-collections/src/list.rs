#![forbid(unsafe_code)]

//! Observable list.
//!
//! [`ObservableList<E>`] is a shared `Vec<E>` that reports every mutation as
//! one [`ListChange`](crate::ListChange). Batched mutators (`add_all`,
//! `retain`, `sort`, ...) invoke each listener once, with as many steps as
//! the mutation needs.
//!
//! # Invariants
//!
//! 1. One API call fires at most one change; a call that changes nothing
//!    fires nothing.
//! 2. Steps use sequential coordinates (see [`change`](crate::change)).
//! 3. Invalidation listeners fire on every mutation that fires a change,
//!    before list listeners.
//! 4. No borrow of the contents is held while user code runs: predicates and
//!    comparators work on a copy, listeners read the list freely.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Index past the end | `add_at`, `set`, `remove`, `update` | `ListError::IndexOutOfBounds`, list unchanged |
//! | Bad range | `remove_range` | `ListError::InvalidRange`, list unchanged |
//! | Listener returns `Err` | Rejected change | Fault logged and retained, other listeners still run |

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use ftui_reactive::{
    Dispatch, InvalidationListener, ListenerFault, Observable, ObservableConfig, ObservableId,
    StorageKind,
};

use crate::change::ListStep;
use crate::error::{ListError, check_index, check_position, check_range};
use crate::filtered::FilteredList;
use crate::listener::ListChangeListener;
use crate::notifier::ListNotifier;
use crate::read_only::ReadOnlyListView;
use crate::sorted::SortedList;
use crate::source::ListSource;

const LABEL: &str = "ObservableList";

pub(crate) struct ListInner<E> {
    items: RefCell<Vec<E>>,
    notifier: ListNotifier<E>,
}

/// A mutable list that notifies listeners of every change.
pub struct ObservableList<E> {
    pub(crate) inner: Rc<ListInner<E>>,
}

impl<E> Clone for ObservableList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone + 'static> Default for ObservableList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + 'static> FromIterator<E> for ObservableList<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<E: Clone + 'static> ObservableList<E> {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// A list holding `items`.
    #[must_use]
    pub fn from_vec(items: Vec<E>) -> Self {
        Self::with_config(items, ObservableConfig::default())
    }

    /// A list holding `items` with explicit configuration.
    #[must_use]
    pub fn with_config(items: Vec<E>, config: ObservableConfig) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                notifier: ListNotifier::new(config),
            }),
        }
    }

    // -- reads --------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Copy of the element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Copy of all elements.
    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.inner.items.borrow().clone()
    }

    /// Run `f` over the contents without copying them.
    ///
    /// `f` must not mutate this list.
    pub fn with_items<R>(&self, f: impl FnOnce(&[E]) -> R) -> R {
        f(&self.inner.items.borrow())
    }

    #[must_use]
    pub fn contains(&self, element: &E) -> bool
    where
        E: PartialEq,
    {
        self.inner.items.borrow().contains(element)
    }

    /// Index of the first element equal to `element`.
    #[must_use]
    pub fn index_of(&self, element: &E) -> Option<usize>
    where
        E: PartialEq,
    {
        self.inner.items.borrow().iter().position(|e| e == element)
    }

    // -- single-element mutation ------------------------------------------

    /// Append `element`.
    pub fn add(&self, element: E) {
        let from = {
            let mut items = self.inner.items.borrow_mut();
            items.push(element.clone());
            items.len() - 1
        };
        self.commit(vec![ListStep::added(from, vec![element])]);
    }

    /// Insert `element` at `index`.
    ///
    /// # Errors
    ///
    /// [`ListError::IndexOutOfBounds`] if `index > len`.
    pub fn add_at(&self, index: usize, element: E) -> Result<(), ListError> {
        {
            let mut items = self.inner.items.borrow_mut();
            check_position(index, items.len())?;
            items.insert(index, element.clone());
        }
        self.commit(vec![ListStep::added(index, vec![element])]);
        Ok(())
    }

    /// Replace the element at `index`, returning the old one.
    ///
    /// # Errors
    ///
    /// [`ListError::IndexOutOfBounds`] if `index >= len`.
    pub fn set(&self, index: usize, element: E) -> Result<E, ListError> {
        let old = {
            let mut items = self.inner.items.borrow_mut();
            check_index(index, items.len())?;
            std::mem::replace(&mut items[index], element.clone())
        };
        self.commit(vec![ListStep::add_remove(
            index,
            vec![old.clone()],
            vec![element],
        )]);
        Ok(old)
    }

    /// Remove and return the element at `index`.
    ///
    /// # Errors
    ///
    /// [`ListError::IndexOutOfBounds`] if `index >= len`.
    pub fn remove(&self, index: usize) -> Result<E, ListError> {
        let old = {
            let mut items = self.inner.items.borrow_mut();
            check_index(index, items.len())?;
            items.remove(index)
        };
        self.commit(vec![ListStep::removed(index, vec![old.clone()])]);
        Ok(old)
    }

    /// Remove the first element equal to `element`. Returns whether one was found.
    pub fn remove_item(&self, element: &E) -> bool
    where
        E: PartialEq,
    {
        match self.index_of(element) {
            Some(index) => self.remove(index).is_ok(),
            None => false,
        }
    }

    /// Change the element at `index` in place and report an update.
    ///
    /// # Errors
    ///
    /// [`ListError::IndexOutOfBounds`] if `index >= len`.
    pub fn update(&self, index: usize, f: impl FnOnce(&mut E)) -> Result<(), ListError> {
        let len = self.len();
        let mut value = self.get(index).ok_or(ListError::IndexOutOfBounds { index, len })?;
        f(&mut value);
        {
            let mut items = self.inner.items.borrow_mut();
            check_index(index, items.len())?;
            items[index] = value.clone();
        }
        self.commit(vec![ListStep::updated(index, vec![value])]);
        Ok(())
    }

    // -- batched mutation -------------------------------------------------

    /// Append every element of `elements`.
    pub fn add_all(&self, elements: impl IntoIterator<Item = E>) {
        let added: Vec<E> = elements.into_iter().collect();
        if added.is_empty() {
            return;
        }
        let from = {
            let mut items = self.inner.items.borrow_mut();
            let from = items.len();
            items.extend(added.iter().cloned());
            from
        };
        self.commit(vec![ListStep::added(from, added)]);
    }

    /// Insert every element of `elements` starting at `index`.
    ///
    /// # Errors
    ///
    /// [`ListError::IndexOutOfBounds`] if `index > len`.
    pub fn add_all_at(
        &self,
        index: usize,
        elements: impl IntoIterator<Item = E>,
    ) -> Result<(), ListError> {
        let added: Vec<E> = elements.into_iter().collect();
        {
            let mut items = self.inner.items.borrow_mut();
            check_position(index, items.len())?;
            if added.is_empty() {
                return Ok(());
            }
            items.splice(index..index, added.iter().cloned());
        }
        self.commit(vec![ListStep::added(index, added)]);
        Ok(())
    }

    /// Replace the whole contents.
    pub fn set_all(&self, elements: impl IntoIterator<Item = E>) {
        let added: Vec<E> = elements.into_iter().collect();
        let removed = std::mem::replace(&mut *self.inner.items.borrow_mut(), added.clone());
        if removed.is_empty() && added.is_empty() {
            return;
        }
        self.commit(vec![ListStep::add_remove(0, removed, added)]);
    }

    /// Remove the elements in `from..to`, returning them.
    ///
    /// # Errors
    ///
    /// [`ListError::InvalidRange`] if the range is reversed or past the end.
    pub fn remove_range(&self, from: usize, to: usize) -> Result<Vec<E>, ListError> {
        let removed: Vec<E> = {
            let mut items = self.inner.items.borrow_mut();
            check_range(from, to, items.len())?;
            items.drain(from..to).collect()
        };
        if !removed.is_empty() {
            self.commit(vec![ListStep::removed(from, removed.clone())]);
        }
        Ok(removed)
    }

    /// Remove every element contained in `elements`. Returns whether any was removed.
    pub fn remove_all(&self, elements: &[E]) -> bool
    where
        E: PartialEq,
    {
        self.remove_where(|e| elements.contains(e))
    }

    /// Keep only the elements matching `keep`. Returns whether any was removed.
    pub fn retain(&self, mut keep: impl FnMut(&E) -> bool) -> bool {
        self.remove_where(|e| !keep(e))
    }

    /// Remove everything.
    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.inner.items.borrow_mut());
        if !removed.is_empty() {
            self.commit(vec![ListStep::removed(0, removed)]);
        }
    }

    /// Sort in natural order (stable), reported as one permutation.
    pub fn sort(&self)
    where
        E: Ord,
    {
        self.sort_by(Ord::cmp);
    }

    /// Sort with `compare` (stable), reported as one permutation.
    pub fn sort_by(&self, mut compare: impl FnMut(&E, &E) -> Ordering) {
        let items = self.to_vec();
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| compare(&items[a], &items[b]));
        if order.iter().enumerate().all(|(new, &old)| new == old) {
            return;
        }
        let mut permutation = vec![0; items.len()];
        for (new, &old) in order.iter().enumerate() {
            permutation[old] = new;
        }
        let sorted: Vec<E> = order.iter().map(|&old| items[old].clone()).collect();
        *self.inner.items.borrow_mut() = sorted;
        self.commit(vec![ListStep::permutation(0, permutation)]);
    }

    fn remove_where(&self, mut doomed: impl FnMut(&E) -> bool) -> bool {
        let items = self.to_vec();
        let mut kept = Vec::with_capacity(items.len());
        let mut steps = Vec::new();
        let mut run: Vec<E> = Vec::new();
        for element in items {
            if doomed(&element) {
                run.push(element);
            } else {
                if !run.is_empty() {
                    steps.push(ListStep::removed(kept.len(), std::mem::take(&mut run)));
                }
                kept.push(element);
            }
        }
        if !run.is_empty() {
            steps.push(ListStep::removed(kept.len(), run));
        }
        if steps.is_empty() {
            return false;
        }
        *self.inner.items.borrow_mut() = kept;
        self.commit(steps);
        true
    }

    /// Apply `steps` (in sequential coordinates) and fire them as one change.
    pub(crate) fn replay(&self, steps: Vec<ListStep<E>>) -> Result<Dispatch, ListError> {
        {
            let mut items = self.inner.items.borrow_mut();
            let mut next = items.clone();
            for step in &steps {
                step.apply(&mut next)?;
            }
            *items = next;
        }
        Ok(self.commit(steps))
    }

    fn commit(&self, steps: Vec<ListStep<E>>) -> Dispatch {
        self.inner.notifier.fire_steps(self, self, LABEL, steps)
    }

    // -- views --------------------------------------------------------------

    /// A live view of the elements matching `predicate`.
    #[must_use]
    pub fn filtered(&self, predicate: impl Fn(&E) -> bool + 'static) -> FilteredList<E> {
        FilteredList::new(self, predicate)
    }

    /// A live view in natural order.
    #[must_use]
    pub fn sorted(&self) -> SortedList<E>
    where
        E: Ord,
    {
        SortedList::new(self)
    }

    /// A live view ordered by `compare`.
    #[must_use]
    pub fn sorted_by(&self, compare: impl Fn(&E, &E) -> Ordering + 'static) -> SortedList<E> {
        SortedList::with_comparator(self, compare)
    }

    /// An unmodifiable view of this list.
    #[must_use]
    pub fn read_only(&self) -> ReadOnlyListView<E> {
        ReadOnlyListView::new(self)
    }

    // -- bookkeeping --------------------------------------------------------

    /// Register a list change listener.
    pub fn add_list_listener(&self, listener: ListChangeListener<E>) {
        self.inner.notifier.add_list_listener(listener);
    }

    /// Remove a list change listener.
    pub fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        self.inner.notifier.remove_list_listener(listener);
    }

    /// Number of registered listeners of both kinds.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.notifier.listener_count()
    }

    /// Current listener storage representation.
    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.inner.notifier.storage_kind()
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> ObservableConfig {
        self.inner.notifier.config()
    }

    /// Whether both handles refer to the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &ObservableList<E>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn from_inner(inner: Rc<ListInner<E>>) -> Self {
        Self { inner }
    }
}

impl<E: Clone + 'static> Observable for ObservableList<E> {
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

impl<E: Clone + 'static> ListSource<E> for ObservableList<E> {
    fn len(&self) -> usize {
        ObservableList::len(self)
    }

    fn get(&self, index: usize) -> Option<E> {
        ObservableList::get(self, index)
    }

    fn to_vec(&self) -> Vec<E> {
        ObservableList::to_vec(self)
    }

    fn add_list_listener(&self, listener: ListChangeListener<E>) {
        ObservableList::add_list_listener(self, listener);
    }

    fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        ObservableList::remove_list_listener(self, listener);
    }
}

impl<E: fmt::Debug> fmt::Debug for ObservableList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObservableList");
        match self.inner.items.try_borrow() {
            Ok(items) => s.field("items", &*items),
            Err(_) => s.field("items", &"<borrowed>"),
        };
        s.finish_non_exhaustive()
    }
}
