#![forbid(unsafe_code)]

//! Unmodifiable list view.
//!
//! [`ReadOnlyListView`] exposes reads and listener registration of a source
//! list and nothing else. Source changes are re-fired with the view as
//! their `list()`; the steps are forwarded untouched.

use std::fmt;
use std::rc::{Rc, Weak};

use ftui_reactive::{
    InvalidationListener, ListenerFault, ListenerResult, Observable, ObservableConfig,
    ObservableId, storage,
};

use crate::change::{ListChange, SourceAdapterChange};
use crate::listener::ListChangeListener;
use crate::notifier::ListNotifier;
use crate::source::ListSource;

const LABEL: &str = "ReadOnlyListView";

pub(crate) struct ReadOnlyInner<E> {
    source: Box<dyn ListSource<E>>,
    notifier: ListNotifier<E>,
    listener: ListChangeListener<E>,
}

impl<E> Drop for ReadOnlyInner<E> {
    fn drop(&mut self) {
        self.source.remove_list_listener(&self.listener);
    }
}

impl<E: Clone + 'static> ReadOnlyInner<E> {
    fn on_source_change(self: &Rc<Self>, change: &mut dyn ListChange<E>) -> ListenerResult {
        let view = ReadOnlyListView {
            inner: Rc::clone(self),
        };
        let mut adapted = SourceAdapterChange::new(&view, change);
        let report = self.notifier.fire(&view, LABEL, &mut adapted);
        storage::propagate(report, "read-only view propagation failed")
    }
}

/// Live, unmodifiable view of a list.
pub struct ReadOnlyListView<E> {
    inner: Rc<ReadOnlyInner<E>>,
}

impl<E> Clone for ReadOnlyListView<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone + 'static> ReadOnlyListView<E> {
    pub fn new<S>(source: &S) -> Self
    where
        S: ListSource<E> + Clone + 'static,
    {
        Self::with_config(source, ObservableConfig::default())
    }

    pub fn with_config<S>(source: &S, config: ObservableConfig) -> Self
    where
        S: ListSource<E> + Clone + 'static,
    {
        let inner = Rc::new_cyclic(|weak: &Weak<ReadOnlyInner<E>>| ReadOnlyInner {
            source: Box::new(source.clone()),
            notifier: ListNotifier::new(config),
            listener: ListChangeListener::from_weak(weak.clone(), |inner, change| {
                inner.on_source_change(change)
            }),
        });
        source.add_list_listener(inner.listener.clone());
        Self { inner }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.source.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<E> {
        self.inner.source.get(index)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<E> {
        self.inner.source.to_vec()
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

impl<E: Clone + 'static> Observable for ReadOnlyListView<E> {
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

impl<E: Clone + 'static> ListSource<E> for ReadOnlyListView<E> {
    fn len(&self) -> usize {
        ReadOnlyListView::len(self)
    }

    fn get(&self, index: usize) -> Option<E> {
        ReadOnlyListView::get(self, index)
    }

    fn to_vec(&self) -> Vec<E> {
        ReadOnlyListView::to_vec(self)
    }

    fn add_list_listener(&self, listener: ListChangeListener<E>) {
        ReadOnlyListView::add_list_listener(self, listener);
    }

    fn remove_list_listener(&self, listener: &ListChangeListener<E>) {
        ReadOnlyListView::remove_list_listener(self, listener);
    }
}

impl<E> fmt::Debug for ReadOnlyListView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyListView")
            .field("listeners", &self.inner.notifier)
            .finish_non_exhaustive()
    }
}
