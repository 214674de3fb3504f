#![forbid(unsafe_code)]

//! Size-adaptive listener storage.
//!
//! # Design
//!
//! [`ListenerSet<C>`] is a small-size-optimized multiset of listeners with an
//! explicit tagged representation:
//!
//! ```text
//! Empty ──add──▶ One(listener) ──add──▶ Many { invalidation[], change[] }
//!   ▲               │  ▲                         │
//!   └──remove(==)───┘  └──remove (1 left)────────┘
//! ```
//!
//! `C` is the kind-specific change listener type (scalar, list, or map). One
//! container holds both invalidation and change listeners.
//!
//! # Invariants
//!
//! 1. Promotion Empty→One→Many happens one step per `add`.
//! 2. Removing from `Many` demotes to `One` only when exactly one listener is
//!    left. One invalidation plus one change listener stays `Many`.
//! 3. Removing the last listener returns to `Empty`; no array is retained.
//! 4. Dispatch works on a [`ListenerSnapshot`]. While a snapshot is alive the
//!    storage is *locked*: `add`/`remove` copy the listener array instead of
//!    mutating it, so an in-flight dispatch iterates a stable view.
//! 5. Invalidation listeners run before change listeners, each kind in
//!    registration order.
//! 6. Dispatch never mutates storage. Dead weak listeners are skipped during
//!    dispatch and pruned only when `add` needs to grow the array.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `add` | O(1) amortized, growth ≈1.5× |
//! | `remove` | O(n) |
//! | `snapshot` | O(1) (`Rc` clones) |
//! | dispatch | O(n) |

use std::mem;
use std::rc::Rc;

use crate::fault::{Dispatch, ListenerError, ListenerFault, ListenerKind, ListenerResult};
use crate::listener::{InvalidationListener, ListenerHandle};
use crate::observable::Observable;

/// A listener of either kind, as stored in the single-listener slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration<C> {
    /// An invalidation listener.
    Invalidation(InvalidationListener),
    /// A kind-specific change listener.
    Change(C),
}

/// The current representation of a [`ListenerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// No listeners; nothing allocated.
    Empty,
    /// Exactly one listener, stored inline.
    One,
    /// Two or more listeners (or one of each kind), stored in arrays.
    Many,
}

#[derive(Debug, Clone)]
struct ManyListeners<C> {
    invalidation: Rc<Vec<InvalidationListener>>,
    change: Rc<Vec<C>>,
    initial_capacity: usize,
}

impl<C: ListenerHandle> ManyListeners<C> {
    fn new(initial_capacity: usize) -> Self {
        Self {
            invalidation: Rc::new(Vec::new()),
            change: Rc::new(Vec::new()),
            initial_capacity,
        }
    }

    fn push(&mut self, registration: Registration<C>) {
        let initial = self.initial_capacity;
        match registration {
            Registration::Invalidation(listener) => {
                let listeners = Rc::make_mut(&mut self.invalidation);
                grow(listeners, initial);
                listeners.push(listener);
            }
            Registration::Change(listener) => {
                let listeners = Rc::make_mut(&mut self.change);
                grow(listeners, initial);
                listeners.push(listener);
            }
        }
    }

    fn locked(&self) -> bool {
        Rc::strong_count(&self.invalidation) > 1 || Rc::strong_count(&self.change) > 1
    }

    fn total(&self) -> usize {
        self.invalidation.len() + self.change.len()
    }

    /// The single remaining listener, if exactly one is left.
    fn sole(&self) -> Option<Registration<C>> {
        match (self.invalidation.as_slice(), self.change.as_slice()) {
            ([only], []) => Some(Registration::Invalidation(only.clone())),
            ([], [only]) => Some(Registration::Change(only.clone())),
            _ => None,
        }
    }
}

/// Make room for one more listener, pruning dead entries before growing.
fn grow<L: ListenerHandle>(listeners: &mut Vec<L>, initial: usize) {
    if listeners.len() < listeners.capacity() {
        return;
    }
    listeners.retain(ListenerHandle::is_alive);
    if listeners.len() < listeners.capacity() {
        return;
    }
    let extra = if listeners.capacity() == 0 {
        initial
    } else {
        (listeners.len() / 2).max(1)
    };
    listeners.reserve_exact(extra);
}

fn remove_first<L: PartialEq + Clone>(listeners: &mut Rc<Vec<L>>, target: &L) -> bool {
    match listeners.iter().position(|l| l == target) {
        Some(index) => {
            Rc::make_mut(listeners).remove(index);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone)]
enum Repr<C> {
    Empty,
    One(Registration<C>),
    Many(ManyListeners<C>),
}

/// Size-adaptive listener multiset shared by every observable kind.
#[derive(Debug, Clone)]
pub struct ListenerSet<C> {
    repr: Repr<C>,
    initial_capacity: usize,
}

impl<C: ListenerHandle> Default for ListenerSet<C> {
    fn default() -> Self {
        Self::new(2)
    }
}

impl<C: ListenerHandle> ListenerSet<C> {
    /// Create empty storage. `initial_capacity` is reserved on promotion to `Many`.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            repr: Repr::Empty,
            initial_capacity: initial_capacity.max(2),
        }
    }

    /// The current representation.
    #[must_use]
    pub fn kind(&self) -> StorageKind {
        match self.repr {
            Repr::Empty => StorageKind::Empty,
            Repr::One(_) => StorageKind::One,
            Repr::Many(_) => StorageKind::Many,
        }
    }

    /// Register an invalidation listener.
    pub fn add_invalidation(&mut self, listener: InvalidationListener) {
        self.add(Registration::Invalidation(listener));
    }

    /// Register a change listener.
    pub fn add_change(&mut self, listener: C) {
        self.add(Registration::Change(listener));
    }

    /// Register a listener of either kind.
    pub fn add(&mut self, registration: Registration<C>) {
        self.repr = match mem::replace(&mut self.repr, Repr::Empty) {
            Repr::Empty => Repr::One(registration),
            Repr::One(existing) => {
                let mut many = ManyListeners::new(self.initial_capacity);
                many.push(existing);
                many.push(registration);
                Repr::Many(many)
            }
            Repr::Many(mut many) => {
                many.push(registration);
                Repr::Many(many)
            }
        };
    }

    /// Remove the first invalidation listener equal to `listener`.
    ///
    /// Returns `true` if a listener was removed.
    pub fn remove_invalidation(&mut self, listener: &InvalidationListener) -> bool {
        self.remove(
            |repr| match repr {
                Repr::One(Registration::Invalidation(existing)) => existing == listener,
                _ => false,
            },
            |many| remove_first(&mut many.invalidation, listener),
        )
    }

    /// Remove the first change listener equal to `listener`.
    ///
    /// Returns `true` if a listener was removed.
    pub fn remove_change(&mut self, listener: &C) -> bool {
        self.remove(
            |repr| match repr {
                Repr::One(Registration::Change(existing)) => existing == listener,
                _ => false,
            },
            |many| remove_first(&mut many.change, listener),
        )
    }

    fn remove(
        &mut self,
        matches_one: impl FnOnce(&Repr<C>) -> bool,
        remove_many: impl FnOnce(&mut ManyListeners<C>) -> bool,
    ) -> bool {
        match &mut self.repr {
            Repr::Empty => false,
            repr @ Repr::One(_) => {
                if matches_one(repr) {
                    *repr = Repr::Empty;
                    true
                } else {
                    false
                }
            }
            Repr::Many(many) => {
                if !remove_many(many) {
                    return false;
                }
                if many.total() == 0 {
                    self.repr = Repr::Empty;
                } else if let Some(sole) = many.sole() {
                    self.repr = Repr::One(sole);
                }
                true
            }
        }
    }

    /// Total number of registered listeners (dead weak ones included).
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::One(_) => 1,
            Repr::Many(many) => many.total(),
        }
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.repr, Repr::Empty)
    }

    /// Number of invalidation listeners.
    #[must_use]
    pub fn invalidation_count(&self) -> usize {
        match &self.repr {
            Repr::Empty | Repr::One(Registration::Change(_)) => 0,
            Repr::One(Registration::Invalidation(_)) => 1,
            Repr::Many(many) => many.invalidation.len(),
        }
    }

    /// Number of change listeners.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.len() - self.invalidation_count()
    }

    /// Whether at least one change listener is registered.
    #[must_use]
    pub fn has_change_listeners(&self) -> bool {
        self.change_count() > 0
    }

    /// Whether a dispatch snapshot currently shares the listener arrays.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        match &self.repr {
            Repr::Many(many) => many.locked(),
            _ => false,
        }
    }

    /// Capture the listeners for dispatch. The borrow on the owning
    /// observable can be released while the snapshot is iterated.
    #[must_use]
    pub fn snapshot(&self) -> ListenerSnapshot<C> {
        let repr = match &self.repr {
            Repr::Empty => SnapshotRepr::Empty,
            Repr::One(registration) => SnapshotRepr::One(registration.clone()),
            Repr::Many(many) => SnapshotRepr::Many {
                invalidation: Rc::clone(&many.invalidation),
                change: Rc::clone(&many.change),
            },
        };
        ListenerSnapshot { repr }
    }
}

/// Where a dispatch happens: the firing observable and how to report faults.
#[derive(Clone, Copy)]
pub struct DispatchSite<'a> {
    /// The observable passed to invalidation listeners.
    pub source: &'a dyn Observable,
    /// Label used in fault records and logs.
    pub label: &'a str,
    /// Whether faults are logged.
    pub log_faults: bool,
}

impl<'a> DispatchSite<'a> {
    /// Create a dispatch site.
    #[must_use]
    pub fn new(source: &'a dyn Observable, label: &'a str, log_faults: bool) -> Self {
        Self {
            source,
            label,
            log_faults,
        }
    }

    fn capture(&self, kind: ListenerKind, result: ListenerResult, report: &mut Dispatch) {
        report.delivered += 1;
        if let Err(error) = result {
            if self.log_faults {
                tracing::warn!(
                    source = self.label,
                    kind = %kind,
                    error = %error,
                    "listener fault"
                );
            }
            report.faults.push(ListenerFault::new(kind, self.label, error));
        }
    }
}

#[derive(Debug, Clone)]
enum SnapshotRepr<C> {
    Empty,
    One(Registration<C>),
    Many {
        invalidation: Rc<Vec<InvalidationListener>>,
        change: Rc<Vec<C>>,
    },
}

/// Stable view of a [`ListenerSet`] taken at the start of a dispatch.
#[derive(Debug, Clone)]
pub struct ListenerSnapshot<C> {
    repr: SnapshotRepr<C>,
}

impl<C: ListenerHandle> ListenerSnapshot<C> {
    /// Whether the snapshot holds no listener.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.repr, SnapshotRepr::Empty)
    }

    /// Whether the snapshot holds at least one change listener.
    #[must_use]
    pub fn has_change_listeners(&self) -> bool {
        match &self.repr {
            SnapshotRepr::Empty | SnapshotRepr::One(Registration::Invalidation(_)) => false,
            SnapshotRepr::One(Registration::Change(_)) => true,
            SnapshotRepr::Many { change, .. } => !change.is_empty(),
        }
    }

    /// Notify every live invalidation listener.
    pub fn dispatch_invalidation(&self, site: &DispatchSite<'_>) -> Dispatch {
        let mut report = Dispatch::new();
        let mut notify = |listener: &InvalidationListener| {
            if listener.is_alive() {
                let result = listener.invalidated(site.source);
                site.capture(ListenerKind::Invalidation, result, &mut report);
            }
        };
        match &self.repr {
            SnapshotRepr::Empty | SnapshotRepr::One(Registration::Change(_)) => {}
            SnapshotRepr::One(Registration::Invalidation(listener)) => notify(listener),
            SnapshotRepr::Many { invalidation, .. } => invalidation.iter().for_each(notify),
        }
        report
    }

    /// Notify every live change listener through `notify`.
    ///
    /// `notify` adapts the kind-specific payload (old/new values, a list
    /// change cursor, a map change) to each listener.
    pub fn dispatch_change(
        &self,
        site: &DispatchSite<'_>,
        kind: ListenerKind,
        mut notify: impl FnMut(&C) -> ListenerResult,
    ) -> Dispatch {
        let mut report = Dispatch::new();
        let mut run = |listener: &C| {
            if listener.is_alive() {
                let result = notify(listener);
                site.capture(kind, result, &mut report);
            }
        };
        match &self.repr {
            SnapshotRepr::Empty | SnapshotRepr::One(Registration::Invalidation(_)) => {}
            SnapshotRepr::One(Registration::Change(listener)) => run(listener),
            SnapshotRepr::Many { change, .. } => change.iter().for_each(run),
        }
        report
    }

    /// Invalidation listeners first, then change listeners.
    pub fn dispatch(
        &self,
        site: &DispatchSite<'_>,
        kind: ListenerKind,
        notify: impl FnMut(&C) -> ListenerResult,
    ) -> Dispatch {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("listener_dispatch", source = site.label, kind = %kind)
            .entered();

        let mut report = self.dispatch_invalidation(site);
        report.merge(self.dispatch_change(site, kind, notify));
        report
    }
}

/// Turn the faults of a nested dispatch into a listener result.
///
/// Used by listeners that propagate a change onward (bindings, bound
/// properties) so downstream faults surface on the observable that started
/// the propagation.
pub fn propagate(report: Dispatch, message: &str) -> ListenerResult {
    ListenerError::check_nested(message, report.faults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ChangeListener;
    use crate::observable::ObservableId;
    use std::cell::RefCell;

    type Set = ListenerSet<ChangeListener<i32>>;

    struct Dummy;

    impl Observable for Dummy {
        fn observable_id(&self) -> ObservableId {
            ObservableId::from_raw(0)
        }
        fn add_listener(&self, _listener: InvalidationListener) {}
        fn remove_listener(&self, _listener: &InvalidationListener) {}
    }

    fn site(source: &dyn Observable) -> DispatchSite<'_> {
        DispatchSite::new(source, "dummy", false)
    }

    #[test]
    fn promotion_empty_one_many() {
        let mut set = Set::default();
        assert_eq!(set.kind(), StorageKind::Empty);

        set.add_invalidation(InvalidationListener::new(|_| {}));
        assert_eq!(set.kind(), StorageKind::One);

        set.add_change(ChangeListener::new(|_, _| {}));
        assert_eq!(set.kind(), StorageKind::Many);
        assert_eq!(set.invalidation_count(), 1);
        assert_eq!(set.change_count(), 1);
    }

    #[test]
    fn one_remove_matching_and_not() {
        let mut set = Set::default();
        let a = InvalidationListener::new(|_| {});
        let b = InvalidationListener::new(|_| {});
        set.add_invalidation(a.clone());

        assert!(!set.remove_invalidation(&b));
        assert_eq!(set.kind(), StorageKind::One);

        assert!(set.remove_invalidation(&a));
        assert_eq!(set.kind(), StorageKind::Empty);
    }

    #[test]
    fn same_kind_demotes_to_one() {
        let mut set = Set::default();
        let a = InvalidationListener::new(|_| {});
        let b = InvalidationListener::new(|_| {});
        set.add_invalidation(a.clone());
        set.add_invalidation(b);
        assert_eq!(set.kind(), StorageKind::Many);

        set.remove_invalidation(&a);
        assert_eq!(set.kind(), StorageKind::One);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn mixed_kinds_stay_many() {
        let mut set = Set::default();
        let a = InvalidationListener::new(|_| {});
        set.add_invalidation(a.clone());
        set.add_invalidation(InvalidationListener::new(|_| {}));
        set.add_change(ChangeListener::new(|_, _| {}));

        set.remove_invalidation(&a);
        assert_eq!(set.kind(), StorageKind::Many);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn removing_everything_returns_to_empty() {
        let mut set = Set::default();
        let listeners: Vec<_> = (0..5).map(|_| InvalidationListener::new(|_| {})).collect();
        for l in &listeners {
            set.add_invalidation(l.clone());
        }
        for l in &listeners {
            assert!(set.remove_invalidation(l));
        }
        assert_eq!(set.kind(), StorageKind::Empty);
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_registration_is_a_multiset() {
        let mut set = Set::default();
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let l = InvalidationListener::new(move |_| *c.borrow_mut() += 1);
        set.add_invalidation(l.clone());
        set.add_invalidation(l.clone());

        set.snapshot().dispatch_invalidation(&site(&Dummy));
        assert_eq!(*count.borrow(), 2);

        set.remove_invalidation(&l);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn invalidation_before_change_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set = Set::default();

        let l = Rc::clone(&log);
        set.add_change(ChangeListener::new(move |_, _| l.borrow_mut().push("c1")));
        let l = Rc::clone(&log);
        set.add_invalidation(InvalidationListener::new(move |_| l.borrow_mut().push("i1")));
        let l = Rc::clone(&log);
        set.add_change(ChangeListener::new(move |_, _| l.borrow_mut().push("c2")));
        let l = Rc::clone(&log);
        set.add_invalidation(InvalidationListener::new(move |_| l.borrow_mut().push("i2")));

        let snapshot = set.snapshot();
        snapshot.dispatch(&site(&Dummy), ListenerKind::Change, |listener| {
            listener.changed(&crate::property::Property::new(0), &0, &1)
        });
        assert_eq!(*log.borrow(), vec!["i1", "i2", "c1", "c2"]);
    }

    #[test]
    fn fault_does_not_stop_dispatch() {
        let mut set = Set::default();
        let reached = Rc::new(RefCell::new(false));
        set.add_invalidation(InvalidationListener::try_new(|_| Err("first fails".into())));
        let r = Rc::clone(&reached);
        set.add_invalidation(InvalidationListener::new(move |_| *r.borrow_mut() = true));

        let report = set.snapshot().dispatch_invalidation(&site(&Dummy));
        assert!(*reached.borrow());
        assert_eq!(report.delivered, 2);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].kind, ListenerKind::Invalidation);
        assert_eq!(report.faults[0].error.message(), "first fails");
    }

    #[test]
    #[tracing_test::traced_test]
    fn faults_are_logged() {
        let mut set = Set::default();
        set.add_invalidation(InvalidationListener::try_new(|_| Err("exploded".into())));
        let source = Dummy;
        set.snapshot()
            .dispatch_invalidation(&DispatchSite::new(&source, "logged", true));
        assert!(logs_contain("listener fault"));
        assert!(logs_contain("exploded"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn quiet_sites_do_not_log() {
        let mut set = Set::default();
        set.add_invalidation(InvalidationListener::try_new(|_| Err("silent".into())));
        let report = set.snapshot().dispatch_invalidation(&site(&Dummy));
        assert_eq!(report.faults.len(), 1);
        assert!(!logs_contain("silent"));
    }

    #[test]
    fn snapshot_locks_and_copies_on_write() {
        let mut set = Set::default();
        set.add_invalidation(InvalidationListener::new(|_| {}));
        set.add_invalidation(InvalidationListener::new(|_| {}));
        assert!(!set.is_locked());

        let snapshot = set.snapshot();
        assert!(set.is_locked());

        set.add_invalidation(InvalidationListener::new(|_| {}));
        assert_eq!(set.len(), 3);

        // The snapshot still sees the two listeners it captured.
        let report = snapshot.dispatch_invalidation(&site(&Dummy));
        assert_eq!(report.delivered, 2);

        drop(snapshot);
        assert!(!set.is_locked());
    }

    #[test]
    fn dead_weak_listeners_are_skipped_and_pruned() {
        let mut set = Set::new(2);
        let target = Rc::new(());
        set.add_invalidation(InvalidationListener::weak(&target, |_, _| Ok(())));
        set.add_invalidation(InvalidationListener::weak(&target, |_, _| Ok(())));
        drop(target);

        let report = set.snapshot().dispatch_invalidation(&site(&Dummy));
        assert_eq!(report.delivered, 0);
        assert_eq!(set.len(), 2);

        // Capacity is 2 and full: the next add prunes the dead entries first.
        set.add_invalidation(InvalidationListener::new(|_| {}));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn growth_is_geometric() {
        let mut v: Vec<InvalidationListener> = Vec::new();
        grow(&mut v, 4);
        assert!(v.capacity() >= 4);
        while v.len() < v.capacity() {
            v.push(InvalidationListener::new(|_| {}));
        }
        let full = v.len();
        grow(&mut v, 4);
        assert!(v.capacity() >= full + full / 2);
    }

    #[test]
    fn remove_during_dispatch_is_safe() {
        let set = Rc::new(RefCell::new(Set::default()));
        let calls = Rc::new(RefCell::new(0));

        let victim = InvalidationListener::new({
            let calls = Rc::clone(&calls);
            move |_| *calls.borrow_mut() += 1
        });
        let remover = InvalidationListener::new({
            let set = Rc::clone(&set);
            let victim = victim.clone();
            move |_| {
                set.borrow_mut().remove_invalidation(&victim);
            }
        });
        set.borrow_mut().add_invalidation(remover);
        set.borrow_mut().add_invalidation(victim);

        let snapshot = set.borrow().snapshot();
        snapshot.dispatch_invalidation(&site(&Dummy));
        // The in-flight snapshot still delivered to the victim once.
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(set.borrow().len(), 1);
    }
}
