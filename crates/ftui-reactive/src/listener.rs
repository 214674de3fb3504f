#![forbid(unsafe_code)]

//! Listener contracts.
//!
//! - [`InvalidationListener`]: fires whenever an observable *might* have
//!   changed. Carries no value.
//! - [`ChangeListener<T>`]: fires only when the value provably changed
//!   (`old != new`), receiving both values.
//!
//! Listener handles are cheap `Rc` clones. Two handles are equal when they
//! share the same callback allocation, or when both carry the same
//! [`ListenerTag`]. Tags let pair-keyed bindings rebuild a probe listener to
//! remove the one they installed earlier.
//!
//! A listener built with `weak()` holds only a `Weak` reference to its target.
//! Once the target drops, the listener becomes inert and reports itself dead
//! so storage can prune it.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::fault::ListenerResult;
use crate::observable::{Observable, ObservableId, ObservableValue};

/// Optional liveness witness for weak listeners. `None` means always alive.
#[doc(hidden)]
pub type Liveness = Option<Weak<dyn Any>>;

/// Liveness witness tracking `target`.
#[doc(hidden)]
pub fn liveness_of<S: 'static>(target: &Rc<S>) -> Liveness {
    let weak = Rc::downgrade(target);
    let weak: Weak<dyn Any> = weak;
    Some(weak)
}

#[doc(hidden)]
pub fn is_live(liveness: &Liveness) -> bool {
    liveness.as_ref().is_none_or(|w| w.strong_count() > 0)
}

/// Common surface of every listener handle kept in listener storage.
pub trait ListenerHandle: Clone + PartialEq {
    /// Whether the listener can still do anything. Weak listeners whose
    /// target was dropped report `false`.
    fn is_alive(&self) -> bool;
}

/// Identity key shared by the listeners a pair-keyed binding installs.
///
/// The pair is unordered: `pair(scope, a, b) == pair(scope, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerTag {
    scope: &'static str,
    lo: ObservableId,
    hi: ObservableId,
}

impl ListenerTag {
    /// Tag for an unordered pair of observables within a binding family.
    #[must_use]
    pub fn pair(scope: &'static str, a: ObservableId, b: ObservableId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self { scope, lo, hi }
    }

    /// The binding family this tag belongs to.
    #[must_use]
    pub fn scope(&self) -> &'static str {
        self.scope
    }

    /// The pair, smaller identity first.
    #[must_use]
    pub fn ids(&self) -> (ObservableId, ObservableId) {
        (self.lo, self.hi)
    }
}

fn same_listener<F: ?Sized>(
    a: &Rc<F>,
    a_tag: Option<ListenerTag>,
    b: &Rc<F>,
    b_tag: Option<ListenerTag>,
) -> bool {
    match (a_tag, b_tag) {
        (Some(x), Some(y)) => x == y,
        _ => Rc::ptr_eq(a, b),
    }
}

// ---------------------------------------------------------------------------
// InvalidationListener
// ---------------------------------------------------------------------------

type InvalidationFn = dyn Fn(&dyn Observable) -> ListenerResult;

/// Callback fired whenever an observable's state might have changed.
#[derive(Clone)]
pub struct InvalidationListener {
    callback: Rc<InvalidationFn>,
    liveness: Liveness,
    tag: Option<ListenerTag>,
}

impl InvalidationListener {
    /// Create a listener from an infallible callback.
    pub fn new(f: impl Fn(&dyn Observable) + 'static) -> Self {
        Self::try_new(move |source: &dyn Observable| {
            f(source);
            Ok(())
        })
    }

    /// Create a listener from a callback that may fail.
    pub fn try_new(f: impl Fn(&dyn Observable) -> ListenerResult + 'static) -> Self {
        Self {
            callback: Rc::new(f),
            liveness: None,
            tag: None,
        }
    }

    /// Create a listener that holds `target` weakly.
    ///
    /// `f` runs only while `target` is alive; afterwards the listener is dead.
    pub fn weak<S: 'static>(
        target: &Rc<S>,
        f: impl Fn(&Rc<S>, &dyn Observable) -> ListenerResult + 'static,
    ) -> Self {
        Self::from_weak(Rc::downgrade(target), f)
    }

    /// Like [`weak`](Self::weak), for targets still under construction
    /// (`Rc::new_cyclic`).
    pub fn from_weak<S: 'static>(
        target: Weak<S>,
        f: impl Fn(&Rc<S>, &dyn Observable) -> ListenerResult + 'static,
    ) -> Self {
        let liveness: Weak<dyn Any> = target.clone();
        Self {
            callback: Rc::new(move |source: &dyn Observable| match target.upgrade() {
                Some(strong) => f(&strong, source),
                None => Ok(()),
            }),
            liveness: Some(liveness),
            tag: None,
        }
    }

    /// Attach an identity tag.
    #[must_use]
    pub fn with_tag(mut self, tag: ListenerTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// The identity tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<ListenerTag> {
        self.tag
    }

    /// Invoke the callback.
    pub fn invalidated(&self, source: &dyn Observable) -> ListenerResult {
        (self.callback)(source)
    }
}

impl PartialEq for InvalidationListener {
    fn eq(&self, other: &Self) -> bool {
        same_listener(&self.callback, self.tag, &other.callback, other.tag)
    }
}

impl ListenerHandle for InvalidationListener {
    fn is_alive(&self) -> bool {
        is_live(&self.liveness)
    }
}

impl fmt::Debug for InvalidationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationListener")
            .field("tag", &self.tag)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// ChangeListener<T>
// ---------------------------------------------------------------------------

type ChangeFn<T> = dyn Fn(&dyn ObservableValue<T>, &T, &T) -> ListenerResult;

/// Callback fired when an observable value changed from `old` to `new`.
pub struct ChangeListener<T> {
    callback: Rc<ChangeFn<T>>,
    liveness: Liveness,
    tag: Option<ListenerTag>,
}

impl<T> Clone for ChangeListener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
            liveness: self.liveness.clone(),
            tag: self.tag,
        }
    }
}

impl<T: 'static> ChangeListener<T> {
    /// Create a listener from an infallible `(old, new)` callback.
    pub fn new(f: impl Fn(&T, &T) + 'static) -> Self {
        Self::with_source(move |_: &dyn ObservableValue<T>, old: &T, new: &T| {
            f(old, new);
            Ok(())
        })
    }

    /// Create a listener from a fallible `(old, new)` callback.
    pub fn try_new(f: impl Fn(&T, &T) -> ListenerResult + 'static) -> Self {
        Self::with_source(move |_: &dyn ObservableValue<T>, old: &T, new: &T| f(old, new))
    }

    /// Create a listener that also receives the observable that changed.
    pub fn with_source(
        f: impl Fn(&dyn ObservableValue<T>, &T, &T) -> ListenerResult + 'static,
    ) -> Self {
        Self {
            callback: Rc::new(f),
            liveness: None,
            tag: None,
        }
    }

    /// Create a listener that holds `target` weakly.
    pub fn weak<S: 'static>(
        target: &Rc<S>,
        f: impl Fn(&Rc<S>, &T, &T) -> ListenerResult + 'static,
    ) -> Self {
        let weak = Rc::downgrade(target);
        Self {
            callback: Rc::new(
                move |_: &dyn ObservableValue<T>, old: &T, new: &T| match weak.upgrade() {
                    Some(strong) => f(&strong, old, new),
                    None => Ok(()),
                },
            ),
            liveness: liveness_of(target),
            tag: None,
        }
    }

    /// Attach an identity tag.
    #[must_use]
    pub fn with_tag(mut self, tag: ListenerTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// The identity tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<ListenerTag> {
        self.tag
    }

    /// Invoke the callback.
    pub fn changed(&self, source: &dyn ObservableValue<T>, old: &T, new: &T) -> ListenerResult {
        (self.callback)(source, old, new)
    }
}

impl<T> PartialEq for ChangeListener<T> {
    fn eq(&self, other: &Self) -> bool {
        same_listener(&self.callback, self.tag, &other.callback, other.tag)
    }
}

impl<T> ListenerHandle for ChangeListener<T> {
    fn is_alive(&self) -> bool {
        is_live(&self.liveness)
    }
}

impl<T> fmt::Debug for ChangeListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeListener")
            .field("tag", &self.tag)
            .field("alive", &is_live(&self.liveness))
            .finish_non_exhaustive()
    }
}
