#![forbid(unsafe_code)]

//! Change listeners for lists and maps.
//!
//! Both kinds live in the same size-adaptive [`ListenerSet`] as scalar
//! listeners, next to the collection's invalidation listeners.

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use ftui_reactive::listener::{Liveness, is_live, liveness_of};
use ftui_reactive::{ListenerHandle, ListenerResult, ListenerSet};

use crate::change::ListChange;
use crate::map::MapChange;

// ---------------------------------------------------------------------------
// ListChangeListener<E>
// ---------------------------------------------------------------------------

type ListChangeFn<E> = dyn Fn(&mut dyn ListChange<E>) -> ListenerResult;

/// Callback receiving a [`ListChange`] cursor.
///
/// Each listener gets the cursor positioned before the first step.
pub struct ListChangeListener<E> {
    callback: Rc<ListChangeFn<E>>,
    liveness: Liveness,
}

impl<E> Clone for ListChangeListener<E> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
            liveness: self.liveness.clone(),
        }
    }
}

impl<E: 'static> ListChangeListener<E> {
    /// Create a listener from an infallible callback.
    pub fn new(f: impl Fn(&mut dyn ListChange<E>) + 'static) -> Self {
        Self::try_new(move |change: &mut dyn ListChange<E>| {
            f(change);
            Ok(())
        })
    }

    /// Create a listener from a callback that may fail.
    pub fn try_new(f: impl Fn(&mut dyn ListChange<E>) -> ListenerResult + 'static) -> Self {
        Self {
            callback: Rc::new(f),
            liveness: None,
        }
    }

    /// Create a listener that holds `target` weakly.
    pub fn weak<S: 'static>(
        target: &Rc<S>,
        f: impl Fn(&Rc<S>, &mut dyn ListChange<E>) -> ListenerResult + 'static,
    ) -> Self {
        Self::from_weak(Rc::downgrade(target), f)
    }

    /// Like [`weak`](Self::weak), for targets built with `Rc::new_cyclic`.
    pub fn from_weak<S: 'static>(
        target: Weak<S>,
        f: impl Fn(&Rc<S>, &mut dyn ListChange<E>) -> ListenerResult + 'static,
    ) -> Self {
        let liveness: Weak<dyn Any> = target.clone();
        Self {
            callback: Rc::new(move |change: &mut dyn ListChange<E>| match target.upgrade() {
                Some(strong) => f(&strong, change),
                None => Ok(()),
            }),
            liveness: Some(liveness),
        }
    }

    /// Invoke the callback.
    pub fn on_changed(&self, change: &mut dyn ListChange<E>) -> ListenerResult {
        (self.callback)(change)
    }
}

impl<E> PartialEq for ListChangeListener<E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<E> ListenerHandle for ListChangeListener<E> {
    fn is_alive(&self) -> bool {
        is_live(&self.liveness)
    }
}

impl<E> fmt::Debug for ListChangeListener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListChangeListener")
            .field("alive", &is_live(&self.liveness))
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// MapChangeListener<K, V>
// ---------------------------------------------------------------------------

type MapChangeFn<K, V> = dyn Fn(&MapChange<'_, K, V>) -> ListenerResult;

/// Callback receiving one [`MapChange`] per affected entry.
pub struct MapChangeListener<K, V> {
    callback: Rc<MapChangeFn<K, V>>,
    liveness: Liveness,
}

impl<K, V> Clone for MapChangeListener<K, V> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
            liveness: self.liveness.clone(),
        }
    }
}

impl<K: 'static, V: 'static> MapChangeListener<K, V> {
    /// Create a listener from an infallible callback.
    pub fn new(f: impl Fn(&MapChange<'_, K, V>) + 'static) -> Self {
        Self::try_new(move |change: &MapChange<'_, K, V>| {
            f(change);
            Ok(())
        })
    }

    /// Create a listener from a callback that may fail.
    pub fn try_new(f: impl Fn(&MapChange<'_, K, V>) -> ListenerResult + 'static) -> Self {
        Self {
            callback: Rc::new(f),
            liveness: None,
        }
    }

    /// Create a listener that holds `target` weakly.
    pub fn weak<S: 'static>(
        target: &Rc<S>,
        f: impl Fn(&Rc<S>, &MapChange<'_, K, V>) -> ListenerResult + 'static,
    ) -> Self {
        let weak = Rc::downgrade(target);
        Self {
            callback: Rc::new(move |change: &MapChange<'_, K, V>| match weak.upgrade() {
                Some(strong) => f(&strong, change),
                None => Ok(()),
            }),
            liveness: liveness_of(target),
        }
    }

    /// Invoke the callback.
    pub fn on_changed(&self, change: &MapChange<'_, K, V>) -> ListenerResult {
        (self.callback)(change)
    }
}

impl<K, V> PartialEq for MapChangeListener<K, V> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<K, V> ListenerHandle for MapChangeListener<K, V> {
    fn is_alive(&self) -> bool {
        is_live(&self.liveness)
    }
}

impl<K, V> fmt::Debug for MapChangeListener<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapChangeListener")
            .field("alive", &is_live(&self.liveness))
            .finish_non_exhaustive()
    }
}

/// Listener storage of an observable list.
pub type ListListenerHelper<E> = ListenerSet<ListChangeListener<E>>;

/// Listener storage of an observable map.
pub type MapListenerHelper<K, V> = ListenerSet<MapChangeListener<K, V>>;
