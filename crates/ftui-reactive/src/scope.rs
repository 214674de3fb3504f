#![forbid(unsafe_code)]

//! Structured teardown for listeners and bindings.
//!
//! Bindings live until they are explicitly unbound or disposed. A
//! [`BindingScope`] collects the teardown of everything created through it,
//! so a logical owner (a widget, a view model) can release all of its
//! reactive wiring at once.
//!
//! ```ignore
//! let mut scope = BindingScope::new();
//! scope.listen(&model.title, InvalidationListener::new(|_| redraw()));
//! scope.bind(&label.text, &model.title)?;
//! scope.bind_bidirectional(&slider.value, &model.volume)?;
//! drop(scope); // every listener removed, every binding undone
//! ```
//!
//! # Invariants
//!
//! 1. Teardown runs in reverse registration order.
//! 2. After drop (or [`clear`](BindingScope::clear)), no listener registered
//!    through the scope fires again.
//! 3. Teardown of an observable that was already dropped is a no-op.

use std::fmt;

use crate::binding::Binding;
use crate::error::{BindingError, PropertyError};
use crate::listener::{ChangeListener, InvalidationListener};
use crate::observable::{Observable, ObservableValue};
use crate::property::Property;

/// RAII guard that runs a teardown action when dropped.
#[must_use = "dropping a Subscription immediately undoes it"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// A guard running `release` on drop.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Register `listener` on `observable`; dropping the guard removes it.
    pub fn listener<O>(observable: &O, listener: InvalidationListener) -> Self
    where
        O: Observable + Clone + 'static,
    {
        observable.add_listener(listener.clone());
        let observable = observable.clone();
        Self::new(move || observable.remove_listener(&listener))
    }

    /// Register a change listener; dropping the guard removes it.
    pub fn change_listener<T, O>(observable: &O, listener: ChangeListener<T>) -> Self
    where
        T: 'static,
        O: ObservableValue<T> + Clone + 'static,
    {
        observable.add_change_listener(listener.clone());
        let observable = observable.clone();
        Self::new(move || observable.remove_change_listener(&listener))
    }

    /// Keep the registration forever.
    pub fn forget(mut self) {
        self.release = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// Collects teardown for a logical owner.
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold an existing subscription.
    pub fn hold(&mut self, subscription: Subscription) -> &mut Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Register an invalidation listener for the lifetime of the scope.
    pub fn listen<O>(&mut self, observable: &O, listener: InvalidationListener) -> &mut Self
    where
        O: Observable + Clone + 'static,
    {
        self.hold(Subscription::listener(observable, listener))
    }

    /// Register a change listener for the lifetime of the scope.
    pub fn on_change<T, O>(&mut self, observable: &O, listener: ChangeListener<T>) -> &mut Self
    where
        T: 'static,
        O: ObservableValue<T> + Clone + 'static,
    {
        self.hold(Subscription::change_listener(observable, listener))
    }

    /// Bind `target` to `source`; the scope unbinds it on teardown.
    ///
    /// # Errors
    ///
    /// See [`Property::bind`].
    pub fn bind<T, O>(
        &mut self,
        target: &Property<T>,
        source: &O,
    ) -> Result<&mut Self, PropertyError>
    where
        T: Clone + PartialEq + 'static,
        O: ObservableValue<T> + Clone + 'static,
    {
        target.bind(source)?;
        let target = target.downgrade();
        Ok(self.hold(Subscription::new(move || {
            if let Some(target) = target.upgrade() {
                target.unbind();
            }
        })))
    }

    /// Bind two properties bidirectionally; the scope disposes the binding on
    /// teardown.
    ///
    /// # Errors
    ///
    /// See [`BidirectionalBinding::bind`](crate::BidirectionalBinding::bind).
    pub fn bind_bidirectional<T>(
        &mut self,
        p1: &Property<T>,
        p2: &Property<T>,
    ) -> Result<&mut Self, BindingError>
    where
        T: Clone + PartialEq + 'static,
    {
        let binding = p1.bind_bidirectional(p2)?;
        Ok(self.hold(Subscription::new(move || binding.dispose())))
    }

    /// Adopt a derived binding; the scope disposes it on teardown.
    pub fn adopt<T: Clone + PartialEq + 'static>(&mut self, binding: &Binding<T>) -> &mut Self {
        let binding = binding.clone();
        self.hold(Subscription::new(move || binding.dispose()))
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Tear everything down now, newest first. The scope stays usable.
    pub fn clear(&mut self) {
        while let Some(subscription) = self.subscriptions.pop() {
            drop(subscription);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::dependency;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn listeners_removed_on_drop() {
        let p = Property::new(0);
        let fired = Rc::new(Cell::new(0));
        {
            let mut scope = BindingScope::new();
            let f = Rc::clone(&fired);
            scope.listen(&p, InvalidationListener::new(move |_| f.set(f.get() + 1)));
            scope.on_change(&p, ChangeListener::new(|_: &i32, _: &i32| {}));
            assert_eq!(scope.binding_count(), 2);
            p.set(1).unwrap();
        }
        p.set(2).unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(p.listener_count(), 0);
    }

    #[test]
    fn bindings_undone_on_clear() {
        let source = Property::new(1);
        let target = Property::new(0);
        let a = Property::new(0);
        let mut scope = BindingScope::new();
        scope.bind(&target, &source).unwrap();
        scope.bind_bidirectional(&a, &source).unwrap();
        assert!(target.is_bound());
        assert_eq!(a.get(), 1);

        scope.clear();
        assert!(scope.is_empty());
        assert!(!target.is_bound());
        assert_eq!(a.listener_count(), 0);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn adopted_binding_disposed() {
        let p = Property::new(2);
        let doubled = {
            let deps = [dependency(&p)];
            let p = p.clone();
            Binding::new(move || p.get() * 2, deps)
        };
        let mut scope = BindingScope::new();
        scope.adopt(&doubled);
        drop(scope);
        assert_eq!(p.listener_count(), 0);
        assert!(doubled.dependencies().is_empty());
    }

    #[test]
    fn teardown_is_reverse_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut scope = BindingScope::new();
        for i in 0..3 {
            let order = Rc::clone(&order);
            scope.hold(Subscription::new(move || order.borrow_mut().push(i)));
        }
        drop(scope);
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn forget_keeps_listener() {
        let p = Property::new(0);
        Subscription::listener(&p, InvalidationListener::new(|_| {})).forget();
        assert_eq!(p.listener_count(), 1);
    }

    #[test]
    fn teardown_after_target_dropped_is_noop() {
        let source = Property::new(1);
        let mut scope = BindingScope::new();
        {
            let target = Property::new(0);
            scope.bind(&target, &source).unwrap();
        }
        drop(scope);
        assert_eq!(source.listener_count(), 0);
    }
}
