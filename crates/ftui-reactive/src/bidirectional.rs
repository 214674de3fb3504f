#![forbid(unsafe_code)]

//! Two properties kept synchronized in both directions.
//!
//! ```text
//!            bind(p1, p2)                 unbind(p1, p2)
//! Unbound ───────────────────▶ Bound ───────────────────▶ Unbound
//!            p1 := p2                      listeners removed
//!            listeners on both
//! ```
//!
//! A change of either property is written through to the other. A shared
//! `updating` flag is raised around each write-through; the peer's listener
//! sees the flag and does nothing, so there is no A→B→A recursion.
//!
//! # Invariants
//!
//! 1. Bindings are keyed by the *unordered* pair of properties:
//!    `bind(a, b) == bind(b, a)` and both hash identically.
//! 2. `unbind(a, b)` removes the listeners installed by `bind(a, b)` or
//!    `bind(b, a)`.
//! 3. The binding holds both properties weakly. When one is dropped, the
//!    listener on the survivor removes itself the next time it fires.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `MissingEndpoint` | An endpoint is `None` | No state change |
//! | `SelfBinding` | `p1` and `p2` are the same property | No state change |
//! | Write-through rejected | Peer is unidirectionally bound | Origin restored to its previous value, fault reported |
//! | Restore rejected | Origin is bound as well | Binding removed from both properties, fault reported |
//! | Conversion failed | Converter returned `Err` | Peer left unchanged, fault reported |

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::BindingError;
use crate::fault::{ListenerError, ListenerResult};
use crate::listener::{ChangeListener, ListenerTag};
use crate::observable::{Observable, ObservableValue};
use crate::property::{Property, WeakProperty};
use crate::storage;

const SAME_TYPE: &str = "bidirectional";
const CONVERTED: &str = "bidirectional-converted";

type Converter<S, D> = dyn Fn(&S) -> Result<D, ListenerError>;

/// Raises the shared `updating` flag for the duration of a write-through.
struct Updating<'a>(&'a Cell<bool>);

impl<'a> Updating<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for Updating<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn probe<S: 'static>(tag: ListenerTag) -> ChangeListener<S> {
    ChangeListener::new(|_, _| {}).with_tag(tag)
}

fn sync_listener<S, D>(
    tag: ListenerTag,
    updating: Rc<Cell<bool>>,
    origin: WeakProperty<S>,
    peer: WeakProperty<D>,
    convert: Rc<Converter<S, D>>,
) -> ChangeListener<S>
where
    S: Clone + PartialEq + 'static,
    D: Clone + PartialEq + 'static,
{
    ChangeListener::try_new(move |old: &S, new: &S| -> ListenerResult {
        if updating.get() {
            return Ok(());
        }
        let Some(origin) = origin.upgrade() else {
            return Ok(());
        };
        let Some(peer) = peer.upgrade() else {
            origin.remove_change_listener(&probe::<S>(tag));
            tracing::trace!(property = ?origin.name(), "bidirectional peer dropped; detached");
            return Ok(());
        };

        let value = convert(new)?;
        let _guard = Updating::enter(&updating);
        match peer.set_reporting(value) {
            Ok(report) => storage::propagate(report, "bidirectional write-through faulted"),
            Err(err) => {
                tracing::warn!(
                    property = ?origin.name(),
                    peer = ?peer.name(),
                    error = %err,
                    "bidirectional write-through failed; restoring previous value"
                );
                match origin.set(old.clone()) {
                    Ok(()) => Err(ListenerError::new(format!(
                        "bidirectional binding failed, setting to the previous value: {err}"
                    ))),
                    Err(restore) => {
                        origin.remove_change_listener(&probe::<S>(tag));
                        peer.remove_change_listener(&probe::<D>(tag));
                        Err(ListenerError::new(format!(
                            "bidirectional binding failed together with an attempt to restore \
                             the previous value; binding removed: {err}; {restore}"
                        )))
                    }
                }
            }
        }
    })
    .with_tag(tag)
}

fn endpoints<'a, A, B>(
    p1: Option<&'a Property<A>>,
    p2: Option<&'a Property<B>>,
) -> Result<(&'a Property<A>, &'a Property<B>), BindingError>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    let (Some(p1), Some(p2)) = (p1, p2) else {
        return Err(BindingError::MissingEndpoint);
    };
    if p1.observable_id() == p2.observable_id() {
        return Err(BindingError::SelfBinding);
    }
    Ok((p1, p2))
}

/// A live bidirectional link between two properties.
///
/// Dropping the handle does not unbind; call [`unbind`](Self::unbind) or
/// [`dispose`](Self::dispose). `B` differs from `A` only for converting
/// bindings built with [`bind_converted`](Self::bind_converted).
pub struct BidirectionalBinding<A, B = A> {
    first: WeakProperty<A>,
    second: WeakProperty<B>,
    tag: ListenerTag,
}

impl<T: Clone + PartialEq + 'static> BidirectionalBinding<T, T> {
    /// Bind `p1` and `p2`. `p1` takes `p2`'s value first.
    ///
    /// # Errors
    ///
    /// - [`BindingError::MissingEndpoint`] if either endpoint is `None`.
    /// - [`BindingError::SelfBinding`] if both are the same property.
    /// - [`BindingError::Property`] if `p1` rejects the initial value.
    pub fn bind<'a>(
        p1: impl Into<Option<&'a Property<T>>>,
        p2: impl Into<Option<&'a Property<T>>>,
    ) -> Result<Self, BindingError> {
        let (p1, p2) = endpoints(p1.into(), p2.into())?;
        let identity: Rc<Converter<T, T>> =
            Rc::new(|value: &T| Ok::<T, ListenerError>(value.clone()));
        Self::install(SAME_TYPE, p1, p2, Rc::clone(&identity), identity, |value| Ok(value))
    }

    /// Remove the binding between `p1` and `p2`, in either order.
    ///
    /// # Errors
    ///
    /// The same endpoint validation as [`bind`](Self::bind).
    pub fn unbind<'a>(
        p1: impl Into<Option<&'a Property<T>>>,
        p2: impl Into<Option<&'a Property<T>>>,
    ) -> Result<(), BindingError> {
        let (p1, p2) = endpoints(p1.into(), p2.into())?;
        Self::detach(SAME_TYPE, p1, p2);
        Ok(())
    }
}

impl<A, B> BidirectionalBinding<A, B>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    /// Bind properties of different types through a pair of converters.
    ///
    /// `p1` takes `to_first(p2)` first. A failed conversion leaves the target
    /// unchanged and is reported as a fault of the property that changed.
    ///
    /// # Errors
    ///
    /// Endpoint validation as for [`bind`](BidirectionalBinding::bind),
    /// plus [`BindingError::Conversion`] if the initial conversion fails.
    pub fn bind_converted<'a>(
        p1: impl Into<Option<&'a Property<A>>>,
        p2: impl Into<Option<&'a Property<B>>>,
        to_first: impl Fn(&B) -> Result<A, ListenerError> + 'static,
        to_second: impl Fn(&A) -> Result<B, ListenerError> + 'static,
    ) -> Result<Self, BindingError> {
        let (p1, p2) = endpoints(p1.into(), p2.into())?;
        let to_first: Rc<Converter<B, A>> = Rc::new(to_first);
        let to_second: Rc<Converter<A, B>> = Rc::new(to_second);
        Self::install(CONVERTED, p1, p2, to_second, Rc::clone(&to_first), move |value| {
            to_first(&value)
        })
    }

    /// Remove a converting binding between `p1` and `p2`.
    ///
    /// # Errors
    ///
    /// The same endpoint validation as [`bind_converted`](Self::bind_converted).
    pub fn unbind_converted<'a>(
        p1: impl Into<Option<&'a Property<A>>>,
        p2: impl Into<Option<&'a Property<B>>>,
    ) -> Result<(), BindingError> {
        let (p1, p2) = endpoints(p1.into(), p2.into())?;
        Self::detach(CONVERTED, p1, p2);
        Ok(())
    }

    fn install(
        scope: &'static str,
        p1: &Property<A>,
        p2: &Property<B>,
        to_second: Rc<Converter<A, B>>,
        to_first: Rc<Converter<B, A>>,
        initial: impl FnOnce(B) -> Result<A, ListenerError>,
    ) -> Result<Self, BindingError> {
        let first_value =
            initial(p2.get()).map_err(|err| BindingError::Conversion(err.to_string()))?;
        p1.set(first_value)?;

        let tag = ListenerTag::pair(scope, p1.observable_id(), p2.observable_id());
        let updating = Rc::new(Cell::new(false));
        p1.add_change_listener(sync_listener(
            tag,
            Rc::clone(&updating),
            p1.downgrade(),
            p2.downgrade(),
            to_second,
        ));
        p2.add_change_listener(sync_listener(
            tag,
            updating,
            p2.downgrade(),
            p1.downgrade(),
            to_first,
        ));
        tracing::trace!(first = ?p1.name(), second = ?p2.name(), scope, "bidirectional bound");

        Ok(Self {
            first: p1.downgrade(),
            second: p2.downgrade(),
            tag,
        })
    }

    fn detach(scope: &'static str, p1: &Property<A>, p2: &Property<B>) {
        let tag = ListenerTag::pair(scope, p1.observable_id(), p2.observable_id());
        p1.remove_change_listener(&probe::<A>(tag));
        p2.remove_change_listener(&probe::<B>(tag));
        tracing::trace!(first = ?p1.name(), second = ?p2.name(), scope, "bidirectional unbound");
    }

    /// Remove this binding from whichever endpoints are still alive.
    pub fn dispose(&self) {
        if let Some(first) = self.first.upgrade() {
            first.remove_change_listener(&probe::<A>(self.tag));
        }
        if let Some(second) = self.second.upgrade() {
            second.remove_change_listener(&probe::<B>(self.tag));
        }
    }

    /// The first endpoint, if it is still alive.
    #[must_use]
    pub fn first(&self) -> Option<Property<A>> {
        self.first.upgrade()
    }

    /// The second endpoint, if it is still alive.
    #[must_use]
    pub fn second(&self) -> Option<Property<B>> {
        self.second.upgrade()
    }
}

impl<A, B> PartialEq for BidirectionalBinding<A, B> {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl<A, B> Eq for BidirectionalBinding<A, B> {}

impl<A, B> Hash for BidirectionalBinding<A, B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
    }
}

impl<A, B> fmt::Debug for BidirectionalBinding<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = self.tag.ids();
        f.debug_struct("BidirectionalBinding")
            .field("scope", &self.tag.scope())
            .field("pair", &(lo, hi))
            .finish()
    }
}
