#![forbid(unsafe_code)]

//! Single-threaded reactive kernel for FrankenTUI.
//!
//! - [`Property`]: a mutable observable value that can be bound to a source.
//! - [`Binding`]: a lazily recomputed value derived from other observables.
//! - [`bindings`]: factory functions (arithmetic, comparison, logic, strings,
//!   conditionals) producing [`Binding`]s from properties and constants.
//! - [`BidirectionalBinding`]: two properties kept in sync.
//! - [`BindingScope`]: structured teardown of listeners and bindings.
//!
//! # Architecture
//!
//! Every observable owns a size-adaptive [`ListenerSet`] holding both
//! invalidation and change listeners. Notification is synchronous: a mutating
//! call returns after every listener ran. Handles are `Rc`-based; listeners
//! that bindings install on their sources hold the binding weakly.
//!
//! Scalar and collection observables differ on no-op writes:
//! `Property::set` with an equal value still fires invalidation listeners,
//! while a map `put` of an equal value fires nothing.
//!
//! # Invariants
//!
//! 1. Listeners on one observable fire in registration order, invalidation
//!    listeners before change listeners.
//! 2. Change listeners fire only when the value differs from the one they
//!    saw last.
//! 3. A failing listener never prevents the remaining listeners from running;
//!    its fault is logged and retained (see [`Observable::take_faults`]).
//! 4. No internal borrow is held while user code runs, so listeners may
//!    mutate observables and add or remove listeners.

pub mod bidirectional;
pub mod binding;
pub mod bindings;
pub mod config;
pub mod error;
pub mod expression;
pub mod fault;
pub mod listener;
pub mod numeric;
pub mod observable;
pub mod operand;
pub mod property;
pub mod scope;
pub mod storage;

pub use bidirectional::BidirectionalBinding;
pub use binding::{Binding, dependency};
pub use bindings::{StringPart, When};
pub use config::ObservableConfig;
pub use error::{BindingError, PropertyError};
pub use expression::{
    BooleanExpression, NullableExpression, NumberExpressionBase, ObjectExpression,
    StringExpression,
};
pub use fault::{Dispatch, FaultLog, ListenerError, ListenerFault, ListenerKind, ListenerResult};
pub use listener::{ChangeListener, InvalidationListener, ListenerHandle, ListenerTag};
pub use numeric::{Comparable, Equatable, Numeric, Promote};
pub use observable::{
    ExpressionHelper, Observable, ObservableId, ObservableValue, ValueListeners, WritableValue,
};
pub use operand::{IntoOperand, Operand};
pub use property::{
    BooleanProperty, DoubleProperty, FloatProperty, IntegerProperty, LongProperty,
    ObjectProperty, Property, ReadOnlyProperty, StringProperty, WeakProperty,
};
pub use scope::{BindingScope, Subscription};
pub use storage::{DispatchSite, ListenerSet, ListenerSnapshot, Registration, StorageKind};
