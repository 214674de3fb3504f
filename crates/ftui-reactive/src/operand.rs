#![forbid(unsafe_code)]

//! Binding operands: either a constant or a live observable value.

use std::fmt;
use std::rc::Rc;

use crate::binding::Binding;
use crate::observable::{Observable, ObservableValue};
use crate::property::{Property, ReadOnlyProperty};

/// An input to a derived binding.
pub enum Operand<T> {
    /// A fixed value, captured when the binding is built.
    Constant(T),
    /// A live value. `dependency` is the same object erased to [`Observable`].
    Observable {
        value: Rc<dyn ObservableValue<T>>,
        dependency: Rc<dyn Observable>,
    },
}

impl<T: Clone> Clone for Operand<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(value.clone()),
            Self::Observable { value, dependency } => Self::Observable {
                value: Rc::clone(value),
                dependency: Rc::clone(dependency),
            },
        }
    }
}

impl<T: Clone + 'static> Operand<T> {
    /// A constant operand.
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// A live operand reading `observable`.
    pub fn observe<O: ObservableValue<T> + Clone + 'static>(observable: &O) -> Self {
        let shared = Rc::new(observable.clone());
        Self::Observable {
            value: Rc::clone(&shared) as Rc<dyn ObservableValue<T>>,
            dependency: shared,
        }
    }

    /// The operand's current value.
    pub fn get(&self) -> T {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Observable { value, .. } => value.get(),
        }
    }

    /// The observable to depend on, if the operand is live.
    pub fn dependency(&self) -> Option<Rc<dyn Observable>> {
        match self {
            Self::Constant(_) => None,
            Self::Observable { dependency, .. } => Some(Rc::clone(dependency)),
        }
    }

    /// Whether the operand is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Operand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Observable { dependency, .. } => f
                .debug_tuple("Observable")
                .field(&dependency.observable_id())
                .finish(),
        }
    }
}

/// Conversion into an [`Operand`].
pub trait IntoOperand<T> {
    fn into_operand(self) -> Operand<T>;
}

impl<T: Clone + 'static> IntoOperand<T> for Operand<T> {
    fn into_operand(self) -> Operand<T> {
        self
    }
}

impl<T: Clone + 'static> IntoOperand<T> for &Operand<T> {
    fn into_operand(self) -> Operand<T> {
        self.clone()
    }
}

macro_rules! observable_operand {
    ($($ty:ident),*) => {$(
        impl<T: Clone + PartialEq + 'static> IntoOperand<T> for $ty<T> {
            fn into_operand(self) -> Operand<T> {
                Operand::observe(&self)
            }
        }

        impl<T: Clone + PartialEq + 'static> IntoOperand<T> for &$ty<T> {
            fn into_operand(self) -> Operand<T> {
                Operand::observe(self)
            }
        }
    )*};
}

observable_operand!(Property, ReadOnlyProperty, Binding);

macro_rules! constant_operand {
    ($($ty:ty),*) => {$(
        impl IntoOperand<$ty> for $ty {
            fn into_operand(self) -> Operand<$ty> {
                Operand::Constant(self)
            }
        }
    )*};
}

constant_operand!(i32, i64, f32, f64, bool, String);

impl IntoOperand<String> for &str {
    fn into_operand(self) -> Operand<String> {
        Operand::Constant(self.to_owned())
    }
}
