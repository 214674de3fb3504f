#![forbid(unsafe_code)]

//! Factory functions for derived bindings.
//!
//! Every function takes [`IntoOperand`] arguments, so properties, bindings,
//! and plain constants mix freely:
//!
//! ```ignore
//! let width = Property::new(3);
//! let total = bindings::add(&width, 2.5);      // Binding<f64>
//! let wide = bindings::greater_than(&width, 10); // Binding<bool>
//! let label = bindings::concat(["w=".into(), StringPart::observe(&width)]);
//! ```
//!
//! Constants are captured once; observable operands are read on every
//! recomputation and become dependencies of the returned binding.

use std::cmp::Ordering;
use std::fmt::Display;
use std::rc::Rc;

use crate::bidirectional::BidirectionalBinding;
use crate::binding::Binding;
use crate::error::BindingError;
use crate::numeric::{Comparable, Equatable, Numeric, Promote, promoted};
use crate::observable::{Observable, ObservableValue};
use crate::operand::{IntoOperand, Operand};
use crate::property::Property;

fn unary<A, R>(a: Operand<A>, f: impl Fn(A) -> R + 'static) -> Binding<R>
where
    A: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    let dependencies: Vec<_> = a.dependency().into_iter().collect();
    Binding::new(move || f(a.get()), dependencies)
}

fn binary<A, B, R>(a: Operand<A>, b: Operand<B>, f: impl Fn(A, B) -> R + 'static) -> Binding<R>
where
    A: Clone + 'static,
    B: Clone + 'static,
    R: Clone + PartialEq + 'static,
{
    let dependencies: Vec<_> = [a.dependency(), b.dependency()]
        .into_iter()
        .flatten()
        .collect();
    Binding::new(move || f(a.get(), b.get()), dependencies)
}

/// Promoted result type of an arithmetic binding over `A` and `B`.
pub type Promoted<A, B> = <A as Promote<B>>::Output;

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// `a + b` in the promoted type.
pub fn add<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<Promoted<A, B>>
where
    A: Promote<B>,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| {
        promoted(x, y, |x, y| x.plus(y))
    })
}

/// `a - b` in the promoted type.
pub fn subtract<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<Promoted<A, B>>
where
    A: Promote<B>,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| {
        promoted(x, y, |x, y| x.minus(y))
    })
}

/// `a * b` in the promoted type.
pub fn multiply<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<Promoted<A, B>>
where
    A: Promote<B>,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| {
        promoted(x, y, |x, y| x.times(y))
    })
}

/// `a / b` in the promoted type. Integer division by zero yields `0`.
pub fn divide<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<Promoted<A, B>>
where
    A: Promote<B>,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| {
        promoted(x, y, |x, y| x.divided_by(y))
    })
}

/// `-a`.
pub fn negate<A: Numeric>(a: impl IntoOperand<A>) -> Binding<A> {
    unary(a.into_operand(), Numeric::negated)
}

/// The smaller operand, in the promoted type.
pub fn min<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<Promoted<A, B>>
where
    A: Promote<B>,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| {
        promoted(x, y, |x, y| if y < x { y } else { x })
    })
}

/// The larger operand, in the promoted type.
pub fn max<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<Promoted<A, B>>
where
    A: Promote<B>,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| {
        promoted(x, y, |x, y| if y > x { y } else { x })
    })
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// `a == b`.
pub fn equal<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<bool>
where
    A: Equatable<B> + Clone + 'static,
    B: Clone + 'static,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| x.equals(&y))
}

/// `a != b`.
pub fn not_equal<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<bool>
where
    A: Equatable<B> + Clone + 'static,
    B: Clone + 'static,
{
    binary(a.into_operand(), b.into_operand(), |x: A, y: B| !x.equals(&y))
}

/// `|a - b| <= epsilon`, compared as `f64`.
pub fn equal_within<A, B>(
    a: impl IntoOperand<A>,
    b: impl IntoOperand<B>,
    epsilon: f64,
) -> Binding<bool>
where
    A: Numeric,
    B: Numeric,
{
    binary(a.into_operand(), b.into_operand(), move |x: A, y: B| {
        (x.to_f64() - y.to_f64()).abs() <= epsilon
    })
}

fn ordering<A, B>(
    a: impl IntoOperand<A>,
    b: impl IntoOperand<B>,
    accept: fn(Ordering) -> bool,
) -> Binding<bool>
where
    A: Comparable<B> + Clone + 'static,
    B: Clone + 'static,
{
    binary(a.into_operand(), b.into_operand(), move |x: A, y: B| {
        x.compare(&y).is_some_and(accept)
    })
}

/// `a > b`.
pub fn greater_than<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<bool>
where
    A: Comparable<B> + Clone + 'static,
    B: Clone + 'static,
{
    ordering(a, b, Ordering::is_gt)
}

/// `a >= b`.
pub fn greater_than_or_equal<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<bool>
where
    A: Comparable<B> + Clone + 'static,
    B: Clone + 'static,
{
    ordering(a, b, Ordering::is_ge)
}

/// `a < b`.
pub fn less_than<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<bool>
where
    A: Comparable<B> + Clone + 'static,
    B: Clone + 'static,
{
    ordering(a, b, Ordering::is_lt)
}

/// `a <= b`.
pub fn less_than_or_equal<A, B>(a: impl IntoOperand<A>, b: impl IntoOperand<B>) -> Binding<bool>
where
    A: Comparable<B> + Clone + 'static,
    B: Clone + 'static,
{
    ordering(a, b, Ordering::is_le)
}

// ---------------------------------------------------------------------------
// Boolean
// ---------------------------------------------------------------------------

/// `a && b`. `b` is not read when `a` is false.
pub fn and(a: impl IntoOperand<bool>, b: impl IntoOperand<bool>) -> Binding<bool> {
    let (a, b) = (a.into_operand(), b.into_operand());
    let dependencies: Vec<_> = [a.dependency(), b.dependency()]
        .into_iter()
        .flatten()
        .collect();
    Binding::new(move || a.get() && b.get(), dependencies)
}

/// `a || b`. `b` is not read when `a` is true.
pub fn or(a: impl IntoOperand<bool>, b: impl IntoOperand<bool>) -> Binding<bool> {
    let (a, b) = (a.into_operand(), b.into_operand());
    let dependencies: Vec<_> = [a.dependency(), b.dependency()]
        .into_iter()
        .flatten()
        .collect();
    Binding::new(move || a.get() || b.get(), dependencies)
}

/// `!a`.
pub fn not(a: impl IntoOperand<bool>) -> Binding<bool> {
    unary(a.into_operand(), |x: bool| !x)
}

// ---------------------------------------------------------------------------
// Strings and objects
// ---------------------------------------------------------------------------

/// One piece of a [`concat`] binding.
#[derive(Clone)]
pub enum StringPart {
    /// Text fixed when the part was built.
    Frozen(String),
    /// Text read from an observable on every recomputation.
    Live {
        read: Rc<dyn Fn() -> String>,
        dependency: Rc<dyn Observable>,
    },
}

impl StringPart {
    /// Freeze `value` to its string form now.
    pub fn value(value: impl Display) -> Self {
        Self::Frozen(value.to_string())
    }

    /// Read `observable`'s string form on every recomputation.
    pub fn observe<V, O>(observable: &O) -> Self
    where
        V: Display,
        O: ObservableValue<V> + Clone + 'static,
    {
        let shared = Rc::new(observable.clone());
        let source = Rc::clone(&shared);
        Self::Live {
            read: Rc::new(move || source.get().to_string()),
            dependency: shared,
        }
    }

    fn read(&self) -> String {
        match self {
            Self::Frozen(text) => text.clone(),
            Self::Live { read, .. } => read(),
        }
    }
}

impl From<&str> for StringPart {
    fn from(text: &str) -> Self {
        Self::Frozen(text.to_owned())
    }
}

impl From<String> for StringPart {
    fn from(text: String) -> Self {
        Self::Frozen(text)
    }
}

impl<V: Clone + PartialEq + Display + 'static> From<&Property<V>> for StringPart {
    fn from(property: &Property<V>) -> Self {
        Self::observe(property)
    }
}

impl<V: Clone + PartialEq + Display + 'static> From<&Binding<V>> for StringPart {
    fn from(binding: &Binding<V>) -> Self {
        Self::observe(binding)
    }
}

impl std::fmt::Debug for StringPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frozen(text) => f.debug_tuple("Frozen").field(text).finish(),
            Self::Live { dependency, .. } => f
                .debug_tuple("Live")
                .field(&dependency.observable_id())
                .finish(),
        }
    }
}

/// Concatenate string parts.
pub fn concat(parts: impl IntoIterator<Item = StringPart>) -> Binding<String> {
    let parts: Vec<StringPart> = parts.into_iter().collect();
    let dependencies: Vec<Rc<dyn Observable>> = parts
        .iter()
        .filter_map(|part| match part {
            StringPart::Live { dependency, .. } => Some(Rc::clone(dependency)),
            StringPart::Frozen(_) => None,
        })
        .collect();
    Binding::new(
        move || parts.iter().map(StringPart::read).collect::<String>(),
        dependencies,
    )
}

/// The string form of `a`.
pub fn convert<A>(a: impl IntoOperand<A>) -> Binding<String>
where
    A: Display + Clone + 'static,
{
    unary(a.into_operand(), |x: A| x.to_string())
}

/// Whether `a` is `None`.
pub fn is_null<V: Clone + 'static>(a: impl IntoOperand<Option<V>>) -> Binding<bool> {
    unary(a.into_operand(), |x: Option<V>| x.is_none())
}

/// Whether `a` is `Some`.
pub fn is_not_null<V: Clone + 'static>(a: impl IntoOperand<Option<V>>) -> Binding<bool> {
    unary(a.into_operand(), |x: Option<V>| x.is_some())
}

/// Number of characters in `a`.
pub fn length(a: impl IntoOperand<String>) -> Binding<i32> {
    unary(a.into_operand(), |x: String| {
        i32::try_from(x.chars().count()).unwrap_or(i32::MAX)
    })
}

/// Whether `a` is the empty string.
pub fn is_empty(a: impl IntoOperand<String>) -> Binding<bool> {
    unary(a.into_operand(), |x: String| x.is_empty())
}

/// Whether `a` is a non-empty string.
pub fn is_not_empty(a: impl IntoOperand<String>) -> Binding<bool> {
    unary(a.into_operand(), |x: String| !x.is_empty())
}

/// Case-insensitive string equality.
pub fn equal_ignore_case(
    a: impl IntoOperand<String>,
    b: impl IntoOperand<String>,
) -> Binding<bool> {
    binary(a.into_operand(), b.into_operand(), |x: String, y: String| {
        x.to_lowercase() == y.to_lowercase()
    })
}

// ---------------------------------------------------------------------------
// Conditional
// ---------------------------------------------------------------------------

/// Start a conditional binding: `when(c).then(a).otherwise(b)`.
pub fn when(condition: impl IntoOperand<bool>) -> When {
    When {
        condition: condition.into_operand(),
    }
}

/// A condition awaiting its `then` branch.
#[derive(Debug, Clone)]
pub struct When {
    condition: Operand<bool>,
}

impl When {
    /// The value when the condition holds.
    pub fn then<T: Clone + 'static>(self, value: impl IntoOperand<T>) -> Then<T> {
        Then {
            condition: self.condition,
            then: value.into_operand(),
        }
    }
}

/// A condition and its `then` branch, awaiting `otherwise`.
pub struct Then<T> {
    condition: Operand<bool>,
    then: Operand<T>,
}

impl<T: Clone + PartialEq + 'static> Then<T> {
    /// The value when the condition does not hold. Only the selected branch
    /// is read on recomputation.
    pub fn otherwise(self, value: impl IntoOperand<T>) -> Binding<T> {
        let otherwise = value.into_operand();
        let Then { condition, then } = self;
        let dependencies: Vec<_> = [
            condition.dependency(),
            then.dependency(),
            otherwise.dependency(),
        ]
        .into_iter()
        .flatten()
        .collect();
        Binding::new(
            move || {
                if condition.get() {
                    then.get()
                } else {
                    otherwise.get()
                }
            },
            dependencies,
        )
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

/// A binding over an arbitrary compute function.
pub fn create_binding<T: Clone + PartialEq + 'static>(
    compute: impl Fn() -> T + 'static,
    dependencies: impl IntoIterator<Item = Rc<dyn Observable>>,
) -> Binding<T> {
    Binding::new(compute, dependencies)
}

/// Keep `p1` and `p2` synchronized in both directions.
///
/// # Errors
///
/// See [`BidirectionalBinding::bind`].
pub fn bind_bidirectional<T: Clone + PartialEq + 'static>(
    p1: &Property<T>,
    p2: &Property<T>,
) -> Result<BidirectionalBinding<T>, BindingError> {
    BidirectionalBinding::bind(p1, p2)
}

/// Remove the bidirectional binding between `p1` and `p2`.
///
/// # Errors
///
/// See [`BidirectionalBinding::unbind`].
pub fn unbind_bidirectional<T: Clone + PartialEq + 'static>(
    p1: &Property<T>,
    p2: &Property<T>,
) -> Result<(), BindingError> {
    BidirectionalBinding::unbind(p1, p2)
}
