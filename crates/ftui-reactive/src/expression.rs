#![forbid(unsafe_code)]

//! Fluent expression methods on observable values.
//!
//! Each trait is implemented for every `ObservableValue` handle of a matching
//! value type and forwards to the [`bindings`](crate::bindings) factory with
//! `self` as the first operand:
//!
//! ```ignore
//! let width = Property::new(3);
//! let height = Property::new(4);
//! let area = width.multiply(&height);
//! let big = area.greater_than(10);
//! let label = Property::new("size".to_string()).concat(": ").concat(&area);
//! ```

use std::fmt::Display;

use crate::binding::Binding;
use crate::bindings::{self, Promoted, StringPart};
use crate::numeric::{Comparable, Equatable, Numeric, Promote};
use crate::observable::ObservableValue;
use crate::operand::{IntoOperand, Operand};

/// Methods available on every observable value.
pub trait ObjectExpression<T>: ObservableValue<T> + Clone + 'static
where
    T: Clone + PartialEq + 'static,
{
    /// `self == other`.
    fn is_equal_to<B>(&self, other: impl IntoOperand<B>) -> Binding<bool>
    where
        T: Equatable<B>,
        B: Clone + 'static,
    {
        bindings::equal(Operand::observe(self), other)
    }

    /// `self != other`.
    fn is_not_equal_to<B>(&self, other: impl IntoOperand<B>) -> Binding<bool>
    where
        T: Equatable<B>,
        B: Clone + 'static,
    {
        bindings::not_equal(Operand::observe(self), other)
    }

    /// The string form of the value.
    fn as_string(&self) -> Binding<String>
    where
        T: Display,
    {
        bindings::convert(Operand::observe(self))
    }
}

impl<T, O> ObjectExpression<T> for O
where
    T: Clone + PartialEq + 'static,
    O: ObservableValue<T> + Clone + 'static,
{
}

/// Null checks on optional values.
pub trait NullableExpression<V>: ObservableValue<Option<V>> + Clone + 'static
where
    V: Clone + PartialEq + 'static,
{
    /// Whether the value is `None`.
    fn is_null(&self) -> Binding<bool> {
        bindings::is_null(Operand::observe(self))
    }

    /// Whether the value is `Some`.
    fn is_not_null(&self) -> Binding<bool> {
        bindings::is_not_null(Operand::observe(self))
    }
}

impl<V, O> NullableExpression<V> for O
where
    V: Clone + PartialEq + 'static,
    O: ObservableValue<Option<V>> + Clone + 'static,
{
}

/// Arithmetic and ordering on numeric values.
pub trait NumberExpressionBase<T: Numeric>: ObservableValue<T> + Clone + 'static {
    /// `self + other` in the promoted type.
    fn add<B: Numeric>(&self, other: impl IntoOperand<B>) -> Binding<Promoted<T, B>>
    where
        T: Promote<B>,
    {
        bindings::add(Operand::observe(self), other)
    }

    /// `self - other` in the promoted type.
    fn subtract<B: Numeric>(&self, other: impl IntoOperand<B>) -> Binding<Promoted<T, B>>
    where
        T: Promote<B>,
    {
        bindings::subtract(Operand::observe(self), other)
    }

    /// `self * other` in the promoted type.
    fn multiply<B: Numeric>(&self, other: impl IntoOperand<B>) -> Binding<Promoted<T, B>>
    where
        T: Promote<B>,
    {
        bindings::multiply(Operand::observe(self), other)
    }

    /// `self / other` in the promoted type.
    fn divide<B: Numeric>(&self, other: impl IntoOperand<B>) -> Binding<Promoted<T, B>>
    where
        T: Promote<B>,
    {
        bindings::divide(Operand::observe(self), other)
    }

    /// `-self`.
    fn negate(&self) -> Binding<T> {
        bindings::negate(Operand::observe(self))
    }

    /// `self > other`.
    fn greater_than<B: Clone + 'static>(&self, other: impl IntoOperand<B>) -> Binding<bool>
    where
        T: Comparable<B>,
    {
        bindings::greater_than(Operand::observe(self), other)
    }

    /// `self >= other`.
    fn greater_than_or_equal_to<B: Clone + 'static>(
        &self,
        other: impl IntoOperand<B>,
    ) -> Binding<bool>
    where
        T: Comparable<B>,
    {
        bindings::greater_than_or_equal(Operand::observe(self), other)
    }

    /// `self < other`.
    fn less_than<B: Clone + 'static>(&self, other: impl IntoOperand<B>) -> Binding<bool>
    where
        T: Comparable<B>,
    {
        bindings::less_than(Operand::observe(self), other)
    }

    /// `self <= other`.
    fn less_than_or_equal_to<B: Clone + 'static>(&self, other: impl IntoOperand<B>) -> Binding<bool>
    where
        T: Comparable<B>,
    {
        bindings::less_than_or_equal(Operand::observe(self), other)
    }

    /// `|self - other| <= epsilon`.
    fn is_equal_within<B: Numeric>(
        &self,
        other: impl IntoOperand<B>,
        epsilon: f64,
    ) -> Binding<bool> {
        bindings::equal_within(Operand::observe(self), other, epsilon)
    }
}

impl<T, O> NumberExpressionBase<T> for O
where
    T: Numeric,
    O: ObservableValue<T> + Clone + 'static,
{
}

/// Boolean connectives.
pub trait BooleanExpression: ObservableValue<bool> + Clone + 'static {
    /// `self && other`. `other` is not read while `self` is `false`.
    fn and(&self, other: impl IntoOperand<bool>) -> Binding<bool> {
        bindings::and(Operand::observe(self), other)
    }

    /// `self || other`.
    fn or(&self, other: impl IntoOperand<bool>) -> Binding<bool> {
        bindings::or(Operand::observe(self), other)
    }

    /// `!self`.
    fn not(&self) -> Binding<bool> {
        bindings::not(Operand::observe(self))
    }
}

impl<O> BooleanExpression for O where O: ObservableValue<bool> + Clone + 'static {}

/// String operations.
pub trait StringExpression: ObservableValue<String> + Clone + 'static {
    /// `self` followed by `other`.
    fn concat(&self, other: impl Into<StringPart>) -> Binding<String> {
        bindings::concat([StringPart::observe(self), other.into()])
    }

    /// Length in characters.
    fn length(&self) -> Binding<i32> {
        bindings::length(Operand::observe(self))
    }

    /// Whether the string is empty.
    fn is_empty(&self) -> Binding<bool> {
        bindings::is_empty(Operand::observe(self))
    }

    /// Whether the string is non-empty.
    fn is_not_empty(&self) -> Binding<bool> {
        bindings::is_not_empty(Operand::observe(self))
    }

    /// Case-insensitive equality.
    fn is_equal_to_ignore_case(&self, other: impl IntoOperand<String>) -> Binding<bool> {
        bindings::equal_ignore_case(Operand::observe(self), other)
    }
}

impl<O> StringExpression for O where O: ObservableValue<String> + Clone + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    #[test]
    fn object_expressions() {
        let p = Property::new(3_i32);
        let eq = p.is_equal_to(3_i32);
        let ne = p.is_not_equal_to(4.0_f64);
        assert!(eq.get());
        assert!(ne.get());
        assert_eq!(p.as_string().get(), "3");
    }

    #[test]
    fn nullable_expressions() {
        let p: Property<Option<i32>> = Property::new(Some(1));
        let null = p.is_null();
        assert!(!null.get());
        p.set(None).unwrap();
        assert!(null.get());
        assert!(!p.is_not_null().get());
    }

    #[test]
    fn number_expressions_chain() {
        let width = Property::new(3_i32);
        let height = Property::new(4_i32);
        let area = width.multiply(&height);
        let big = area.greater_than(10_i32);
        assert_eq!(area.get(), 12);
        assert!(big.get());
        width.set(2).unwrap();
        assert!(!big.get());
        assert_eq!(width.add(0.5_f64).get(), 2.5);
        assert_eq!(width.negate().get(), -2);
        assert!(width.is_equal_within(2.05_f64, 0.1).get());
        assert!(width.less_than_or_equal_to(2_i64).get());
    }

    #[test]
    fn boolean_expressions() {
        let a = Property::new(true);
        let b = Property::new(false);
        assert!(!a.and(&b).get());
        assert!(a.or(&b).get());
        assert!(b.not().get());
    }

    #[test]
    fn string_expressions() {
        let name = Property::new(String::from("Ada"));
        let greeting = name.concat("!");
        assert_eq!(greeting.get(), "Ada!");
        name.set("Grace".into()).unwrap();
        assert_eq!(greeting.get(), "Grace!");
        assert_eq!(name.length().get(), 5);
        assert!(name.is_not_empty().get());
        assert!(name.is_equal_to_ignore_case("GRACE").get());
        assert!(!StringExpression::is_empty(&name).get());
    }
}
