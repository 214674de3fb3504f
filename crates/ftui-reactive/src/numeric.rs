#![forbid(unsafe_code)]

//! Numeric operand types and mixed-width promotion.
//!
//! Arithmetic bindings accept operands of different widths and compute in
//! the promoted type:
//!
//! | lhs \ rhs | `i32` | `i64` | `f32` | `f64` |
//! |-----------|-------|-------|-------|-------|
//! | `i32` | `i32` | `i64` | `f32` | `f64` |
//! | `i64` | `i64` | `i64` | `f32` | `f64` |
//! | `f32` | `f32` | `f32` | `f32` | `f64` |
//! | `f64` | `f64` | `f64` | `f64` | `f64` |
//!
//! Integer arithmetic wraps on overflow. Integer division by zero yields `0`
//! and logs a warning; float division follows IEEE 754.

use std::cmp::Ordering;
use std::fmt;

/// A number usable in arithmetic bindings.
pub trait Numeric: Copy + PartialEq + PartialOrd + fmt::Debug + 'static {
    /// Whether the type is a floating point type.
    const IS_FLOAT: bool;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;
    /// Narrow from `f64` with `as` semantics.
    fn from_f64(value: f64) -> Self;
    /// Widen to `i64` with `as` semantics.
    fn to_i64(self) -> i64;
    /// Narrow from `i64` with `as` semantics.
    fn from_i64(value: i64) -> Self;

    /// `self + rhs`, wrapping for integers.
    fn plus(self, rhs: Self) -> Self;
    /// `self - rhs`, wrapping for integers.
    fn minus(self, rhs: Self) -> Self;
    /// `self * rhs`, wrapping for integers.
    fn times(self, rhs: Self) -> Self;
    /// `self / rhs`. Integer division by zero yields `0`.
    fn divided_by(self, rhs: Self) -> Self;
    /// `-self`, wrapping for integers.
    fn negated(self) -> Self;

    /// Convert between numeric types, through `f64` when either side is a float.
    fn cast<U: Numeric>(self) -> U {
        if Self::IS_FLOAT || U::IS_FLOAT {
            U::from_f64(self.to_f64())
        } else {
            U::from_i64(self.to_i64())
        }
    }
}

macro_rules! impl_integer {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            const IS_FLOAT: bool = false;

            fn to_f64(self) -> f64 { self as f64 }
            fn from_f64(value: f64) -> Self { value as $t }
            fn to_i64(self) -> i64 { i64::from(self) }
            fn from_i64(value: i64) -> Self { value as $t }

            fn plus(self, rhs: Self) -> Self { self.wrapping_add(rhs) }
            fn minus(self, rhs: Self) -> Self { self.wrapping_sub(rhs) }
            fn times(self, rhs: Self) -> Self { self.wrapping_mul(rhs) }
            fn divided_by(self, rhs: Self) -> Self {
                if rhs == 0 {
                    tracing::warn!(dividend = self, "integer division by zero; yielding 0");
                    0
                } else {
                    self.wrapping_div(rhs)
                }
            }
            fn negated(self) -> Self { self.wrapping_neg() }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Numeric for $t {
            const IS_FLOAT: bool = true;

            fn to_f64(self) -> f64 { f64::from(self) }
            fn from_f64(value: f64) -> Self { value as $t }
            fn to_i64(self) -> i64 { self as i64 }
            fn from_i64(value: i64) -> Self { value as $t }

            fn plus(self, rhs: Self) -> Self { self + rhs }
            fn minus(self, rhs: Self) -> Self { self - rhs }
            fn times(self, rhs: Self) -> Self { self * rhs }
            fn divided_by(self, rhs: Self) -> Self { self / rhs }
            fn negated(self) -> Self { -self }
        }
    )*};
}

impl_integer!(i32, i64);
impl_float!(f32, f64);

/// The promoted type of a binary operation between `Self` and `Rhs`.
pub trait Promote<Rhs: Numeric>: Numeric {
    /// The type the operation is computed in.
    type Output: Numeric;
}

macro_rules! promote {
    ($($lhs:ty, $rhs:ty => $out:ty;)*) => {$(
        impl Promote<$rhs> for $lhs {
            type Output = $out;
        }
    )*};
}

promote! {
    i32, i32 => i32;
    i32, i64 => i64;
    i32, f32 => f32;
    i32, f64 => f64;
    i64, i32 => i64;
    i64, i64 => i64;
    i64, f32 => f32;
    i64, f64 => f64;
    f32, i32 => f32;
    f32, i64 => f32;
    f32, f32 => f32;
    f32, f64 => f64;
    f64, i32 => f64;
    f64, i64 => f64;
    f64, f32 => f64;
    f64, f64 => f64;
}

/// Run `op` on both operands promoted to their common type.
pub fn promoted<A, B, R>(a: A, b: B, op: impl FnOnce(A::Output, A::Output) -> R) -> R
where
    A: Promote<B>,
    B: Numeric,
{
    op(a.cast(), b.cast())
}

/// Equality across (possibly different) operand types.
pub trait Equatable<Rhs = Self> {
    fn equals(&self, other: &Rhs) -> bool;
}

impl<T: PartialEq> Equatable<T> for T {
    fn equals(&self, other: &T) -> bool {
        self == other
    }
}

/// Ordering across (possibly different) operand types.
pub trait Comparable<Rhs = Self> {
    fn compare(&self, other: &Rhs) -> Option<Ordering>;
}

impl<T: PartialOrd> Comparable<T> for T {
    fn compare(&self, other: &T) -> Option<Ordering> {
        self.partial_cmp(other)
    }
}

macro_rules! mixed {
    ($($lhs:ty, $rhs:ty;)*) => {$(
        impl Equatable<$rhs> for $lhs {
            fn equals(&self, other: &$rhs) -> bool {
                promoted(*self, *other, |a, b| a == b)
            }
        }

        impl Comparable<$rhs> for $lhs {
            fn compare(&self, other: &$rhs) -> Option<Ordering> {
                promoted(*self, *other, |a, b| a.partial_cmp(&b))
            }
        }
    )*};
}

mixed! {
    i32, i64;
    i32, f32;
    i32, f64;
    i64, i32;
    i64, f32;
    i64, f64;
    f32, i32;
    f32, i64;
    f32, f64;
    f64, i32;
    f64, i64;
    f64, f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output_of<A: Promote<B>, B: Numeric>(a: A, b: B) -> A::Output {
        promoted(a, b, |x, y| x.plus(y))
    }

    #[test]
    fn promotion_table() {
        let x: i32 = output_of(1_i32, 2_i32);
        let y: i64 = output_of(1_i32, 2_i64);
        let z: f32 = output_of(1_i64, 0.5_f32);
        let w: f64 = output_of(0.5_f32, 1_i32 as f64);
        assert_eq!(x, 3);
        assert_eq!(y, 3);
        assert_eq!(z, 1.5);
        assert_eq!(w, 1.5);
    }

    #[test]
    fn integer_overflow_wraps() {
        assert_eq!(i32::MAX.plus(1), i32::MIN);
        assert_eq!(i64::MIN.minus(1), i64::MAX);
        assert_eq!(i32::MIN.negated(), i32::MIN);
        assert_eq!(i32::MIN.divided_by(-1), i32::MIN);
    }

    #[test]
    fn integer_division_by_zero_is_zero() {
        assert_eq!(7_i32.divided_by(0), 0);
        assert_eq!(7_i64.divided_by(0), 0);
    }

    #[test]
    fn float_division_by_zero_is_ieee() {
        assert!(1.0_f64.divided_by(0.0).is_infinite());
        assert!(0.0_f32.divided_by(0.0).is_nan());
    }

    #[test]
    fn mixed_comparisons() {
        assert!(3_i32.equals(&3.0_f64));
        assert!(!3_i64.equals(&3.5_f32));
        assert_eq!(2_i32.compare(&2.5_f64), Some(Ordering::Less));
        assert_eq!(5_i64.compare(&4_i32), Some(Ordering::Greater));
        assert_eq!("b".to_string().compare(&"a".to_string()), Some(Ordering::Greater));
    }

    #[test]
    fn cast_truncates_floats() {
        let n: i32 = 2.9_f64.cast();
        assert_eq!(n, 2);
        let m: f64 = 3_i64.cast();
        assert_eq!(m, 3.0);
    }
}
