//! Interval-tracked `f32` with a provable absolute error bound.
//!
//! Every `EFloat` carries its nominal value, a non-negative absolute error and a
//! [`NumberKind`] tag. Arithmetic accrues one rounding increment
//! `gamma(1) * (|v| + err)` per operation on ordinary values, so the interval
//! `[v - err, v + err]` always contains the real result.
//!
//! # Comparison semantics
//! `a.lt(b)` holds only when the whole interval of `a` lies below `b`.
//! `a.interval_eq(b)` is the overlap test `!a.lt(b) && !b.lt(a)` and is **not**
//! transitive: `a ~ b` and `b ~ c` does not imply `a ~ c`. For this reason
//! `EFloat` deliberately implements neither `PartialEq` nor `PartialOrd`.
//!
//! # References
//! - Pharr, Jakob, Humphreys, *Physically Based Rendering* (3rd ed.), §3.9 "Managing rounding error"
//! - Higham, *Accuracy and Stability of Numerical Algorithms* (2002), §3.1 for `gamma(n)`

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::ulp::FloatParts;

/// Unit roundoff for `f32` (half the machine epsilon).
pub const MACHINE_EPSILON: f32 = f32::EPSILON * 0.5;

/// `gamma(1)`, the relative bound of one rounded operation.
pub const GAMMA_1: f32 = MACHINE_EPSILON / (1.0 - MACHINE_EPSILON);

/// Divisors whose relative error reaches this ratio cannot be inverted.
pub const MAX_DIVISOR_RATIO: f32 = 0.999;

/// `gamma(n) = n·ε / (1 − n·ε)`: bound on the relative error of `n` chained roundings.
#[inline]
pub fn gamma(n: u32) -> f32 {
    let n = n as f32;
    n * MACHINE_EPSILON / (1.0 - n * MACHINE_EPSILON)
}

/// Distinguishes values that scale exactly from ordinary rounded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Zero or a power of two with no error; multiplying by it only shifts the exponent.
    Exact,
    /// Any other value; its error already includes its own rounding increment.
    Ordinary,
}

/// Failures of interval arithmetic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArithmeticError {
    /// Divisor nominal value is exactly zero.
    #[error("division by zero")]
    DivideByZero,
    /// Divisor error is too large relative to its value to invert.
    #[error("divisor error ratio {ratio} is at or above {MAX_DIVISOR_RATIO}")]
    LargeDivisorError {
        /// `err / |v|` of the divisor.
        ratio: f32,
    },
    /// Square root of an interval lying strictly below zero.
    #[error("square root of negative interval {value}")]
    NegativeSqrt {
        /// Nominal value of the operand.
        value: f32,
    },
}

/// An `f32` with a tracked absolute error bound.
#[derive(Debug, Clone, Copy)]
pub struct EFloat {
    value: f32,
    error: f32,
    kind: NumberKind,
}

impl EFloat {
    /// Creates a value with an explicit prior error.
    ///
    /// Ordinary values receive one additional rounding increment so that
    /// `value ± error` still contains the real number even when `value + error`
    /// lands on a rounding midpoint.
    #[inline]
    pub fn new(value: f32, error: f32, kind: NumberKind) -> Self {
        let mut out = Self { value, error, kind };
        if kind == NumberKind::Ordinary {
            out.error += out.rounding_error();
        }
        out
    }

    /// An exact zero or power of two.
    #[inline]
    pub fn exact(value: f32) -> Self {
        debug_assert!(
            is_power_of_two_or_zero(value),
            "exact EFloat must be zero or a power of two, got {value}"
        );
        Self::new(value, 0.0, NumberKind::Exact)
    }

    /// An ordinary value with no prior error (only its own rounding).
    #[inline]
    pub fn ordinary(value: f32) -> Self {
        Self::new(value, 0.0, NumberKind::Ordinary)
    }

    /// An ordinary value carrying an a-priori error, e.g. from deserialization.
    #[inline]
    pub fn with_error(value: f32, error: f32) -> Self {
        Self::new(value, error, NumberKind::Ordinary)
    }

    /// Exact zero.
    #[inline]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, NumberKind::Exact)
    }

    /// Exact one.
    #[inline]
    pub fn one() -> Self {
        Self::new(1.0, 0.0, NumberKind::Exact)
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Absolute error bound.
    #[inline]
    pub fn error(&self) -> f32 {
        self.error
    }

    #[inline]
    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        self.kind == NumberKind::Exact
    }

    /// One rounding increment at this value's magnitude.
    #[inline]
    pub fn rounding_error(&self) -> f32 {
        rounding_error(self.value, self.error)
    }

    /// Loosest upper bound, `v + err`.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.value + self.error
    }

    /// Loosest lower bound, `v - err`.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.value - self.error
    }

    /// Tightest upper bound the real value can actually reach.
    ///
    /// Ordinary values always carry one rounding increment that only guards the
    /// bound computation itself; it is removed here.
    pub fn upper_real_bound(&self) -> f32 {
        let bound = self.upper_bound();
        match self.kind {
            NumberKind::Ordinary => bound - self.rounding_error(),
            NumberKind::Exact => bound,
        }
    }

    /// Tightest lower bound the real value can actually reach.
    pub fn lower_real_bound(&self) -> f32 {
        let bound = self.lower_bound();
        match self.kind {
            NumberKind::Ordinary => bound + self.rounding_error(),
            NumberKind::Exact => bound,
        }
    }

    /// `true` when both value and error are zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.value == 0.0 && self.error == 0.0
    }

    /// Sign bit of the nominal value (`-0.0` counts as negative).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative()
    }

    /// `true` when the error swamps the value; such a divisor is rejected.
    #[inline]
    pub fn has_large_error(&self) -> bool {
        self.value.abs() * 0.99 < self.error
    }

    /// Relative error `err / |v|`, infinite for a zero value.
    #[inline]
    pub fn relative_error(&self) -> f32 {
        if self.value == 0.0 {
            f32::INFINITY
        } else {
            self.error / self.value.abs()
        }
    }

    /// Strict ordering: the whole interval of `self` lies below `other`.
    #[inline]
    pub fn lt(&self, other: &Self) -> bool {
        self.upper_bound() < other.lower_bound()
    }

    #[inline]
    pub fn gt(&self, other: &Self) -> bool {
        other.lt(self)
    }

    #[inline]
    pub fn le(&self, other: &Self) -> bool {
        !other.lt(self)
    }

    #[inline]
    pub fn ge(&self, other: &Self) -> bool {
        !self.lt(other)
    }

    /// Interval overlap. Not transitive.
    #[inline]
    pub fn interval_eq(&self, other: &Self) -> bool {
        if self.value == other.value {
            return true;
        }
        !self.lt(other) && !other.lt(self)
    }

    /// Comparison on nominal values only.
    #[inline]
    pub fn nominal_lt(&self, other: &Self) -> bool {
        self.value < other.value
    }

    pub fn abs(self) -> Self {
        Self {
            value: self.value.abs(),
            ..self
        }
    }

    pub fn checked_div(self, rhs: Self) -> Result<Self, ArithmeticError> {
        if rhs.value == 0.0 {
            return Err(ArithmeticError::DivideByZero);
        }
        let kind = combined_kind(self.kind, rhs.kind);
        let inv_abs = (1.0 / rhs.value).abs();
        let value = self.value / rhs.value;
        let mut error = match rhs.kind {
            NumberKind::Ordinary => {
                let ratio = rhs.error * inv_abs;
                if ratio >= MAX_DIVISOR_RATIO {
                    return Err(ArithmeticError::LargeDivisorError { ratio });
                }
                // err(a/b) = |1/b| · (err(a) + |a|·ratio) / (1 − ratio)
                (self.error + self.value.abs() * ratio) / (1.0 - ratio)
            }
            NumberKind::Exact => self.error,
        };
        error *= inv_abs;
        Ok(Self::new(value, error, kind))
    }

    pub fn div_assign_checked(&mut self, rhs: Self) -> Result<(), ArithmeticError> {
        *self = self.checked_div(rhs)?;
        Ok(())
    }

    pub fn sqrt(self) -> Result<Self, ArithmeticError> {
        if self.lt(&Self::zero()) {
            return Err(ArithmeticError::NegativeSqrt { value: self.value });
        }
        if self.interval_eq(&Self::zero()) {
            return Ok(self);
        }
        let value = self.value.sqrt();
        let error = self.error / (2.0 * value);
        let rounded = error != 0.0 || value * value != self.value;
        let kind = if !rounded && self.kind == NumberKind::Exact {
            NumberKind::Exact
        } else {
            NumberKind::Ordinary
        };
        Ok(Self::new(value, error, kind))
    }

    /// Cosine with first-order error propagation.
    pub fn cos(self) -> Self {
        Self::new(
            self.value.cos(),
            self.error * self.value.sin().abs(),
            NumberKind::Ordinary,
        )
    }

    /// Sine with first-order error propagation.
    pub fn sin(self) -> Self {
        Self::new(
            self.value.sin(),
            self.error * self.value.cos().abs(),
            NumberKind::Ordinary,
        )
    }
}

impl Default for EFloat {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<EFloat> for f32 {
    fn from(value: EFloat) -> Self {
        value.value
    }
}

/// One rounding increment for a value/error pair.
#[inline]
pub fn rounding_error(value: f32, error: f32) -> f32 {
    GAMMA_1 * (value.abs() + error)
}

/// Error an operand contributes to a sum: exact operands still contribute one
/// rounding increment so a sum landing on a representable boundary stays covered.
#[inline]
fn summand_error(f: &EFloat) -> f32 {
    match f.kind {
        NumberKind::Exact => rounding_error(f.value, 0.0),
        NumberKind::Ordinary => f.error,
    }
}

#[inline]
fn combined_kind(a: NumberKind, b: NumberKind) -> NumberKind {
    if a == NumberKind::Exact && b == NumberKind::Exact {
        NumberKind::Exact
    } else {
        NumberKind::Ordinary
    }
}

fn is_power_of_two_or_zero(value: f32) -> bool {
    if value == 0.0 || value.is_infinite() {
        return true;
    }
    let parts = FloatParts::new(value);
    value.is_normal() && parts.significand() == 0
}

impl Add for EFloat {
    type Output = EFloat;

    fn add(self, rhs: EFloat) -> EFloat {
        let error = summand_error(&self) + summand_error(&rhs);
        EFloat::new(self.value + rhs.value, error, NumberKind::Ordinary)
    }
}

impl Sub for EFloat {
    type Output = EFloat;

    fn sub(self, rhs: EFloat) -> EFloat {
        let error = summand_error(&self) + summand_error(&rhs);
        EFloat::new(self.value - rhs.value, error, NumberKind::Ordinary)
    }
}

impl Mul for EFloat {
    type Output = EFloat;

    fn mul(self, rhs: EFloat) -> EFloat {
        let value = self.value * rhs.value;
        let error = rhs.value.abs() * self.error
            + self.value.abs() * rhs.error
            + self.error * rhs.error;
        // Scaling by an exact power of two only moves the exponent.
        if self.is_exact() || rhs.is_exact() {
            return EFloat {
                value,
                error,
                kind: combined_kind(self.kind, rhs.kind),
            };
        }
        EFloat::new(value, error, NumberKind::Ordinary)
    }
}

impl Neg for EFloat {
    type Output = EFloat;

    fn neg(self) -> EFloat {
        EFloat {
            value: -self.value,
            ..self
        }
    }
}

impl AddAssign for EFloat {
    fn add_assign(&mut self, rhs: EFloat) {
        *self = *self + rhs;
    }
}

impl SubAssign for EFloat {
    fn sub_assign(&mut self, rhs: EFloat) {
        *self = *self - rhs;
    }
}

impl MulAssign for EFloat {
    fn mul_assign(&mut self, rhs: EFloat) {
        *self = *self * rhs;
    }
}

/// The operand whose lower bound is smallest.
pub fn e_min(a: EFloat, b: EFloat) -> EFloat {
    if b.lower_bound() < a.lower_bound() {
        b
    } else {
        a
    }
}

/// The operand whose upper bound is largest.
pub fn e_max(a: EFloat, b: EFloat) -> EFloat {
    if b.upper_bound() > a.upper_bound() {
        b
    } else {
        a
    }
}

impl fmt::Display for EFloat {
    /// Value, error in units of `gamma(1)`, and kind (`P2` exact, `N` ordinary).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            NumberKind::Exact => "P2",
            NumberKind::Ordinary => "N",
        };
        write!(f, "{:>8} {:>8} {:>3}", self.value, self.error / GAMMA_1, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ordinary_construction_adds_rounding() {
        let a = EFloat::ordinary(3.0);
        assert!(a.error() > 0.0);
        assert_eq!(a.kind(), NumberKind::Ordinary);
        let e = EFloat::exact(4.0);
        assert_eq!(e.error(), 0.0);
    }

    #[test]
    fn sum_of_exact_values_is_ordinary() {
        let s = EFloat::exact(2.0) + EFloat::exact(4.0);
        assert_eq!(s.value(), 6.0);
        assert_eq!(s.kind(), NumberKind::Ordinary);
        assert!(s.error() > 0.0);
    }

    #[test]
    fn multiply_by_exact_one_adds_nothing() {
        let a = EFloat::with_error(3.25, 1e-4);
        let p = a * EFloat::one();
        assert_eq!(p.value(), a.value());
        assert_eq!(p.error(), a.error());
        assert!(p.interval_eq(&a));
    }

    #[test]
    fn multiply_keeps_second_order_term() {
        let a = EFloat::with_error(2.0, 0.5);
        let b = EFloat::with_error(3.0, 0.25);
        let p = a * b;
        assert!(p.error() >= 3.0 * a.error() + 2.0 * b.error() + a.error() * b.error());
    }

    #[test]
    fn exact_times_exact_stays_exact() {
        let p = EFloat::exact(0.5) * EFloat::exact(8.0);
        assert_eq!(p.kind(), NumberKind::Exact);
        assert_eq!(p.value(), 4.0);
        assert_eq!(p.error(), 0.0);
    }

    #[test]
    fn divide_by_zero_fails() {
        let r = EFloat::ordinary(1.0).checked_div(EFloat::zero());
        assert!(matches!(r, Err(ArithmeticError::DivideByZero)));
    }

    #[test]
    fn divide_by_noisy_divisor_fails() {
        let divisor = EFloat::with_error(1.0, 0.9995);
        let r = EFloat::ordinary(1.0).checked_div(divisor);
        assert!(matches!(r, Err(ArithmeticError::LargeDivisorError { .. })));
    }

    #[test]
    fn divide_contains_real_quotient() {
        let q = EFloat::with_error(1.0, 1e-3)
            .checked_div(EFloat::with_error(3.0, 1e-3))
            .unwrap();
        let real = 1.0f64 / 3.0;
        assert!((q.lower_bound() as f64) <= real && real <= q.upper_bound() as f64);
    }

    #[test]
    fn exact_division_is_exact() {
        let q = EFloat::exact(1.0).checked_div(EFloat::exact(4.0)).unwrap();
        assert_eq!(q.kind(), NumberKind::Exact);
        assert_eq!(q.value(), 0.25);
    }

    #[test]
    fn sqrt_behaviour() {
        let r = EFloat::exact(4.0).sqrt().unwrap();
        assert_eq!(r.value(), 2.0);
        assert_eq!(r.kind(), NumberKind::Exact);

        let r = EFloat::ordinary(2.0).sqrt().unwrap();
        assert_eq!(r.kind(), NumberKind::Ordinary);
        assert!((r.lower_bound() as f64) <= 2f64.sqrt() && 2f64.sqrt() <= r.upper_bound() as f64);

        assert!(EFloat::zero().sqrt().unwrap().is_zero());
        assert!(matches!(
            EFloat::ordinary(-1.0).sqrt(),
            Err(ArithmeticError::NegativeSqrt { .. })
        ));
    }

    #[test]
    fn ordering_requires_disjoint_intervals() {
        let a = EFloat::with_error(1.0, 0.1);
        let b = EFloat::with_error(1.15, 0.1);
        let c = EFloat::with_error(2.0, 0.1);
        assert!(!a.lt(&b));
        assert!(a.interval_eq(&b));
        assert!(a.lt(&c));
        assert!(c.gt(&a));
        assert!(a.le(&b) && a.ge(&b));
    }

    #[test]
    fn interval_equality_is_not_transitive() {
        let a = EFloat::with_error(1.0, 0.1);
        let b = EFloat::with_error(1.15, 0.1);
        let c = EFloat::with_error(1.3, 0.1);
        assert!(a.interval_eq(&b));
        assert!(b.interval_eq(&c));
        assert!(!a.interval_eq(&c));
    }

    #[test]
    fn real_bounds_sit_inside_loose_bounds() {
        let a = EFloat::with_error(10.0, 1e-3);
        assert!(a.upper_real_bound() <= a.upper_bound());
        assert!(a.lower_real_bound() >= a.lower_bound());
        let e = EFloat::exact(8.0);
        assert_eq!(e.upper_real_bound(), e.upper_bound());
    }

    #[test]
    fn unary_helpers() {
        let a = EFloat::with_error(-3.0, 0.5);
        assert!(a.is_negative());
        assert_eq!(a.abs().value(), 3.0);
        assert_eq!((-a).value(), 3.0);
        assert_eq!((-a).error(), a.error());
        assert!(EFloat::with_error(1.0, 2.0).has_large_error());
        assert!(!EFloat::ordinary(1.0).has_large_error());
        assert_eq!(e_min(a, EFloat::ordinary(0.0)).value(), -3.0);
        assert_eq!(e_max(a, EFloat::ordinary(0.0)).value(), 0.0);
    }

    #[test]
    fn trig_is_ordinary() {
        let c = EFloat::with_error(0.0, 1e-3).cos();
        assert_eq!(c.value(), 1.0);
        assert_eq!(c.kind(), NumberKind::Ordinary);
        let s = EFloat::with_error(0.0, 1e-3).sin();
        assert!(s.error() >= 1e-3);
    }

    #[test]
    fn compound_assignment_matches_binary_ops() {
        let mut a = EFloat::exact(2.0);
        a += EFloat::ordinary(1.5);
        let b = EFloat::exact(2.0) + EFloat::ordinary(1.5);
        assert_eq!(a.value(), b.value());
        assert_eq!(a.error(), b.error());
        a -= EFloat::ordinary(0.5);
        a *= EFloat::exact(2.0);
        assert_eq!(a.value(), 6.0);
        a.div_assign_checked(EFloat::exact(2.0)).unwrap();
        assert_eq!(a.value(), 3.0);
    }

    #[test]
    fn gamma_grows_with_n() {
        assert_eq!(gamma(1), GAMMA_1);
        assert!(gamma(3) > gamma(2));
    }

    proptest! {
        #[test]
        fn bounds_bracket_nominal(v in -1.0e6f32..1.0e6, e in 0.0f32..10.0) {
            let a = EFloat::with_error(v, e);
            prop_assert!(a.lower_bound() <= a.value());
            prop_assert!(a.value() <= a.upper_bound());
        }

        #[test]
        fn sum_error_never_shrinks(
            a in -1.0e4f32..1.0e4, ea in 0.0f32..1.0,
            b in -1.0e4f32..1.0e4, eb in 0.0f32..1.0,
        ) {
            let x = EFloat::with_error(a, ea);
            let y = EFloat::with_error(b, eb);
            prop_assert!((x + y).error() >= x.error() + y.error());
            prop_assert!((x - y).error() >= x.error() + y.error());
        }

        #[test]
        fn times_one_is_identity(v in -1.0e6f32..1.0e6, e in 0.0f32..1.0) {
            let a = EFloat::with_error(v, e);
            let p = a * EFloat::one();
            prop_assert!(p.interval_eq(&a));
            prop_assert_eq!(p.error(), a.error());
        }

        #[test]
        fn division_by_overlapping_zero_fails(v in -1.0f32..1.0, e in 1.0f32..5.0) {
            let divisor = EFloat::with_error(v, e);
            prop_assert!(divisor.interval_eq(&EFloat::zero()));
            prop_assert!(EFloat::ordinary(1.0).checked_div(divisor).is_err());
        }

        #[test]
        fn nearly_equal_chain_may_break(step in 0.11f32..0.19) {
            // Each neighbour overlaps; the ends never do once the gap exceeds 2·err.
            let a = EFloat::with_error(1.0, 0.1);
            let b = EFloat::with_error(1.0 + step, 0.1);
            let c = EFloat::with_error(1.0 + 2.0 * step, 0.1);
            prop_assert!(a.interval_eq(&b));
            prop_assert!(b.interval_eq(&c));
            prop_assert!(!a.interval_eq(&c));
        }
    }
}
