//! Debug-only cross-check of [`EFloat`] error bounds against an `f64` reference.
//!
//! Compiled for tests and under the `shadow-precision` feature.

use std::ops::{Add, Mul, Neg, Sub};

use super::efloat::{ArithmeticError, EFloat, NumberKind};

/// An [`EFloat`] paired with the same computation carried out in `f64`.
#[derive(Debug, Clone, Copy)]
pub struct ShadowFloat {
    tracked: EFloat,
    reference: f64,
}

impl ShadowFloat {
    /// Ordinary value converted from a higher-precision input.
    pub fn from_f64(value: f64) -> Self {
        Self {
            tracked: EFloat::ordinary(value as f32),
            reference: value,
        }
    }

    pub fn exact(value: f32) -> Self {
        Self {
            tracked: EFloat::exact(value),
            reference: value as f64,
        }
    }

    pub fn with_error(value: f32, error: f32) -> Self {
        Self {
            tracked: EFloat::new(value, error, NumberKind::Ordinary),
            reference: value as f64,
        }
    }

    #[inline]
    pub fn tracked(&self) -> EFloat {
        self.tracked
    }

    #[inline]
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// `true` when the reference lies inside the tracked interval.
    pub fn error_accurate(&self) -> bool {
        let diff = (self.tracked.value() as f64 - self.reference).abs();
        diff <= self.tracked.error() as f64
    }

    /// Fraction of the tracked bound actually used by the observed deviation.
    pub fn bound_usage(&self) -> f64 {
        let diff = (self.tracked.value() as f64 - self.reference).abs();
        let bound = self.tracked.error() as f64;
        if bound == 0.0 {
            if diff == 0.0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            diff / bound
        }
    }

    pub fn checked_div(self, rhs: Self) -> Result<Self, ArithmeticError> {
        Ok(Self {
            tracked: self.tracked.checked_div(rhs.tracked)?,
            reference: self.reference / rhs.reference,
        })
    }

    pub fn sqrt(self) -> Result<Self, ArithmeticError> {
        Ok(Self {
            tracked: self.tracked.sqrt()?,
            reference: self.reference.max(0.0).sqrt(),
        })
    }
}

impl Add for ShadowFloat {
    type Output = ShadowFloat;

    fn add(self, rhs: ShadowFloat) -> ShadowFloat {
        ShadowFloat {
            tracked: self.tracked + rhs.tracked,
            reference: self.reference + rhs.reference,
        }
    }
}

impl Sub for ShadowFloat {
    type Output = ShadowFloat;

    fn sub(self, rhs: ShadowFloat) -> ShadowFloat {
        ShadowFloat {
            tracked: self.tracked - rhs.tracked,
            reference: self.reference - rhs.reference,
        }
    }
}

impl Mul for ShadowFloat {
    type Output = ShadowFloat;

    fn mul(self, rhs: ShadowFloat) -> ShadowFloat {
        ShadowFloat {
            tracked: self.tracked * rhs.tracked,
            reference: self.reference * rhs.reference,
        }
    }
}

impl Neg for ShadowFloat {
    type Output = ShadowFloat;

    fn neg(self) -> ShadowFloat {
        ShadowFloat {
            tracked: -self.tracked,
            reference: -self.reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn conversion_is_covered() {
        let s = ShadowFloat::from_f64(0.1);
        assert!(s.error_accurate());
        assert!(s.bound_usage() <= 1.0);
    }

    #[test]
    fn exact_values_use_no_bound() {
        let s = ShadowFloat::exact(2.0) * ShadowFloat::exact(4.0);
        assert_eq!(s.bound_usage(), 0.0);
    }

    proptest! {
        #[test]
        fn chained_sums_stay_inside_bound(xs in prop::collection::vec(-1.0e3f64..1.0e3, 1..24)) {
            let mut acc = ShadowFloat::exact(0.0);
            for x in xs {
                acc = acc + ShadowFloat::from_f64(x);
                prop_assert!(acc.error_accurate());
            }
        }

        #[test]
        fn products_and_quotients_stay_inside_bound(
            a in 0.5f64..100.0,
            b in 0.5f64..100.0,
            c in 0.5f64..100.0,
        ) {
            let (a, b, c) = (ShadowFloat::from_f64(a), ShadowFloat::from_f64(b), ShadowFloat::from_f64(c));
            let p = a * b - c;
            prop_assert!(p.error_accurate());
            let q = (a + b).checked_div(c).unwrap();
            prop_assert!(q.error_accurate());
            let r = (a * c).sqrt().unwrap();
            prop_assert!(r.error_accurate());
        }
    }
}
