//! Three-component vector of [`EFloat`]s and the planar split axes.

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use super::efloat::{ArithmeticError, EFloat};

/// A planar subdivision axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    /// The perpendicular planar axis.
    #[inline]
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    /// Lowercase prefix used in synthesized motif names.
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
        }
    }

    /// Stable byte tag for fingerprinting.
    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A point or extent with per-component error bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct EVector {
    pub x: EFloat,
    pub y: EFloat,
    pub z: EFloat,
}

impl EVector {
    #[inline]
    pub fn new(x: EFloat, y: EFloat, z: EFloat) -> Self {
        Self { x, y, z }
    }

    /// Ordinary components all carrying the same a-priori error.
    pub fn with_error(x: f32, y: f32, z: f32, error: f32) -> Self {
        Self {
            x: EFloat::with_error(x, error),
            y: EFloat::with_error(y, error),
            z: EFloat::with_error(z, error),
        }
    }

    /// Exact origin.
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Component by position; `None` past `2`.
    pub fn get(&self, i: usize) -> Option<&EFloat> {
        match i {
            0 => Some(&self.x),
            1 => Some(&self.y),
            2 => Some(&self.z),
            _ => None,
        }
    }

    /// Copy with one planar component replaced.
    #[inline]
    pub fn with_component(mut self, axis: Axis, value: EFloat) -> Self {
        self[axis] = value;
        self
    }

    /// Copy shifted by `delta` along `axis`.
    #[inline]
    pub fn offset(self, axis: Axis, delta: EFloat) -> Self {
        let moved = self[axis] + delta;
        self.with_component(axis, moved)
    }

    pub fn dot(&self, other: &Self) -> EFloat {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Component-wise interval equality.
    pub fn interval_eq(&self, other: &Self) -> bool {
        self.x.interval_eq(&other.x) && self.y.interval_eq(&other.y) && self.z.interval_eq(&other.z)
    }

    /// Interval equality of the planar components only.
    pub fn planar_eq(&self, other: &Self) -> bool {
        self.x.interval_eq(&other.x) && self.y.interval_eq(&other.y)
    }

    /// Divides every component by `d` through its reciprocal.
    pub fn checked_div_scalar(self, d: EFloat) -> Result<Self, ArithmeticError> {
        let inv = EFloat::one().checked_div(d)?;
        Ok(self * inv)
    }

    /// Nominal planar coordinates.
    #[inline]
    pub fn planar(&self) -> [f32; 2] {
        [self.x.value(), self.y.value()]
    }
}

impl Index<Axis> for EVector {
    type Output = EFloat;

    fn index(&self, axis: Axis) -> &EFloat {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

impl IndexMut<Axis> for EVector {
    fn index_mut(&mut self, axis: Axis) -> &mut EFloat {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }
}

impl Index<usize> for EVector {
    type Output = EFloat;

    fn index(&self, i: usize) -> &EFloat {
        match self.get(i) {
            Some(c) => c,
            None => panic!("EVector index {i} out of range"),
        }
    }
}

impl Add for EVector {
    type Output = EVector;

    fn add(self, rhs: EVector) -> EVector {
        EVector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for EVector {
    type Output = EVector;

    fn sub(self, rhs: EVector) -> EVector {
        EVector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl AddAssign for EVector {
    fn add_assign(&mut self, rhs: EVector) {
        *self = *self + rhs;
    }
}

impl SubAssign for EVector {
    fn sub_assign(&mut self, rhs: EVector) {
        *self = *self - rhs;
    }
}

impl Add<EFloat> for EVector {
    type Output = EVector;

    fn add(self, rhs: EFloat) -> EVector {
        EVector::new(self.x + rhs, self.y + rhs, self.z + rhs)
    }
}

impl Sub<EFloat> for EVector {
    type Output = EVector;

    fn sub(self, rhs: EFloat) -> EVector {
        EVector::new(self.x - rhs, self.y - rhs, self.z - rhs)
    }
}

impl Mul<EFloat> for EVector {
    type Output = EVector;

    fn mul(self, rhs: EFloat) -> EVector {
        EVector::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for EVector {
    type Output = EVector;

    fn neg(self) -> EVector {
        EVector::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for EVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.x.value(),
            self.y.value(),
            self.z.value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> EVector {
        EVector::with_error(x, y, 0.0, 1e-6)
    }

    #[test]
    fn componentwise_arithmetic() {
        let s = v(1.0, 2.0) + v(3.0, 4.0);
        assert!(s.interval_eq(&v(4.0, 6.0)));
        let d = v(3.0, 4.0) - v(1.0, 2.0);
        assert!(d.interval_eq(&v(2.0, 2.0)));
        let n = -v(1.0, -2.0);
        assert_eq!(n.planar(), [-1.0, 2.0]);
    }

    #[test]
    fn scalar_ops() {
        let p = v(1.0, 2.0) * EFloat::exact(2.0);
        assert_eq!(p.planar(), [2.0, 4.0]);
        let q = v(2.0, 4.0).checked_div_scalar(EFloat::exact(2.0)).unwrap();
        assert!(q.interval_eq(&v(1.0, 2.0)));
        assert!(v(1.0, 1.0).checked_div_scalar(EFloat::zero()).is_err());
        let shifted = v(1.0, 1.0) + EFloat::exact(1.0);
        assert!(shifted.z.interval_eq(&EFloat::ordinary(1.0)));
    }

    #[test]
    fn dot_product() {
        let d = v(1.0, 2.0).dot(&v(3.0, 4.0));
        assert!(d.interval_eq(&EFloat::ordinary(11.0)));
    }

    #[test]
    fn axis_indexing() {
        let mut p = v(1.0, 2.0);
        assert_eq!(p[Axis::X].value(), 1.0);
        assert_eq!(p[1].value(), 2.0);
        assert!(p.get(3).is_none());
        p[Axis::Y] = EFloat::exact(8.0);
        assert_eq!(p.y.value(), 8.0);
        let moved = p.offset(Axis::X, EFloat::exact(2.0));
        assert_eq!(moved.x.value(), 3.0);
        assert_eq!(Axis::X.other(), Axis::Y);
    }

    #[test]
    fn equality_needs_every_component() {
        assert!(!v(1.0, 2.0).interval_eq(&v(1.0, 2.5)));
        assert!(v(1.0, 2.0).planar_eq(&v(1.0, 2.0)));
    }
}
