//! Bit-level view of an `f32` and one-ULP stepping.

use std::fmt;

const SIGN_MASK: u32 = 0x8000_0000;
const EXPONENT_MASK: u32 = 0x7f80_0000;
const SIGNIFICAND_MASK: u32 = 0x007f_ffff;

/// Sign, biased exponent and significand of an `f32`.
#[derive(Debug, Clone, Copy)]
pub struct FloatParts {
    bits: u32,
}

impl FloatParts {
    #[inline]
    pub fn new(value: f32) -> Self {
        Self {
            bits: value.to_bits(),
        }
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        f32::from_bits(self.bits)
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// `1` for negative values (including `-0.0`), else `0`.
    #[inline]
    pub fn sign(&self) -> u32 {
        (self.bits & SIGN_MASK) >> 31
    }

    /// Sign as `1.0` or `-1.0`.
    #[inline]
    pub fn sign_float(&self) -> f32 {
        if self.sign() == 1 {
            -1.0
        } else {
            1.0
        }
    }

    /// Biased exponent field.
    #[inline]
    pub fn exponent(&self) -> u32 {
        (self.bits & EXPONENT_MASK) >> 23
    }

    #[inline]
    pub fn significand(&self) -> u32 {
        self.bits & SIGNIFICAND_MASK
    }
}

impl fmt::Display for FloatParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:#04x} {:#08x}",
            if self.sign() == 1 { '-' } else { '+' },
            self.exponent(),
            self.significand()
        )
    }
}

/// Smallest `f32` strictly greater than `v`. `+inf` and NaN are returned unchanged.
pub fn next_float_up(v: f32) -> f32 {
    if v.is_nan() || (v.is_infinite() && v > 0.0) {
        return v;
    }
    // -0.0 steps like +0.0.
    let v = if v == 0.0 { 0.0 } else { v };
    let bits = v.to_bits();
    let bits = if v >= 0.0 { bits + 1 } else { bits - 1 };
    f32::from_bits(bits)
}

/// Largest `f32` strictly less than `v`. `-inf` and NaN are returned unchanged.
pub fn next_float_down(v: f32) -> f32 {
    if v.is_nan() || (v.is_infinite() && v < 0.0) {
        return v;
    }
    let v = if v == 0.0 { -0.0 } else { v };
    let bits = v.to_bits();
    let bits = if v > 0.0 { bits - 1 } else { bits + 1 };
    f32::from_bits(bits)
}
