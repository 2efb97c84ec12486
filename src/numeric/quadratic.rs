//! Error-bounded real roots of `a·t² + b·t + c = 0`.

use super::efloat::{ArithmeticError, EFloat};

/// Real solution set of a quadratic.
#[derive(Debug, Clone, Copy)]
pub enum Roots {
    /// No real root.
    None,
    /// A single root (linear equation or zero discriminant).
    One(EFloat),
    /// Two roots in ascending nominal order.
    Two(EFloat, EFloat),
    /// Every `t` satisfies the equation (`a = b = c = 0`).
    Everywhere,
}

impl Roots {
    pub fn count(&self) -> Option<usize> {
        match self {
            Roots::None => Some(0),
            Roots::One(_) => Some(1),
            Roots::Two(_, _) => Some(2),
            Roots::Everywhere => None,
        }
    }
}

/// Solves the quadratic with interval coefficients.
///
/// Coefficients that are interval-equal to zero are treated as zero, so a
/// noisy `a` degrades to the linear case rather than dividing by its error.
pub fn solve_quadratic(a: EFloat, b: EFloat, c: EFloat) -> Result<Roots, ArithmeticError> {
    let zero = EFloat::zero();
    if a.interval_eq(&zero) {
        if b.interval_eq(&zero) {
            return Ok(if c.interval_eq(&zero) {
                Roots::Everywhere
            } else {
                Roots::None
            });
        }
        return Ok(Roots::One((-c).checked_div(b)?));
    }

    let discriminant = b * b - EFloat::exact(4.0) * a * c;
    if discriminant.lt(&zero) {
        return Ok(Roots::None);
    }

    let two_a = EFloat::exact(2.0) * a;
    let minus_b = -b;
    if discriminant.interval_eq(&zero) {
        return Ok(Roots::One(minus_b.checked_div(two_a)?));
    }

    let root = discriminant.sqrt()?;
    let t0 = (minus_b - root).checked_div(two_a)?;
    let t1 = (minus_b + root).checked_div(two_a)?;
    Ok(if t0.nominal_lt(&t1) {
        Roots::Two(t0, t1)
    } else {
        Roots::Two(t1, t0)
    })
}
