//! Error-bounded floating point.
//!
//! Geometry read from a layout document is only approximately consistent:
//! split offsets, child extents and bounding boxes disagree in their last bits.
//! Everything downstream compares through [`EFloat`] intervals instead of raw
//! `f32` equality.

pub mod efloat;
pub mod quadratic;
#[cfg(any(test, feature = "shadow-precision"))]
pub mod shadow;
pub mod ulp;
pub mod vector;

pub use efloat::{e_max, e_min, gamma, ArithmeticError, EFloat, NumberKind, GAMMA_1, MACHINE_EPSILON};
pub use quadratic::{solve_quadratic, Roots};
#[cfg(any(test, feature = "shadow-precision"))]
pub use shadow::ShadowFloat;
pub use ulp::{next_float_down, next_float_up, FloatParts};
pub use vector::{Axis, EVector};
