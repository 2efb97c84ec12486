//! Axis-aligned bounding boxes with interval coordinates.

use std::fmt;

use crate::error::{LayoutError, Result};
use crate::numeric::{Axis, EFloat, EVector};
use crate::source::SourceNode;

/// An axis-aligned box. `size` is always interval-equal to `max - min`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundBox {
    pub min: EVector,
    pub max: EVector,
    pub size: EVector,
}

impl BoundBox {
    pub fn new(min: EVector, max: EVector) -> Self {
        Self {
            min,
            max,
            size: max - min,
        }
    }

    /// Box at `min` with extent `size`.
    pub fn from_origin(min: EVector, size: EVector) -> Self {
        Self {
            min,
            max: min + size,
            size,
        }
    }

    /// Builds from independently reported corners and size, rejecting a
    /// size that disagrees with `max - min`.
    pub fn from_parts(min: EVector, max: EVector, size: EVector) -> Result<Self> {
        let derived = max - min;
        if !derived.interval_eq(&size) {
            return Err(LayoutError::structural(
                "bounding box",
                format!("reported size {size} disagrees with max - min = {derived}"),
            ));
        }
        Ok(Self { min, max, size })
    }

    /// Reads `Min`, `Max` and `Size` from a `BBox` element.
    pub fn from_source<N: SourceNode>(node: &N, input_error: f32) -> Result<Self> {
        let min = read_vector(&node.required_child("Min")?, input_error)?;
        let max = read_vector(&node.required_child("Max")?, input_error)?;
        let size = read_vector(&node.required_child("Size")?, input_error)?;
        Self::from_parts(min, max, size)
    }

    /// Extent along `axis`.
    #[inline]
    pub fn extent(&self, axis: Axis) -> EFloat {
        self.size[axis]
    }

    /// Planar overlap with positive area; touching edges do not overlap.
    pub fn overlaps(&self, other: &BoundBox) -> bool {
        Axis::ALL
            .iter()
            .all(|&a| self.min[a].lt(&other.max[a]) && other.min[a].lt(&self.max[a]))
    }

    /// Half-open planar containment of a point.
    pub fn contains_point(&self, p: &EVector) -> bool {
        Axis::ALL
            .iter()
            .all(|&a| !p[a].lt(&self.min[a]) && p[a].lt(&self.max[a]))
    }
}

impl fmt::Display for BoundBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}

/// Reads an `X`/`Y`/`Z` vector element; each component carries `input_error`.
pub fn read_vector<N: SourceNode>(node: &N, input_error: f32) -> Result<EVector> {
    let x: f32 = node.child_value("X")?;
    let y: f32 = node.child_value("Y")?;
    let z: f32 = node.optional_value("Z")?.unwrap_or(0.0);
    Ok(EVector::with_error(x, y, z, input_error))
}
