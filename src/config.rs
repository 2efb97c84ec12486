//! Analysis options.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::numeric::Axis;

/// Default a-priori error attached to every coordinate read from a document:
/// a few ULPs at unit scale, enough to absorb a decimal round trip.
pub const DEFAULT_INPUT_ERROR: f32 = 6e-7;

/// Knobs for building the tree and running composition.
///
/// Every field has a default, so a partial JSON object is accepted:
///
/// ```
/// use inverse_facade::config::ComposeOptions;
/// let opts = ComposeOptions::from_json_str(r#"{ "max_terminals": 4 }"#).unwrap();
/// assert_eq!(opts.max_terminals, Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    /// Absolute error attached to each input coordinate and split offset.
    pub input_error: f32,
    /// Depth the document root must report in its `Level` element.
    pub root_level: u32,
    /// Stop composing after motifs of this many terminals. `None` runs to the
    /// full terminal count of the layout.
    pub max_terminals: Option<u32>,
    /// Run the consistency check after every pass.
    pub verify_after_pass: bool,
    /// Axes along which neighbours are merged, in this order per placement.
    pub merge_axes: Vec<Axis>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            input_error: DEFAULT_INPUT_ERROR,
            root_level: 0,
            max_terminals: None,
            verify_after_pass: cfg!(debug_assertions),
            merge_axes: Axis::ALL.to_vec(),
        }
    }
}

impl ComposeOptions {
    pub fn from_json_str(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.input_error.is_finite() || self.input_error < 0.0 {
            return Err(LayoutError::structural(
                "options",
                format!("input_error must be finite and non-negative, got {}", self.input_error),
            ));
        }
        if self.merge_axes.is_empty() {
            return Err(LayoutError::structural("options", "merge_axes is empty"));
        }
        if self.merge_axes.len() == 2 && self.merge_axes[0] == self.merge_axes[1] {
            return Err(LayoutError::structural("options", "merge_axes repeats an axis"));
        }
        if self.merge_axes.len() > 2 {
            return Err(LayoutError::structural("options", "merge_axes lists more than two axes"));
        }
        if self.max_terminals == Some(0) {
            return Err(LayoutError::structural("options", "max_terminals must be at least 1"));
        }
        Ok(())
    }
}
