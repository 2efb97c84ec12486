//! inverse-facade: discovery of repeated rectangular motifs in subdivided facade layouts.
//!
//! A facade is described as a tree of axis-aligned splits: each branch cuts
//! its rectangle along X or Y into ordered children, each leaf is a labelled
//! terminal region (a window, a door, a wall tile). This crate provides:
//! - interval-tracked floating point ([`EFloat`], [`EVector`]) so geometric
//!   equality survives serialization round-off;
//! - a builder that turns a layout document into a [`LayoutTree`], cross-checking
//!   the redundant geometry it carries;
//! - an identity registry assigning one [`GroupId`] per distinct motif;
//! - the [`GroupEngine`], which composes adjacent motifs bottom-up and keeps
//!   only those that occur at least twice.
//!
//! # Invariants
//!
//! After a full run every catalog identity has two or more placements, and
//! the catalog, the per-leaf width indices and the per-branch split indices
//! describe exactly the same set of placements.
//!
//! # References
//!
//! - Pharr, Jakob, Humphreys, *Physically Based Rendering* (3rd ed.), §3.9 – error-bounded floats
//! - Müller, Wonka, Haegler, Ulmer, Van Gool, "Procedural modeling of buildings" (2006) – split grammars
//! - Bokeloh, Wand, Seidel, "A connection between partial symmetry and inverse procedural modeling" (2010)
//!
//! # Example
//!
//! ```
//! use inverse_facade::prelude::*;
//!
//! let facade = Sketch::split(
//!     "row",
//!     Axis::X,
//!     vec![
//!         Sketch::leaf("window", 1.0, 1.0),
//!         Sketch::leaf("pillar", 0.5, 1.0),
//!         Sketch::leaf("window", 1.0, 1.0),
//!         Sketch::leaf("pillar", 0.5, 1.0),
//!     ],
//! );
//! let doc = facade.to_document();
//! let engine = GroupEngine::analyze(&doc.main_shape()?, ComposeOptions::default())?;
//! let bay = engine.registry().id_of("x[window,pillar]").unwrap();
//! assert_eq!(engine.placements(bay)?.len(), 2);
//! # Ok::<(), inverse_facade::LayoutError>(())
//! ```

pub mod arena;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod index;
pub mod navigation;
pub mod numeric;
pub mod registry;
pub mod sketch;
pub mod source;
pub mod tree;

pub use crate::arena::{NodeArena, NodeHandle};
pub use crate::catalog::{Catalog, GroupPair};
pub use crate::config::ComposeOptions;
pub use crate::engine::{CatalogSummary, GroupEngine, MotifSummary, PassReport};
pub use crate::error::{ErrorKind, LayoutError, Result};
pub use crate::numeric::{ArithmeticError, Axis, EFloat, EVector, NumberKind};
pub use crate::source::{SourceElement, SourceError, SourceNode};
pub use crate::tree::{GroupId, LayoutTree, NodeValue};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::arena::NodeHandle;
    pub use crate::builder::{build_tree, BuiltLayout};
    pub use crate::catalog::{Catalog, GroupPair};
    pub use crate::config::ComposeOptions;
    pub use crate::engine::{CatalogSummary, GroupEngine, MotifSummary, PassReport};
    pub use crate::error::{ErrorKind, LayoutError, Result};
    pub use crate::fingerprint::HashValue;
    pub use crate::geometry::BoundBox;
    pub use crate::navigation::{collect_overlapping_splits, find_containing_ancestor, find_lower_left, same_group};
    pub use crate::numeric::{ArithmeticError, Axis, EFloat, EVector, NumberKind};
    pub use crate::registry::Registry;
    pub use crate::sketch::Sketch;
    pub use crate::source::{ElementRef, SourceElement, SourceError, SourceNode};
    pub use crate::tree::{GroupId, LayoutTree, NodeValue};
}
