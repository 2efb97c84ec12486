//! Builds the subdivision tree from a layout document.
//!
//! The document encodes geometry redundantly: every node reports its own
//! bounding box, and every branch reports split offsets relative to its own
//! origin. The builder accumulates offsets into child locations and checks
//! each against the child's reported minimum, so transcription errors surface
//! at load time instead of as missed matches later.
//!
//! Leaves are registered with the identity registry by label; branches are
//! interned as composites of their children.

use std::rc::Rc;

use tracing::{debug, info};

use crate::arena::NodeHandle;
use crate::config::ComposeOptions;
use crate::error::{LayoutError, Result};
use crate::geometry::BoundBox;
use crate::numeric::{Axis, EFloat, EVector};
use crate::registry::Registry;
use crate::source::SourceNode;
use crate::tree::{check_split_offsets, LayoutNode, LayoutTree, NodeValue};

/// A tree leaf together with where it sits.
#[derive(Debug, Clone)]
pub struct LeafPlacement {
    pub node: NodeHandle,
    pub value: Rc<NodeValue>,
    pub location: EVector,
}

/// Output of [`build_tree`].
#[derive(Debug)]
pub struct BuiltLayout {
    pub tree: LayoutTree,
    /// Leaves in document order (left to right, bottom to top per branch).
    pub leaves: Vec<LeafPlacement>,
}

/// Builds the tree rooted at `root` (a `MainShape` element), registering
/// every leaf and branch motif in `registry`.
pub fn build_tree<N: SourceNode>(
    root: &N,
    registry: &mut Registry,
    options: &ComposeOptions,
) -> Result<BuiltLayout> {
    options.validate()?;
    let bbox = BoundBox::from_source(&root.required_child("BBox")?, options.input_error)?;
    let mut builder = TreeBuilder {
        tree: LayoutTree::new(),
        registry,
        input_error: options.input_error,
        leaves: Vec::new(),
    };
    let handle = builder.build(root, options.root_level, bbox.min)?;
    builder.tree.set_root(handle, bbox.min);
    info!(
        leaves = builder.leaves.len(),
        nodes = builder.tree.node_count(),
        identities = builder.registry.len(),
        "built subdivision tree"
    );
    Ok(BuiltLayout {
        tree: builder.tree,
        leaves: builder.leaves,
    })
}

struct TreeBuilder<'r> {
    tree: LayoutTree,
    registry: &'r mut Registry,
    input_error: f32,
    leaves: Vec<LeafPlacement>,
}

impl TreeBuilder<'_> {
    fn build<N: SourceNode>(&mut self, node: &N, level: u32, location: EVector) -> Result<NodeHandle> {
        let label = read_label(node)?;
        let reported: u32 = node.child_value("Level")?;
        if reported != level {
            return Err(LayoutError::structural(
                "tree builder",
                format!("node {label} reports level {reported}, expected {level}"),
            ));
        }
        let uid: Option<u64> = node.optional_value("UId")?;
        let isolated: Option<bool> = node.optional_value("Isolated")?;

        let bbox = BoundBox::from_source(&node.required_child("BBox")?, self.input_error)?;
        if !bbox.min.planar_eq(&location) {
            return Err(LayoutError::structural(
                "tree builder",
                format!(
                    "node {label}: accumulated location {location} disagrees with reported minimum {}",
                    bbox.min
                ),
            ));
        }

        let splits_x = node.float_list("SplitsX")?;
        let splits_y = node.float_list("SplitsY")?;
        let (axis, raw) = match (splits_x.is_empty(), splits_y.is_empty()) {
            (true, true) => {
                debug!(label = %label, ?uid, ?isolated, level, at = %location, "built leaf");
                return self.build_leaf(label, bbox, location);
            }
            (false, true) => (Axis::X, splits_x),
            (true, false) => (Axis::Y, splits_y),
            (false, false) => {
                return Err(LayoutError::structural(
                    "tree builder",
                    format!("node {label} declares splits along both axes"),
                ))
            }
        };
        let offsets: Vec<EFloat> = raw
            .into_iter()
            .map(|v| EFloat::with_error(v, self.input_error))
            .collect();
        check_split_offsets(&offsets, &bbox.size[axis])?;

        // Children arrive unordered; their reported minimum along the axis
        // recovers the layout order.
        let mut parts = Vec::new();
        if let Some(list) = node.child("Children") {
            for child in list.children() {
                let child_box = BoundBox::from_source(&child.required_child("BBox")?, self.input_error)?;
                parts.push((child_box.min[axis].value(), child));
            }
        }
        if parts.len() != offsets.len() + 1 {
            return Err(LayoutError::structural(
                "tree builder",
                format!(
                    "node {label} has {} children for {} split offsets",
                    parts.len(),
                    offsets.len()
                ),
            ));
        }
        parts.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut handles = Vec::with_capacity(parts.len());
        let mut values = Vec::with_capacity(parts.len());
        for (i, (_, child)) in parts.iter().enumerate() {
            let at = if i == 0 {
                location
            } else {
                location.offset(axis, offsets[i - 1])
            };
            let h = self.build(child, level + 1, at)?;
            values.push(Rc::clone(self.tree.expect_node(h)?.value()));
            handles.push(h);
        }

        let value = self.registry.intern_composite(axis, &values, Some(&bbox.size))?;
        debug!(
            label = %label,
            ?uid,
            motif = %value.name,
            %axis,
            children = handles.len(),
            level,
            "built branch"
        );
        self.tree.insert_tree_node(LayoutNode::tree_branch(
            label, value, bbox.size, axis, offsets, handles,
        ))
    }

    fn build_leaf(&mut self, label: String, bbox: BoundBox, location: EVector) -> Result<NodeHandle> {
        let value = self.registry.register_leaf(&label, bbox.size)?;
        let handle = self
            .tree
            .insert_tree_node(LayoutNode::tree_leaf(label, Rc::clone(&value), bbox.size))?;
        self.leaves.push(LeafPlacement {
            node: handle,
            value,
            location,
        });
        Ok(handle)
    }
}

/// `Label`, falling back to `LabelName`.
fn read_label<N: SourceNode>(node: &N) -> Result<String> {
    match node.optional_value::<String>("Label")? {
        Some(label) if !label.is_empty() => Ok(label),
        _ => Ok(node.child_value("LabelName")?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sketch::Sketch;
    use crate::source::{SourceElement, SourceNode};

    fn build(doc: &SourceElement) -> Result<(BuiltLayout, Registry)> {
        let mut registry = Registry::new();
        let built = build_tree(&doc.main_shape()?, &mut registry, &ComposeOptions::default())?;
        Ok((built, registry))
    }

    fn row(labels: &[&str]) -> Sketch {
        Sketch::split("row", Axis::X, labels.iter().map(|l| Sketch::leaf(*l, 1.0, 1.0)).collect())
    }

    /// Mutable access to the `MainShape` element of a rendered document.
    fn shape(doc: &mut SourceElement) -> &mut SourceElement {
        &mut doc.children[0]
    }

    fn child_mut<'a>(el: &'a mut SourceElement, name: &str) -> &'a mut SourceElement {
        el.children.iter_mut().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn builds_a_strip() {
        let (built, registry) = build(&row(&["A", "B", "A"]).to_document()).unwrap();
        built.tree.verify().unwrap();
        assert_eq!(built.leaves.len(), 3);
        assert_eq!(registry.len(), 3); // A, B, x[A,B,A]
        assert!(Rc::ptr_eq(&built.leaves[0].value, &built.leaves[2].value));
        let xs: Vec<f32> = built.leaves.iter().map(|l| l.location.x.value()).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        let root = built.tree.node(built.tree.root().unwrap()).unwrap();
        assert_eq!(root.label(), "row");
        assert_eq!(root.value().name, "x[A,B,A]");
        assert_eq!(root.splits().len(), 2);
    }

    #[test]
    fn unordered_children_are_sorted() {
        let mut doc = row(&["A", "B", "C"]).to_document();
        child_mut(shape(&mut doc), "Children").children.reverse();
        let (built, _) = build(&doc).unwrap();
        let labels: Vec<_> = built
            .tree
            .leaves()
            .into_iter()
            .map(|h| built.tree.node(h).unwrap().label().to_string())
            .collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn level_mismatch_is_structural() {
        let mut doc = row(&["A", "B"]).to_document();
        child_mut(shape(&mut doc), "Level").text = Some("1".into());
        let err = build(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralInconsistency);
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn child_count_mismatch_is_structural() {
        let mut doc = row(&["A", "B", "C"]).to_document();
        child_mut(shape(&mut doc), "Children").children.pop();
        let err = build(&doc).unwrap_err();
        assert!(err.to_string().contains("children"));
    }

    #[test]
    fn location_disagreement_is_structural() {
        let mut doc = row(&["A", "B"]).to_document();
        let splits = child_mut(shape(&mut doc), "SplitsX");
        splits.children[0].text = Some("0.5".into());
        let err = build(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralInconsistency);
    }

    #[test]
    fn both_split_axes_is_structural() {
        let mut doc = row(&["A", "B"]).to_document();
        child_mut(shape(&mut doc), "SplitsY").push(SourceElement::with_text("float", 0.5));
        let err = build(&doc).unwrap_err();
        assert!(err.to_string().contains("both axes"));
    }

    #[test]
    fn leaf_redefinition_is_structural() {
        let doc = Sketch::split(
            "row",
            Axis::X,
            vec![Sketch::leaf("A", 1.0, 1.0), Sketch::leaf("A", 2.0, 1.0)],
        )
        .to_document();
        assert_eq!(build(&doc).unwrap_err().kind(), ErrorKind::StructuralInconsistency);
    }

    #[test]
    fn label_falls_back_to_label_name() {
        let mut doc = Sketch::leaf("door", 1.0, 2.0).to_document();
        shape(&mut doc).children.retain(|c| c.name != "Label");
        let (built, registry) = build(&doc).unwrap();
        assert_eq!(built.leaves.len(), 1);
        assert!(registry.id_of("door").is_some());
    }

    #[test]
    fn unreadable_text_is_reported() {
        let mut doc = row(&["A", "B"]).to_document();
        child_mut(shape(&mut doc), "Level").text = Some("zero".into());
        let err = build(&doc).unwrap_err();
        assert!(matches!(err, LayoutError::Source(_)));
    }

    #[test]
    fn nested_layout_tracks_locations() {
        let doc = Sketch::grid(&[vec!["A", "B"], vec!["C", "D"]], 2.0, 3.0).to_document_at(1.0, 1.0);
        let (built, _) = build(&doc).unwrap();
        built.tree.verify().unwrap();
        let d = built.leaves.last().unwrap();
        assert_eq!(d.location.planar(), [3.0, 4.0]);
        let origin = built.tree.origin(d.node).unwrap();
        assert!(origin.planar_eq(&d.location));
        let root = built.tree.root().unwrap();
        let rendered = doc.main_shape().unwrap();
        assert_eq!(rendered.child_value::<u32>("Level").unwrap(), 0);
        assert_eq!(built.tree.node(root).unwrap().children().len(), 2);
    }
}
