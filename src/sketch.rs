//! Programmatic facade descriptions.
//!
//! A [`Sketch`] is a nested arrangement of labelled rectangles. Rendering it
//! produces the same element tree a facade serializer writes, with bounding
//! boxes, relative split offsets and levels filled in, which makes it the
//! easiest way to feed synthetic layouts to the analysis.

use crate::numeric::Axis;
use crate::source::{SourceElement, DOCUMENT_ROOT, MAIN_SHAPE};

#[derive(Debug, Clone, PartialEq)]
pub enum Sketch {
    Leaf {
        label: String,
        width: f32,
        height: f32,
    },
    Split {
        label: String,
        axis: Axis,
        children: Vec<Sketch>,
    },
}

impl Sketch {
    pub fn leaf(label: impl Into<String>, width: f32, height: f32) -> Self {
        Sketch::Leaf {
            label: label.into(),
            width,
            height,
        }
    }

    /// Children side by side along `axis`. A single child is returned as is.
    pub fn split(label: impl Into<String>, axis: Axis, mut children: Vec<Sketch>) -> Self {
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        Sketch::Split {
            label: label.into(),
            axis,
            children,
        }
    }

    /// Rows of equally sized cells; `rows[0]` is the bottom row.
    pub fn grid<S: AsRef<str>>(rows: &[Vec<S>], cell_width: f32, cell_height: f32) -> Self {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(r, cells)| {
                let cells = cells
                    .iter()
                    .map(|c| Sketch::leaf(c.as_ref(), cell_width, cell_height))
                    .collect();
                Sketch::split(format!("row{r}"), Axis::X, cells)
            })
            .collect();
        Sketch::split("facade", Axis::Y, rows)
    }

    pub fn label(&self) -> &str {
        match self {
            Sketch::Leaf { label, .. } | Sketch::Split { label, .. } => label,
        }
    }

    /// `(width, height)`.
    pub fn size(&self) -> (f32, f32) {
        match self {
            Sketch::Leaf { width, height, .. } => (*width, *height),
            Sketch::Split { axis, children, .. } => {
                let sizes = children.iter().map(Sketch::size);
                match axis {
                    Axis::X => sizes.fold((0.0, 0.0), |(w, h), (cw, ch)| (w + cw, f32::max(h, ch))),
                    Axis::Y => sizes.fold((0.0, 0.0), |(w, h), (cw, ch)| (f32::max(w, cw), h + ch)),
                }
            }
        }
    }

    pub fn terminal_count(&self) -> u32 {
        match self {
            Sketch::Leaf { .. } => 1,
            Sketch::Split { children, .. } => children.iter().map(Sketch::terminal_count).sum(),
        }
    }

    /// Full `SerializableFacade/MainShape` document at the origin.
    pub fn to_document(&self) -> SourceElement {
        self.to_document_at(0.0, 0.0)
    }

    pub fn to_document_at(&self, x: f32, y: f32) -> SourceElement {
        let mut uid = 0;
        SourceElement::new(DOCUMENT_ROOT).with_child(self.render(MAIN_SHAPE, 0, (x, y), &mut uid))
    }

    fn render(&self, tag: &str, level: u32, origin: (f32, f32), uid: &mut u32) -> SourceElement {
        let (w, h) = self.size();
        *uid += 1;
        let mut el = SourceElement::new(tag)
            .with_child(SourceElement::with_text("Level", level))
            .with_child(SourceElement::with_text("UId", *uid))
            .with_child(SourceElement::with_text("Isolated", false))
            .with_child(SourceElement::with_text("Label", self.label()))
            .with_child(SourceElement::with_text("LabelName", self.label()))
            .with_child(
                SourceElement::new("BBox")
                    .with_child(vector("Min", origin.0, origin.1))
                    .with_child(vector("Max", origin.0 + w, origin.1 + h))
                    .with_child(vector("Size", w, h)),
            );

        let mut splits_x = SourceElement::new("SplitsX");
        let mut splits_y = SourceElement::new("SplitsY");
        let mut children = SourceElement::new("Children");
        if let Sketch::Split {
            axis,
            children: parts,
            ..
        } = self
        {
            let mut offset = 0.0f32;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    let line = SourceElement::with_text("float", offset);
                    match axis {
                        Axis::X => splits_x.push(line),
                        Axis::Y => splits_y.push(line),
                    }
                }
                let at = match axis {
                    Axis::X => (origin.0 + offset, origin.1),
                    Axis::Y => (origin.0, origin.1 + offset),
                };
                children.push(part.render("Node", level + 1, at, uid));
                let (pw, ph) = part.size();
                offset += match axis {
                    Axis::X => pw,
                    Axis::Y => ph,
                };
            }
        }
        el.push(splits_x);
        el.push(splits_y);
        el.push(children);
        el
    }
}

fn vector(tag: &str, x: f32, y: f32) -> SourceElement {
    SourceElement::new(tag)
        .with_child(SourceElement::with_text("X", x))
        .with_child(SourceElement::with_text("Y", y))
        .with_child(SourceElement::with_text("Z", 0.0f32))
}
