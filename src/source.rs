//! Read-only access to the hierarchical layout document.
//!
//! The subdivision builder only needs to walk named children, iterate sibling
//! lists and read element text, so it is written against the [`SourceNode`]
//! trait. [`SourceElement`] is the bundled implementation: a plain element
//! tree that (de)serializes as JSON.
//!
//! ```json
//! { "name": "SerializableFacade", "children": [
//!     { "name": "MainShape", "children": [
//!         { "name": "Level", "text": "0" }, ...
//! ] } ] }
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tag of the document root produced by the facade serializer.
pub const DOCUMENT_ROOT: &str = "SerializableFacade";
/// Tag of the layout tree root under [`DOCUMENT_ROOT`].
pub const MAIN_SHAPE: &str = "MainShape";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("element <{parent}> has no child <{name}>")]
    MissingChild { parent: String, name: String },

    #[error("element <{element}> has no text")]
    MissingText { element: String },

    #[error("element <{element}>: cannot read {text:?} as {expected}")]
    InvalidText {
        element: String,
        text: String,
        expected: &'static str,
    },

    #[error("cannot decode layout document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cannot read layout document: {0}")]
    Io(#[from] std::io::Error),
}

/// Navigation over a hierarchical document with named elements.
///
/// Implementors are cheap cursors (`Clone`); all reading goes through
/// `first_child`, `next_sibling`, `tag` and `text`. The provided methods build
/// typed extraction on top.
pub trait SourceNode: Clone {
    fn tag(&self) -> &str;
    fn text(&self) -> Option<&str>;
    fn first_child(&self) -> Option<Self>;
    fn next_sibling(&self) -> Option<Self>;

    /// First child named `name`.
    fn child(&self, name: &str) -> Option<Self> {
        self.children().find(|c| c.tag() == name)
    }

    fn required_child(&self, name: &str) -> Result<Self, SourceError> {
        self.child(name).ok_or_else(|| SourceError::MissingChild {
            parent: self.tag().to_string(),
            name: name.to_string(),
        })
    }

    fn children(&self) -> Children<Self> {
        Children {
            next: self.first_child(),
        }
    }

    /// Parses this element's trimmed text.
    fn parse_text<T: FromStr>(&self) -> Result<T, SourceError> {
        let raw = self.text().ok_or_else(|| SourceError::MissingText {
            element: self.tag().to_string(),
        })?;
        let trimmed = raw.trim();
        trimmed.parse().map_err(|_| SourceError::InvalidText {
            element: self.tag().to_string(),
            text: trimmed.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Parses the text of the required child `name`.
    fn child_value<T: FromStr>(&self, name: &str) -> Result<T, SourceError> {
        self.required_child(name)?.parse_text()
    }

    /// Like [`child_value`](Self::child_value) but absent children yield `None`.
    fn optional_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SourceError> {
        match self.child(name) {
            Some(c) => c.parse_text().map(Some),
            None => Ok(None),
        }
    }

    /// Parses every child's text as a float list. An absent list is empty.
    fn float_list(&self, name: &str) -> Result<Vec<f32>, SourceError> {
        match self.child(name) {
            Some(list) => list.children().map(|c| c.parse_text::<f32>()).collect(),
            None => Ok(Vec::new()),
        }
    }
}

/// Iterator over the children of a [`SourceNode`].
pub struct Children<N> {
    next: Option<N>,
}

impl<N: SourceNode> Iterator for Children<N> {
    type Item = N;

    fn next(&mut self) -> Option<N> {
        let current = self.next.take()?;
        self.next = current.next_sibling();
        Some(current)
    }
}

/// An owned document element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SourceElement>,
}

impl SourceElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Leaf element holding text.
    pub fn with_text(name: impl Into<String>, text: impl ToString) -> Self {
        Self {
            name: name.into(),
            text: Some(text.to_string()),
            children: Vec::new(),
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: SourceElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: SourceElement) {
        self.children.push(child);
    }

    /// Cursor positioned at this element.
    pub fn cursor(&self) -> ElementRef<'_> {
        ElementRef {
            siblings: std::slice::from_ref(self),
            index: 0,
        }
    }

    /// Locates the layout root: `SerializableFacade/MainShape`, or this element
    /// itself if it already is a `MainShape`.
    pub fn main_shape(&self) -> Result<ElementRef<'_>, SourceError> {
        let root = self.cursor();
        if self.name == MAIN_SHAPE {
            return Ok(root);
        }
        if self.name != DOCUMENT_ROOT {
            return Err(SourceError::MissingChild {
                parent: self.name.clone(),
                name: MAIN_SHAPE.to_string(),
            });
        }
        root.required_child(MAIN_SHAPE)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn to_json_string(&self) -> Result<String, SourceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Borrowed cursor into a [`SourceElement`] tree.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    siblings: &'a [SourceElement],
    index: usize,
}

impl<'a> ElementRef<'a> {
    pub fn element(&self) -> &'a SourceElement {
        &self.siblings[self.index]
    }
}

impl<'a> SourceNode for ElementRef<'a> {
    fn tag(&self) -> &str {
        &self.element().name
    }

    fn text(&self) -> Option<&str> {
        self.element().text.as_deref()
    }

    fn first_child(&self) -> Option<Self> {
        let children = &self.element().children;
        if children.is_empty() {
            None
        } else {
            Some(ElementRef {
                siblings: children,
                index: 0,
            })
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        let next = self.index + 1;
        (next < self.siblings.len()).then_some(ElementRef {
            siblings: self.siblings,
            index: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> SourceElement {
        SourceElement::new(DOCUMENT_ROOT).with_child(
            SourceElement::new(MAIN_SHAPE)
                .with_child(SourceElement::with_text("Level", 0))
                .with_child(SourceElement::with_text("Label", "  wall "))
                .with_child(
                    SourceElement::new("SplitsX")
                        .with_child(SourceElement::with_text("float", "1.5"))
                        .with_child(SourceElement::with_text("float", "3")),
                )
                .with_child(SourceElement::with_text("Broken", "abc")),
        )
    }

    #[test]
    fn navigates_named_children() {
        let doc = sample();
        let shape = doc.main_shape().unwrap();
        assert_eq!(shape.tag(), MAIN_SHAPE);
        assert_eq!(shape.child_value::<u32>("Level").unwrap(), 0);
        assert_eq!(shape.child_value::<String>("Label").unwrap(), "wall");
        assert_eq!(shape.children().count(), 4);
        assert!(shape.child("Nope").is_none());
    }

    #[test]
    fn float_lists() {
        let doc = sample();
        let shape = doc.main_shape().unwrap();
        assert_eq!(shape.float_list("SplitsX").unwrap(), vec![1.5, 3.0]);
        assert!(shape.float_list("SplitsY").unwrap().is_empty());
    }

    #[test]
    fn typed_extraction_errors() {
        let doc = sample();
        let shape = doc.main_shape().unwrap();
        assert!(matches!(
            shape.child_value::<f32>("Broken"),
            Err(SourceError::InvalidText { .. })
        ));
        assert!(matches!(
            shape.child_value::<f32>("Missing"),
            Err(SourceError::MissingChild { .. })
        ));
        assert!(matches!(
            shape.child_value::<f32>("SplitsX"),
            Err(SourceError::MissingText { .. })
        ));
        assert_eq!(shape.optional_value::<u32>("UId").unwrap(), None);
    }

    #[test]
    fn main_shape_requires_known_root() {
        let bad = SourceElement::new("Other");
        assert!(bad.main_shape().is_err());
        let direct = SourceElement::new(MAIN_SHAPE);
        assert_eq!(direct.main_shape().unwrap().tag(), MAIN_SHAPE);
    }

    #[test]
    fn json_round_trip_through_file() {
        let doc = sample();
        let json = doc.to_json_string().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let loaded = SourceElement::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            SourceElement::from_json_str("{\"name\": 3}"),
            Err(SourceError::Decode(_))
        ));
        assert!(matches!(
            SourceElement::load_from_file("/nonexistent/layout.json"),
            Err(SourceError::Io(_))
        ));
    }
}
