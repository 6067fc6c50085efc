//! Domain types for slide content, assembled slides, and finished decks.

use serde::{Deserialize, Serialize};

/// One unit of input content: the markup for a single slide plus its
/// optional speaker notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    /// 1-based position of the slide this unit produces.
    pub index: usize,

    /// Slide markup (XML dialect understood by the renderer).
    pub markup: String,

    /// Speaker notes to attach, if any.
    #[serde(default)]
    pub notes: Option<String>,
}

impl ContentUnit {
    /// Create a content unit at the given 1-based position.
    pub fn new(index: usize, markup: impl Into<String>) -> Self {
        Self {
            index,
            markup: markup.into(),
            notes: None,
        }
    }

    /// Attach speaker notes to this unit.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// An axis-aligned bounding box in normalized canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a bounding box from origin and extent.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// The content carried by an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// A block of text.
    Text { text: String },
    /// A picture, referenced by source path; bytes are resolved at write
    /// time so rendering stays free of filesystem access.
    Image { source: String },
}

/// A leaf content item with its bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub bounds: BoundingBox,
}

impl Element {
    /// Create a text element.
    pub fn text(text: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            kind: ElementKind::Text { text: text.into() },
            bounds,
        }
    }

    /// Create an image element referencing a source file.
    pub fn image(source: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            kind: ElementKind::Image {
                source: source.into(),
            },
            bounds,
        }
    }
}

/// A single rendered slide.
///
/// Mutable (notes can still be attached) only until it is appended to a
/// [`Deck`]; the deck hands out slides by shared reference only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide position.
    pub position: usize,

    /// Elements in declared (stacking) order.
    pub elements: Vec<Element>,

    /// Speaker notes, once attached.
    pub notes: Option<String>,
}

impl Slide {
    /// Create an empty slide at the given 1-based position.
    pub fn new(position: usize) -> Self {
        Self {
            position,
            elements: Vec::new(),
            notes: None,
        }
    }

    /// Append an element in declared order.
    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Image sources referenced by this slide, in declared order.
    pub fn image_sources(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| match &e.kind {
                ElementKind::Image { source } => Some(source.as_str()),
                ElementKind::Text { .. } => None,
            })
            .collect()
    }
}

/// The full ordered set of slides destined for one artifact.
///
/// A deck can only be produced by `DeckAssembler::finalize` and is
/// read-only afterwards: amending notes or slides after assembly is not
/// expressible, any correction requires rebuilding the whole deck.
#[derive(Debug, Clone, Serialize)]
pub struct Deck {
    slides: Vec<Slide>,
}

impl Deck {
    pub(crate) fn from_slides(slides: Vec<Slide>) -> Self {
        Self { slides }
    }

    /// Slides in position order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    /// Number of slides in the deck.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Whether the deck holds no slides.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_edges() {
        let b = BoundingBox::new(0.1, 0.2, 0.5, 0.25);
        assert_eq!(b.right(), 0.6);
        assert_eq!(b.bottom(), 0.45);
    }

    #[test]
    fn test_slide_image_sources_in_order() {
        let mut slide = Slide::new(1);
        slide.add_element(Element::text("hi", BoundingBox::new(0.0, 0.0, 0.5, 0.1)));
        slide.add_element(Element::image("a.png", BoundingBox::new(0.0, 0.2, 0.5, 0.1)));
        slide.add_element(Element::image("b.png", BoundingBox::new(0.0, 0.4, 0.5, 0.1)));

        assert_eq!(slide.image_sources(), vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_content_unit_builder() {
        let unit = ContentUnit::new(3, "<slide/>").with_notes("say hello");
        assert_eq!(unit.index, 3);
        assert_eq!(unit.notes.as_deref(), Some("say hello"));
    }
}
