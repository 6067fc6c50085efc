//! Slide markup parser implementation.
//!
//! The markup is a small XML dialect, one `<slide>` per content unit:
//!
//! ```xml
//! <slide>
//!   <text x="0.08" y="0.06" w="0.84" h="0.12">Title line</text>
//!   <image x="0.70" y="0.82" w="0.22" h="0.12" src="logo.png"/>
//! </slide>
//! ```
//!
//! Element order in the markup is the declared stacking order. Geometry
//! is in normalized canvas units. Rendering records image sources without
//! touching the filesystem.

use deck_core::{
    BoundingBox, ContentUnit, Element, Error, Result, Slide, SlideRender, TextNormalizer,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rayon::prelude::*;

/// Renderer for slide markup.
pub struct SlideRenderer {
    normalizer: TextNormalizer,
}

impl SlideRenderer {
    /// Create a new renderer.
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
        }
    }

    fn render_failure(&self, unit: &ContentUnit, reason: impl Into<String>) -> Error {
        Error::RenderFailure {
            slide: unit.index,
            reason: reason.into(),
        }
    }

    fn parse_markup(&self, unit: &ContentUnit) -> Result<Slide> {
        let mut reader = Reader::from_str(&unit.markup);
        reader.trim_text(true);

        let mut slide = Slide::new(unit.index);
        let mut saw_root = false;
        let mut current_box: Option<BoundingBox> = None;
        let mut current_text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"slide" => {
                        saw_root = true;
                    }
                    b"text" => {
                        if current_box.is_some() {
                            return Err(
                                self.render_failure(unit, "nested <text> elements are not allowed")
                            );
                        }
                        current_box = Some(
                            parse_bounds(e).map_err(|r| self.render_failure(unit, r))?,
                        );
                        current_text.clear();
                    }
                    other => {
                        return Err(self.render_failure(
                            unit,
                            format!(
                                "unknown element <{}>",
                                String::from_utf8_lossy(other)
                            ),
                        ));
                    }
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"image" => {
                        let bounds =
                            parse_bounds(e).map_err(|r| self.render_failure(unit, r))?;
                        let source = parse_attr(e, b"src")
                            .ok_or_else(|| {
                                self.render_failure(unit, "<image> is missing a src attribute")
                            })?;
                        slide.add_element(Element::image(source, bounds));
                    }
                    b"text" => {
                        let bounds =
                            parse_bounds(e).map_err(|r| self.render_failure(unit, r))?;
                        slide.add_element(Element::text("", bounds));
                    }
                    b"slide" => {
                        saw_root = true;
                    }
                    other => {
                        return Err(self.render_failure(
                            unit,
                            format!(
                                "unknown element <{}/>",
                                String::from_utf8_lossy(other)
                            ),
                        ));
                    }
                },
                Ok(Event::Text(ref e)) => {
                    if current_box.is_some() {
                        let text = e
                            .unescape()
                            .map_err(|e| self.render_failure(unit, format!("bad text: {}", e)))?;
                        current_text.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => {
                    if local_name(e.name().as_ref()) == b"text" {
                        let bounds = current_box.take().ok_or_else(|| {
                            self.render_failure(unit, "unbalanced </text>")
                        })?;
                        let text = self.normalizer.normalize_block(&current_text);
                        slide.add_element(Element::text(text, bounds));
                        current_text.clear();
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(
                        self.render_failure(unit, format!("malformed markup: {}", e))
                    );
                }
            }
        }

        if !saw_root {
            return Err(self.render_failure(unit, "markup has no <slide> root"));
        }

        log::debug!(
            "rendered slide {} with {} elements",
            slide.position,
            slide.elements.len()
        );
        Ok(slide)
    }
}

impl Default for SlideRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideRender for SlideRenderer {
    fn render(&self, unit: &ContentUnit) -> Result<Slide> {
        self.parse_markup(unit)
    }

    /// Render the batch in parallel; the collected results come back in
    /// input order, which is what lets the assembler append by index.
    fn render_batch(&self, units: &[ContentUnit]) -> Vec<Result<Slide>> {
        units.par_iter().map(|u| self.render(u)).collect()
    }
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Read a single attribute as UTF-8, if present.
fn parse_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Parse the x/y/w/h geometry attributes into a bounding box.
fn parse_bounds(e: &BytesStart) -> std::result::Result<BoundingBox, String> {
    let mut x = None;
    let mut y = None;
    let mut w = None;
    let mut h = None;

    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        let parsed = value.parse::<f64>();
        match attr.key.as_ref() {
            b"x" => x = Some(parsed.map_err(|_| format!("bad x value {:?}", value))?),
            b"y" => y = Some(parsed.map_err(|_| format!("bad y value {:?}", value))?),
            b"w" => w = Some(parsed.map_err(|_| format!("bad w value {:?}", value))?),
            b"h" => h = Some(parsed.map_err(|_| format!("bad h value {:?}", value))?),
            _ => {}
        }
    }

    match (x, y, w, h) {
        (Some(x), Some(y), Some(w), Some(h)) => Ok(BoundingBox::new(x, y, w, h)),
        _ => {
            let mut missing = Vec::new();
            if x.is_none() {
                missing.push("x");
            }
            if y.is_none() {
                missing.push("y");
            }
            if w.is_none() {
                missing.push("w");
            }
            if h.is_none() {
                missing.push("h");
            }
            Err(format!("missing geometry attribute(s): {}", missing.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::ElementKind;

    fn render(markup: &str) -> Result<Slide> {
        SlideRenderer::new().render(&ContentUnit::new(1, markup))
    }

    #[test]
    fn test_renders_text_and_image() {
        let slide = render(
            r#"<slide>
                <text x="0.1" y="0.05" w="0.8" h="0.15">Course Intro</text>
                <image x="0.1" y="0.25" w="0.3" h="0.3" src="diagram.png"/>
            </slide>"#,
        )
        .unwrap();

        assert_eq!(slide.elements.len(), 2);
        match &slide.elements[0].kind {
            ElementKind::Text { text } => assert_eq!(text, "Course Intro"),
            other => panic!("expected text, got {:?}", other),
        }
        assert_eq!(slide.image_sources(), vec!["diagram.png"]);
        assert_eq!(slide.elements[1].bounds, BoundingBox::new(0.1, 0.25, 0.3, 0.3));
    }

    #[test]
    fn test_declared_order_is_preserved() {
        let slide = render(
            r#"<slide>
                <text x="0" y="0.6" w="0.5" h="0.1">second on canvas</text>
                <text x="0" y="0.1" w="0.5" h="0.1">first on canvas</text>
            </slide>"#,
        )
        .unwrap();

        // Declared order, not canvas order, is what the validator sees.
        match &slide.elements[0].kind {
            ElementKind::Text { text } => assert_eq!(text, "second on canvas"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_unescapes_and_normalizes_text() {
        let slide = render(
            r#"<slide><text x="0" y="0" w="1" h="0.2">a &amp; b   c</text></slide>"#,
        )
        .unwrap();
        match &slide.elements[0].kind {
            ElementKind::Text { text } => assert_eq!(text, "a & b c"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_geometry_fails() {
        let err = render(r#"<slide><text x="0" y="0" w="1">hi</text></slide>"#).unwrap_err();
        match err {
            Error::RenderFailure { slide, reason } => {
                assert_eq!(slide, 1);
                assert!(reason.contains("h"), "reason: {}", reason);
            }
            other => panic!("expected RenderFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_geometry_fails() {
        let err =
            render(r#"<slide><text x="left" y="0" w="1" h="0.2">hi</text></slide>"#).unwrap_err();
        assert!(matches!(err, Error::RenderFailure { slide: 1, .. }));
    }

    #[test]
    fn test_image_requires_src() {
        let err = render(r#"<slide><image x="0" y="0" w="0.2" h="0.2"/></slide>"#).unwrap_err();
        match err {
            Error::RenderFailure { reason, .. } => assert!(reason.contains("src")),
            other => panic!("expected RenderFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_element_fails() {
        let err = render(r#"<slide><video x="0" y="0" w="1" h="1"/></slide>"#).unwrap_err();
        match err {
            Error::RenderFailure { reason, .. } => assert!(reason.contains("video")),
            other => panic!("expected RenderFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_markup_fails() {
        let err = render(r#"<slide><text x="0" y="0" w="1" h="0.2">hi"#).unwrap_err();
        assert!(matches!(err, Error::RenderFailure { slide: 1, .. }));
    }

    #[test]
    fn test_missing_root_fails() {
        let err = render("").unwrap_err();
        match err {
            Error::RenderFailure { reason, .. } => assert!(reason.contains("root")),
            other => panic!("expected RenderFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_preserves_input_order() {
        let renderer = SlideRenderer::new();
        let units: Vec<ContentUnit> = (1..=16)
            .map(|i| {
                ContentUnit::new(
                    i,
                    format!(r#"<slide><text x="0" y="0" w="1" h="0.2">slide {}</text></slide>"#, i),
                )
            })
            .collect();

        let results = renderer.render_batch(&units);

        assert_eq!(results.len(), 16);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.as_ref().unwrap().position, i + 1);
        }
    }

    #[test]
    fn test_batch_keeps_per_unit_errors_in_place() {
        let renderer = SlideRenderer::new();
        let units = vec![
            ContentUnit::new(1, r#"<slide><text x="0" y="0" w="1" h="0.2">ok</text></slide>"#),
            ContentUnit::new(2, "<broken"),
        ];

        let results = renderer.render_batch(&units);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
