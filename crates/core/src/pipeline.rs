//! The deck build pipeline.
//!
//! Orchestrates render, layout validation, notes attachment, assembly,
//! and the terminal write. The renderer and writer are trait seams so
//! the pipeline treats them as black boxes and tests can substitute
//! in-memory fakes.

use std::path::Path;
use std::time::Instant;

use crate::assembler::DeckAssembler;
use crate::config::{ErrorPolicy, PipelineConfig};
use crate::error::{Error, Result};
use crate::layout::LayoutValidator;
use crate::notes::{NotesAttacher, NotesOutcome};
use crate::report::{Artifact, BuildReport, SlideIssue};
use crate::types::{ContentUnit, Deck, Slide};

/// Turns one content unit into a slide.
///
/// Rendering must be side-effect-free: implementations may run the batch
/// in parallel as long as results come back in input order.
pub trait SlideRender: Sync {
    /// Render a single unit.
    fn render(&self, unit: &ContentUnit) -> Result<Slide>;

    /// Render a batch of units, returning one result per unit in input
    /// order. The default is sequential.
    fn render_batch(&self, units: &[ContentUnit]) -> Vec<Result<Slide>> {
        units.iter().map(|u| self.render(u)).collect()
    }
}

/// Serializes a finalized deck to one artifact.
///
/// The artifact must either fully exist after a successful return or not
/// exist at all; partial writes must never be observable.
pub trait DeckWrite {
    /// Write the deck to `path` and report what landed on disk.
    fn write(&self, deck: &Deck, path: &Path) -> Result<Artifact>;
}

/// Drives one deck build from content units to a persisted artifact.
pub struct Pipeline<R, W> {
    config: PipelineConfig,
    renderer: R,
    writer: W,
}

impl<R: SlideRender, W: DeckWrite> Pipeline<R, W> {
    /// Create a pipeline over the given renderer and writer.
    pub fn new(config: PipelineConfig, renderer: R, writer: W) -> Self {
        Self {
            config,
            renderer,
            writer,
        }
    }

    /// Build a deck from `units` and persist it at `output`.
    ///
    /// Stages: render all units (batch, index order), then per slide
    /// validate layout, attach notes, and append; finalize the deck and
    /// write it once. Under [`ErrorPolicy::FailFast`] the first error
    /// aborts the run; under [`ErrorPolicy::Collect`] every per-slide
    /// error is gathered. The artifact is written only when no error was
    /// recorded, so a failed build never leaves a deck file behind.
    pub fn run(&self, units: &[ContentUnit], output: &Path) -> BuildReport {
        let started = Instant::now();

        let mut ordered: Vec<ContentUnit> = units.to_vec();
        ordered.sort_by_key(|u| u.index);

        let mut errors: Vec<SlideIssue> = Vec::new();
        let mut warnings: Vec<SlideIssue> = Vec::new();

        let validator = LayoutValidator::new(&self.config);
        let attacher = NotesAttacher::new(&self.config);
        let mut assembler = DeckAssembler::new();

        log::info!("rendering {} content units", ordered.len());
        let rendered = self.renderer.render_batch(&ordered);

        for (unit, result) in ordered.iter().zip(rendered) {
            let stage_result = result.and_then(|mut slide| {
                validator.validate(&slide)?;
                match attacher.attach(&mut slide, unit.notes.as_deref())? {
                    NotesOutcome::Attached => {}
                    NotesOutcome::MissingTolerated => {
                        warnings.push(SlideIssue::from_error(&Error::MissingNotes {
                            slide: slide.position,
                        }));
                    }
                }
                assembler.push(slide)
            });

            if let Err(error) = stage_result {
                log::warn!("slide {} rejected: {}", unit.index, error);
                errors.push(SlideIssue::from_error(&error));
                if self.config.policy == ErrorPolicy::FailFast {
                    break;
                }
            }
        }

        let slide_count = assembler.len();
        let mut artifact = None;

        if errors.is_empty() {
            match self.finalize_and_write(assembler, output) {
                Ok(written) => artifact = Some(written),
                Err(error) => errors.push(SlideIssue::from_error(&error)),
            }
        }

        BuildReport {
            slide_count,
            expected_count: self.config.expected_count,
            artifact,
            elapsed_ms: started.elapsed().as_millis() as u64,
            errors,
            warnings,
        }
    }

    fn finalize_and_write(&self, assembler: DeckAssembler, output: &Path) -> Result<Artifact> {
        let deck = assembler.finalize(self.config.expected_count)?;
        let artifact = self.writer.write(&deck, output)?;
        log::info!(
            "wrote {} slides to {} ({} bytes)",
            deck.len(),
            artifact.path.display(),
            artifact.bytes
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Element};
    use std::path::PathBuf;

    /// Renders canned slides keyed by markup token.
    struct FakeRenderer;

    impl SlideRender for FakeRenderer {
        fn render(&self, unit: &ContentUnit) -> Result<Slide> {
            let mut slide = Slide::new(unit.index);
            match unit.markup.as_str() {
                "ok" => {
                    slide.add_element(Element::text(
                        "body",
                        BoundingBox::new(0.1, 0.1, 0.8, 0.2),
                    ));
                    Ok(slide)
                }
                "overflow" => {
                    slide.add_element(Element::text(
                        "body",
                        BoundingBox::new(0.1, 0.9, 0.8, 0.2),
                    ));
                    Ok(slide)
                }
                "fail" => Err(Error::RenderFailure {
                    slide: unit.index,
                    reason: "canned failure".into(),
                }),
                other => panic!("unknown fixture markup {:?}", other),
            }
        }
    }

    /// Pretends to persist and reports a plausible size.
    struct FakeWriter;

    impl DeckWrite for FakeWriter {
        fn write(&self, deck: &Deck, path: &Path) -> Result<Artifact> {
            Ok(Artifact {
                path: path.to_path_buf(),
                bytes: 2048 * deck.len().max(1) as u64,
            })
        }
    }

    fn unit(index: usize, markup: &str) -> ContentUnit {
        ContentUnit::new(index, markup).with_notes(format!("notes for {}", index))
    }

    fn pipeline(config: PipelineConfig) -> Pipeline<FakeRenderer, FakeWriter> {
        Pipeline::new(config, FakeRenderer, FakeWriter)
    }

    #[test]
    fn test_three_good_units_succeed() {
        let units = vec![unit(1, "ok"), unit(2, "ok"), unit(3, "ok")];
        let config = PipelineConfig::default().with_expected_count(3);

        let report = pipeline(config).run(&units, &PathBuf::from("deck.pptx"));

        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.slide_count, 3);
        assert!(report.artifact.unwrap().bytes > 1024);
    }

    #[test]
    fn test_units_are_processed_in_index_order() {
        let units = vec![unit(3, "ok"), unit(1, "ok"), unit(2, "ok")];
        let report = pipeline(PipelineConfig::default()).run(&units, &PathBuf::from("d.pptx"));
        assert!(report.is_success(), "errors: {:?}", report.errors);
        assert_eq!(report.slide_count, 3);
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let units = vec![unit(1, "ok"), unit(2, "fail"), unit(3, "fail")];
        let report = pipeline(PipelineConfig::default()).run(&units, &PathBuf::from("d.pptx"));

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].slide, Some(2));
        assert!(report.artifact.is_none());
    }

    #[test]
    fn test_collect_reports_every_error() {
        let units = vec![unit(1, "fail"), unit(2, "ok"), unit(3, "overflow")];
        let config = PipelineConfig::default().with_policy(ErrorPolicy::Collect);

        let report = pipeline(config).run(&units, &PathBuf::from("d.pptx"));

        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].slide, Some(1));
        assert_eq!(report.errors[1].slide, Some(3));
        // The good slide was assembled but nothing was written.
        assert_eq!(report.slide_count, 1);
        assert!(report.artifact.is_none());
    }

    #[test]
    fn test_count_mismatch_blocks_write() {
        let units = vec![unit(1, "ok"), unit(2, "ok")];
        let config = PipelineConfig::default().with_expected_count(40);

        let report = pipeline(config).run(&units, &PathBuf::from("d.pptx"));

        assert!(!report.is_success());
        assert!(report.artifact.is_none());
        assert!(report.errors[0].message.contains("expected 40"));
    }

    #[test]
    fn test_missing_notes_becomes_warning_by_default() {
        let units = vec![ContentUnit::new(1, "ok")];
        let report = pipeline(PipelineConfig::default()).run(&units, &PathBuf::from("d.pptx"));

        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].slide, Some(1));
    }

    #[test]
    fn test_missing_notes_fails_when_required() {
        let units = vec![ContentUnit::new(1, "ok")];
        let config = PipelineConfig::default().with_required_notes(true);

        let report = pipeline(config).run(&units, &PathBuf::from("d.pptx"));

        assert!(!report.is_success());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("notes are missing"));
    }

    #[test]
    fn test_layout_violation_is_reported_with_slide() {
        let units = vec![unit(1, "overflow")];
        let report = pipeline(PipelineConfig::default()).run(&units, &PathBuf::from("d.pptx"));

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].slide, Some(1));
        assert!(report.errors[0].message.contains("violates layout"));
    }
}
