//! Speaker-notes attachment.
//!
//! Notes are bound to a slide before it reaches the assembler; once a
//! slide is inside a deck there is no way to amend them. Missing notes are
//! a warning by default and an error under `require_notes`.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::normalize::TextNormalizer;
use crate::types::Slide;

/// Outcome of attaching notes to one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesOutcome {
    /// Notes were normalized and attached.
    Attached,
    /// No notes were supplied and the configuration tolerates that.
    MissingTolerated,
}

/// Binds speaker notes to slides under the configured constraints.
#[derive(Debug, Clone)]
pub struct NotesAttacher {
    char_limit: usize,
    require_notes: bool,
    normalizer: TextNormalizer,
}

impl NotesAttacher {
    /// Create an attacher from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            char_limit: config.notes_char_limit,
            require_notes: config.require_notes,
            normalizer: TextNormalizer::new(),
        }
    }

    /// Attach `notes` to `slide`.
    ///
    /// Empty or whitespace-only notes count as missing. Notes over the
    /// character ceiling are rejected outright, never truncated.
    pub fn attach(&self, slide: &mut Slide, notes: Option<&str>) -> Result<NotesOutcome> {
        let normalized = notes.map(|n| self.normalizer.normalize_block(n));

        match normalized {
            Some(text) if !text.is_empty() => {
                let length = text.chars().count();
                if length > self.char_limit {
                    return Err(Error::NotesTooLong {
                        slide: slide.position,
                        length,
                        limit: self.char_limit,
                    });
                }
                slide.notes = Some(text);
                Ok(NotesOutcome::Attached)
            }
            _ => {
                if self.require_notes {
                    Err(Error::MissingNotes {
                        slide: slide.position,
                    })
                } else {
                    log::warn!("slide {}: no speaker notes supplied", slide.position);
                    Ok(NotesOutcome::MissingTolerated)
                }
            }
        }
    }
}
