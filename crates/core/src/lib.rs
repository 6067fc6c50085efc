//! Core domain types, validation, and the deck assembly pipeline
//! for slide deck generation.

pub mod assembler;
pub mod config;
pub mod error;
pub mod layout;
pub mod normalize;
pub mod notes;
pub mod pipeline;
pub mod report;
pub mod types;

pub use assembler::DeckAssembler;
pub use config::{ErrorPolicy, PipelineConfig};
pub use error::{Error, Result};
pub use layout::LayoutValidator;
pub use normalize::TextNormalizer;
pub use notes::{NotesAttacher, NotesOutcome};
pub use pipeline::{DeckWrite, Pipeline, SlideRender};
pub use report::{Artifact, BuildReport, SlideIssue};
pub use types::{BoundingBox, ContentUnit, Deck, Element, ElementKind, Slide};
