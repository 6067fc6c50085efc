//! Error types for deck assembly and generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering, validating, assembling, or
/// writing a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// An element escapes the canvas or crowds its neighbor.
    #[error("slide {slide}: element {element} violates layout: {detail}")]
    LayoutViolation {
        /// 1-based slide position.
        slide: usize,
        /// 0-based index of the offending element in declared order.
        element: usize,
        /// Computed overflow or gap, in canvas units.
        detail: String,
    },

    /// A slide reached assembly without speaker notes.
    #[error("slide {slide}: speaker notes are missing")]
    MissingNotes { slide: usize },

    /// Speaker notes exceed the configured character ceiling.
    #[error("slide {slide}: notes are {length} chars, limit is {limit}")]
    NotesTooLong {
        slide: usize,
        length: usize,
        limit: usize,
    },

    /// The finalized deck does not contain the declared number of slides.
    #[error("expected {expected} slides, assembled {actual}")]
    SlideCountMismatch { expected: usize, actual: usize },

    /// A slide was appended out of position order.
    #[error("slide {position} appended after slide {last}; positions must strictly increase")]
    OutOfOrderSlide { position: usize, last: usize },

    /// The written artifact is smaller than the sanity threshold.
    #[error("artifact is {size} bytes, below the {minimum} byte sanity threshold")]
    SuspiciouslySmallArtifact { size: u64, minimum: u64 },

    /// The renderer could not turn a content unit into a slide.
    #[error("slide {slide}: render failed: {reason}")]
    RenderFailure { slide: usize, reason: String },

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML reading or writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// ZIP packaging error.
    #[error("ZIP error: {0}")]
    Zip(String),

    /// The deck manifest could not be understood.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

impl Error {
    /// The 1-based slide position this error is about, if it is per-slide.
    pub fn slide(&self) -> Option<usize> {
        match self {
            Error::LayoutViolation { slide, .. }
            | Error::MissingNotes { slide }
            | Error::NotesTooLong { slide, .. }
            | Error::RenderFailure { slide, .. } => Some(*slide),
            Error::OutOfOrderSlide { position, .. } => Some(*position),
            _ => None,
        }
    }
}
