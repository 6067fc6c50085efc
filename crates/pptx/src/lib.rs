//! PPTX (Office Open XML) writer backend for slide deck generation.
//!
//! Serializes a finalized deck into a .pptx package, a ZIP archive of
//! XML documents, in one atomic operation.

pub mod writer;

mod parts;

pub use writer::DeckWriter;
