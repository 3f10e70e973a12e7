//! PDF pipeline: layout loading and chapter segmentation

mod loader;
mod segment;

pub use loader::{JsonLayoutLoader, PdfLoader};
pub use segment::{segment_pdf, Chapter, Segmentation, UNTITLED};
