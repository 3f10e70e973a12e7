//! Decoding of externally extracted PDF page text

use crate::error::ParseError;
use crate::types::PdfLayout;

/// Turns raw PDF input into page text with layout hints
///
/// Implementations wrap an external text extractor. The crate ships
/// [`JsonLayoutLoader`] for extractors that emit the layout as JSON.
pub trait PdfLoader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<PdfLayout, ParseError>;
}

/// Reads the JSON layout document written by an external extractor
///
/// ```json
/// {"metadata": {"title": "..", "author": ".."},
///  "pages": [{"number": 1, "blocks": [{"text": "..", "font_size": 11.0}]}]}
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLayoutLoader;

impl PdfLoader for JsonLayoutLoader {
    fn load(&self, bytes: &[u8]) -> Result<PdfLayout, ParseError> {
        let layout: PdfLayout = serde_json::from_slice(bytes).map_err(ParseError::InvalidLayout)?;
        if layout.pages.is_empty() {
            return Err(ParseError::NoPages);
        }
        Ok(layout)
    }
}
