//! Input boundary – checks an uploaded file before it enters the pipeline.

use std::path::Path;

use crate::error::ConvertError;

/// Markdown text received for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    name: String,
    text: String,
}

impl SourceDocument {
    /// Accepts non-empty UTF-8 content from a file named `*.md`.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, ConvertError> {
        let is_markdown = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("md"));
        if !is_markdown {
            return Err(ConvertError::input_rejected(
                "Only Markdown (.md) files are supported",
            ));
        }
        if bytes.is_empty() {
            return Err(ConvertError::input_rejected("The uploaded file is empty"));
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| ConvertError::input_rejected("The file is not valid UTF-8 text"))?;
        Ok(Self {
            name: name.to_string(),
            text,
        })
    }

    /// Wraps text that is already known to be Markdown. Empty text is
    /// still rejected.
    pub fn from_text(text: impl Into<String>) -> Result<Self, ConvertError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ConvertError::input_rejected("The document is empty"));
        }
        Ok(Self {
            name: "document.md".to_string(),
            text,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte length of the text.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// File stem, used to name outputs.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
    }
}
