//! Error types for the md-forge pipeline.
//!
//! Parsing, rendering and composing are total over text and never fail, so
//! the only runtime failure the core produces comes out of the fixed-layout
//! stage:
//!
//! * [`RenderError`]: what the layout engine itself reports (markup it cannot
//!   tokenize, a stylesheet with broken structure, a solver fault, a PDF
//!   serializer that produced nothing usable).
//! * [`ConvertError`]: the pipeline-level taxonomy handed to callers. A
//!   missing template is *not* an error; it falls back to the default.
//! * [`ConfigError`]: raised while constructing a template registry, before
//!   any request is served.

use thiserror::Error;

/// Failures of the fixed-layout (HTML → PDF) engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    /// The HTML could not be tokenized at all.
    #[error("malformed markup at byte {offset}: {message}")]
    Markup { offset: usize, message: String },

    /// A `<style>` block has broken structure (unbalanced braces, an
    /// unterminated comment or string).
    #[error("malformed stylesheet at byte {offset}: {message}")]
    Stylesheet { offset: usize, message: String },

    /// The layout solver rejected the box tree.
    #[error("layout failed: {0}")]
    Layout(String),

    /// The PDF serializer did not produce a valid byte stream.
    #[error("PDF serialization failed: {0}")]
    Pdf(String),

    /// The engine panicked; the payload message is kept for logs only.
    #[error("layout engine panicked: {0}")]
    Panicked(String),
}

impl From<taffy::TaffyError> for RenderError {
    fn from(e: taffy::TaffyError) -> Self {
        RenderError::Layout(e.to_string())
    }
}

/// Errors surfaced by the conversion pipeline and its boundary helpers.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input is empty or not recognisable as Markdown. Raised only by the
    /// boundary helpers in [`crate::source`], never by the pipeline itself.
    #[error("input rejected: {reason}")]
    InputRejected { reason: String },

    /// The fixed-layout renderer could not produce output. Never retried.
    #[error("layout rendering failed: {0}")]
    LayoutRenderingFailed(#[source] RenderError),

    /// Programmer error or resource exhaustion. The detail is for logs only.
    #[error("unexpected internal failure")]
    Internal(String),
}

impl ConvertError {
    pub fn input_rejected(reason: impl Into<String>) -> Self {
        ConvertError::InputRejected {
            reason: reason.into(),
        }
    }

    /// Message safe to show to an end user. Engine diagnostics stay in
    /// `Display`, `source()` and the logs.
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::InputRejected { reason } => reason.clone(),
            ConvertError::LayoutRenderingFailed(_) => {
                "The document could not be rendered to PDF".to_string()
            }
            ConvertError::Internal(_) => {
                "An unexpected error occurred while converting the document".to_string()
            }
        }
    }
}

impl From<RenderError> for ConvertError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Panicked(detail) => ConvertError::Internal(detail),
            other => ConvertError::LayoutRenderingFailed(other),
        }
    }
}

/// Invalid template registry construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a template registry needs at least one template")]
    EmptyRegistry,

    #[error("template id '{0}' is registered more than once")]
    DuplicateTemplate(String),

    #[error("default template '{0}' is not registered")]
    UnknownDefault(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_failure_hides_detail() {
        let e = ConvertError::Internal("index out of bounds at layout.rs:42".into());
        assert!(!e.to_string().contains("layout.rs"));
        assert!(!e.user_message().contains("layout.rs"));
    }

    #[test]
    fn panics_map_to_internal() {
        let e: ConvertError = RenderError::Panicked("boom".into()).into();
        assert!(matches!(e, ConvertError::Internal(_)));
    }

    #[test]
    fn layout_failure_keeps_diagnostic() {
        let e: ConvertError = RenderError::Stylesheet {
            offset: 12,
            message: "unbalanced '{'".into(),
        }
        .into();
        assert!(matches!(e, ConvertError::LayoutRenderingFailed(_)));
        assert!(!e.user_message().contains("unbalanced"));
        assert!(e.to_string().contains("unbalanced"));
    }
}
