//! # md-forge – Markdown → styled HTML → PDF
//!
//! Converts a Markdown document into a standalone, template-styled HTML
//! document, and optionally into a paginated PDF. The stages are:
//!
//! 1. **Parse** – Markdown → [`tree::DocumentTree`] ([`markdown`])
//! 2. **Render** – tree → HTML fragment with heading anchors ([`html`])
//! 3. **Compose** – fragment + template CSS → full document ([`compose`], [`templates`])
//! 4. **Lay out** – HTML + CSS → positioned boxes with Taffy
//!    ([`dom`], [`css`], [`style`], [`inline`], [`layout`])
//! 5. **Paginate** – boxes → pages honouring break hints ([`pagination`])
//! 6. **Render PDF** – pages → PDF bytes via printpdf ([`render`])
//!
//! [`convert::Converter`] ties the stages together. A C-compatible FFI
//! surface is exposed via the [`ffi`] module.

pub mod compose;
pub mod convert;
pub mod css;
pub mod dom;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod html;
pub mod inline;
pub mod layout;
pub mod layout_config;
pub mod markdown;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod slug;
pub mod source;
pub mod style;
pub mod templates;
pub mod tree;

// Re-exports for convenience
pub use compose::{compose, ComposeOptions, ComposedDocument};
pub use convert::{ConversionOutput, Converter, OutputFormat};
pub use error::{ConvertError, RenderError};
pub use pipeline::{generate_pdf, generate_pdf_from_html, PageOrientation, PipelineConfig};
pub use source::SourceDocument;
pub use templates::TemplateRegistry;
