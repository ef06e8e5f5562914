//! Conversion entry points – Markdown in, HTML document or PDF bytes out.
//!
//! One call runs one request through
//! `Received → Parsed → Rendered → Composed → Done(html)` or on through
//! `PdfRendering → Done(pdf) | Failed`. Only the PDF step can fail, and
//! nothing is retried.

use std::fmt;
use std::str::FromStr;

use crate::compose::{compose, ComposeOptions, ComposedDocument};
use crate::error::ConvertError;
use crate::html;
use crate::markdown;
use crate::pipeline::{FixedLayoutRenderer, ForgeRenderer};
use crate::templates::{TemplateInfo, TemplateRegistry};

/// Requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Html,
    Pdf,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown output format '{other}' (expected html or pdf)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
        })
    }
}

/// A successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutput {
    Html(ComposedDocument),
    Pdf(Vec<u8>),
}

impl ConversionOutput {
    pub fn format(&self) -> OutputFormat {
        match self {
            Self::Html(_) => OutputFormat::Html,
            Self::Pdf(_) => OutputFormat::Pdf,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html(_) => "text/html; charset=utf-8",
            Self::Pdf(_) => "application/pdf",
        }
    }

    pub fn suggested_filename(&self) -> &'static str {
        match self {
            Self::Html(_) => "resume.html",
            Self::Pdf(_) => "resume.pdf",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Html(doc) => doc.as_str().as_bytes(),
            Self::Pdf(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Html(doc) => doc.into_string().into_bytes(),
            Self::Pdf(bytes) => bytes,
        }
    }
}

/// Runs conversions against one template registry and one fixed-layout
/// renderer. Holds no per-request state, so a shared reference can serve
/// concurrent requests.
pub struct Converter {
    registry: TemplateRegistry,
    renderer: Box<dyn FixedLayoutRenderer>,
    compose_options: ComposeOptions,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("registry", &self.registry)
            .field("compose_options", &self.compose_options)
            .finish_non_exhaustive()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(TemplateRegistry::builtin())
    }
}

impl Converter {
    /// A converter using the built-in PDF engine with default page setup.
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            renderer: Box::new(ForgeRenderer::default()),
            compose_options: ComposeOptions::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: impl FixedLayoutRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_compose_options(mut self, options: ComposeOptions) -> Self {
        self.compose_options = options;
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Markdown → standalone HTML document. Never fails; an unknown
    /// template id uses the default template.
    pub fn convert_to_html(&self, source: &str, template_id: &str) -> ComposedDocument {
        log::debug!("received {} bytes of Markdown", source.len());
        let tree = markdown::parse(source);
        log::debug!("parsed {} top-level blocks", tree.blocks.len());
        let fragment = html::render(&tree);
        log::debug!("rendered {} bytes of HTML", fragment.len());
        let document = compose(&fragment, template_id, &self.registry, &self.compose_options);
        log::debug!(
            "composed document with template '{}'",
            self.registry.resolve(template_id).id
        );
        document
    }

    /// Markdown → PDF bytes.
    pub fn convert_to_pdf(&self, source: &str, template_id: &str) -> Result<Vec<u8>, ConvertError> {
        let document = self.convert_to_html(source, template_id);
        log::debug!("rendering PDF");
        match self.renderer.render(document.as_str()) {
            Ok(bytes) => {
                log::debug!("done: {} PDF bytes", bytes.len());
                Ok(bytes)
            }
            Err(e) => {
                log::error!("PDF rendering failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Convert to the requested format.
    pub fn convert(
        &self,
        source: &str,
        template_id: &str,
        format: OutputFormat,
    ) -> Result<ConversionOutput, ConvertError> {
        match format {
            OutputFormat::Html => Ok(ConversionOutput::Html(
                self.convert_to_html(source, template_id),
            )),
            OutputFormat::Pdf => self
                .convert_to_pdf(source, template_id)
                .map(ConversionOutput::Pdf),
        }
    }

    /// Every registered template, in registration order.
    pub fn list_templates(&self) -> Vec<TemplateInfo> {
        self.registry.infos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;

    struct FailingRenderer;

    impl FixedLayoutRenderer for FailingRenderer {
        fn render(&self, _html: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Layout("no room".into()))
        }
    }

    struct PanickingRenderer;

    impl FixedLayoutRenderer for PanickingRenderer {
        fn render(&self, _html: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Panicked("index out of bounds".into()))
        }
    }

    #[test]
    fn html_output_metadata() {
        let out = Converter::default()
            .convert("# Hi", "modern", OutputFormat::Html)
            .unwrap();
        assert_eq!(out.content_type(), "text/html; charset=utf-8");
        assert_eq!(out.suggested_filename(), "resume.html");
        assert!(String::from_utf8(out.into_bytes()).unwrap().contains("<h1 id=\"hi\">Hi</h1>"));
    }

    #[test]
    fn pdf_output_metadata() {
        let out = Converter::default()
            .convert("# Hi\n\nSome text.", "classic", OutputFormat::Pdf)
            .unwrap();
        assert_eq!(out.content_type(), "application/pdf");
        assert_eq!(out.suggested_filename(), "resume.pdf");
        assert!(out.as_bytes().starts_with(b"%PDF-"));
    }

    #[test]
    fn renderer_failure_is_layout_failure() {
        let converter = Converter::default().with_renderer(FailingRenderer);
        let err = converter.convert_to_pdf("# Hi", "modern").unwrap_err();
        assert!(matches!(err, ConvertError::LayoutRenderingFailed(_)));
        // HTML does not touch the renderer.
        assert!(converter.convert("# Hi", "modern", OutputFormat::Html).is_ok());
    }

    #[test]
    fn renderer_panic_is_internal() {
        let converter = Converter::default().with_renderer(PanickingRenderer);
        let err = converter.convert_to_pdf("# Hi", "modern").unwrap_err();
        assert!(matches!(err, ConvertError::Internal(_)));
        assert!(!err.user_message().contains("index"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(OutputFormat::Html.to_string(), "html");
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn lists_builtin_templates() {
        let ids: Vec<String> = Converter::default()
            .list_templates()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["modern", "classic", "minimal"]);
    }
}
