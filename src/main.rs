//! mdforge – command-line Markdown → HTML / PDF converter.
//!
//! Usage:
//!   mdforge <input.md> [-o output] [-t template] [-f html|pdf] [--landscape]
//!
//! If `-o` is omitted the output is written next to the input file as
//! `<stem>_resume.html` or `<stem>_resume.pdf`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use md_forge::compose::ComposeOptions;
use md_forge::convert::{Converter, OutputFormat};
use md_forge::pipeline::{compute_layout_config, ForgeRenderer, PageOrientation, PipelineConfig};
use md_forge::source::SourceDocument;
use md_forge::templates::{TemplateRegistry, DEFAULT_TEMPLATE_ID};

/// Convert Markdown to a styled HTML document or a paginated PDF.
#[derive(Parser, Debug)]
#[command(name = "mdforge", version, about, arg_required_else_help = true)]
struct Cli {
    /// Markdown file to convert (`.md`).
    #[arg(required_unless_present = "list_templates")]
    input: Option<PathBuf>,

    /// Output path (default: `<stem>_resume.<format>` next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Template id; unknown ids use the default template.
    #[arg(short, long, env = "MDFORGE_TEMPLATE", default_value = DEFAULT_TEMPLATE_ID)]
    template: String,

    /// Output format.
    #[arg(short, long, env = "MDFORGE_FORMAT", value_enum, default_value = "html")]
    format: FormatArg,

    /// Use landscape page orientation.
    #[arg(long)]
    landscape: bool,

    /// Document title (HTML `<title>` and PDF metadata).
    #[arg(long)]
    title: Option<String>,

    /// Also write the computed page layout as JSON to this path.
    #[arg(long, value_name = "PATH")]
    layout_json: Option<PathBuf>,

    /// Print the available templates as JSON and exit.
    #[arg(long)]
    list_templates: bool,

    /// Enable debug logging (`RUST_LOG` takes precedence).
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Html,
    Pdf,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Pdf => OutputFormat::Pdf,
        }
    }
}

fn default_output(input: &Path, stem: &str, format: OutputFormat) -> PathBuf {
    input.with_file_name(format!("{stem}_resume.{format}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let pipeline = PipelineConfig {
        title: cli.title.clone(),
        orientation: if cli.landscape {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        },
        ..PipelineConfig::default()
    };
    let mut compose_options = ComposeOptions::default();
    if let Some(title) = &cli.title {
        compose_options.title = title.clone();
    }
    let converter = Converter::new(TemplateRegistry::builtin())
        .with_renderer(ForgeRenderer::new(pipeline.clone()))
        .with_compose_options(compose_options);

    if cli.list_templates {
        println!("{}", serde_json::to_string_pretty(&converter.list_templates())?);
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("no input file specified");
    };
    let bytes = fs::read(input).with_context(|| format!("reading '{}'", input.display()))?;
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let source = SourceDocument::from_bytes(name, bytes)?;

    let format = OutputFormat::from(cli.format);
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(input, source.stem(), format));

    let result = converter
        .convert(source.text(), &cli.template, format)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("creating output directory")?;
    }
    fs::write(&output, result.as_bytes())
        .with_context(|| format!("writing '{}'", output.display()))?;
    eprintln!(
        "Wrote '{}' ({} bytes, {})",
        output.display(),
        result.as_bytes().len(),
        result.content_type()
    );

    if let Some(path) = &cli.layout_json {
        let html = converter.convert_to_html(source.text(), &cli.template);
        let layout = compute_layout_config(html.as_str(), &pipeline)
            .map_err(|e| anyhow::anyhow!("computing layout: {e}"))?;
        fs::write(path, layout.to_json())
            .with_context(|| format!("writing '{}'", path.display()))?;
        let pages = layout.pages.len();
        eprintln!(
            "Wrote '{}' ({} page{})",
            path.display(),
            pages,
            if pages == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_defaults_to_library_default() {
        let cli = Cli::try_parse_from(["mdforge", "cv.md"]).unwrap();
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::default());
        assert_eq!(
            default_output(Path::new("docs/cv.md"), "cv", cli.format.into()),
            PathBuf::from("docs/cv_resume.html")
        );
    }

    #[test]
    fn format_flag_selects_pdf() {
        let cli = Cli::try_parse_from(["mdforge", "cv.md", "-f", "pdf"]).unwrap();
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::Pdf);
    }
}
