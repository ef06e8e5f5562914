//! Document composer – wraps a rendered body fragment and a template's CSS
//! into one standalone HTML document.
//!
//! The CSS is inlined, so the document never references an external
//! stylesheet and can be laid out without any network access. Neither the
//! CSS (registry-controlled) nor the fragment (already escaped) is escaped
//! again here.

use crate::html::escape;
use crate::templates::TemplateRegistry;

/// Settings for the fixed document skeleton.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Content of `<title>` (default: "Resume").
    pub title: String,
    /// `lang` attribute on `<html>` (default: "en").
    pub lang: String,
    /// Class of the single container element (default: "resume-container").
    pub container_class: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            title: "Resume".to_string(),
            lang: "en".to_string(),
            container_class: "resume-container".to_string(),
        }
    }
}

/// A complete, standalone HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    html: String,
}

impl ComposedDocument {
    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    pub fn len(&self) -> usize {
        self.html.len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

impl AsRef<str> for ComposedDocument {
    fn as_ref(&self) -> &str {
        &self.html
    }
}

impl std::fmt::Display for ComposedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.html)
    }
}

/// Compose a document from a body fragment and the CSS resolved for
/// `template_id` (unknown ids use the registry default).
pub fn compose(
    fragment: &str,
    template_id: &str,
    registry: &TemplateRegistry,
    options: &ComposeOptions,
) -> ComposedDocument {
    let css = registry.resolve_css(template_id);

    let mut html = String::with_capacity(fragment.len() + css.len() + 512);
    html.push_str("<!DOCTYPE html>\n");
    html.push_str(&format!("<html lang=\"{}\">\n", escape(&options.lang)));
    html.push_str("<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("<title>{}</title>\n", escape(&options.title)));
    html.push_str("<style>\n");
    html.push_str(css.trim_end());
    html.push_str("\n</style>\n");
    html.push_str("</head>\n");
    html.push_str("<body>\n");
    html.push_str(&format!(
        "<div class=\"{}\">\n",
        escape(&options.container_class)
    ));
    html.push_str(fragment);
    if !fragment.is_empty() && !fragment.ends_with('\n') {
        html.push('\n');
    }
    html.push_str("</div>\n");
    html.push_str("</body>\n");
    html.push_str("</html>\n");

    ComposedDocument { html }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::Template;

    #[test]
    fn skeleton_is_complete() {
        let reg = TemplateRegistry::builtin();
        let doc = compose("<p>x</p>\n", "modern", &reg, &ComposeOptions::default());
        let html = doc.as_str();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<html").count(), 1);
        assert_eq!(html.matches("<style>").count(), 1);
        assert!(html.contains("<meta charset=\"UTF-8\">"));
        assert!(html.contains("<title>Resume</title>"));
        assert!(html.contains("<div class=\"resume-container\">\n<p>x</p>\n</div>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn css_comes_from_the_registry() {
        let reg = TemplateRegistry::new(
            vec![Template::new("t", "T", "", "h1 { color: #123456 }")],
            "t",
        )
        .unwrap();
        let doc = compose("", "unknown", &reg, &ComposeOptions::default());
        assert!(doc.as_str().contains("<style>\nh1 { color: #123456 }\n</style>"));
    }

    #[test]
    fn title_is_escaped() {
        let reg = TemplateRegistry::builtin();
        let options = ComposeOptions {
            title: "<b>CV</b>".into(),
            ..ComposeOptions::default()
        };
        let doc = compose("", "modern", &reg, &options);
        assert!(doc.as_str().contains("<title>&lt;b&gt;CV&lt;/b&gt;</title>"));
    }
}
