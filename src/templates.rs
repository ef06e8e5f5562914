//! Template registry – maps a template id to the CSS that styles a composed
//! document.
//!
//! A registry is built once at startup and only read afterwards, so a shared
//! reference can be used from any number of threads. Lookups never fail: an
//! unknown id resolves to the registry's designated default template.

use serde::Serialize;

use crate::error::ConfigError;

/// Id of the default built-in template.
pub const DEFAULT_TEMPLATE_ID: &str = "modern";

/// A named bundle of CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub css: String,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        css: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            css: css.into(),
        }
    }

    pub fn info(&self) -> TemplateInfo {
        TemplateInfo {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
        }
    }
}

/// The discoverable part of a template (no CSS body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInfo {
    pub id: String,
    pub display_name: String,
    pub description: String,
}

/// Read-only registry of templates with exactly one default.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
    default_index: usize,
}

impl TemplateRegistry {
    /// Build a registry. Ids must be unique and `default_id` must be one of
    /// them, so that fallback resolution can never miss.
    pub fn new(templates: Vec<Template>, default_id: &str) -> Result<Self, ConfigError> {
        if templates.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        for (i, t) in templates.iter().enumerate() {
            if templates[..i].iter().any(|other| other.id == t.id) {
                return Err(ConfigError::DuplicateTemplate(t.id.clone()));
            }
        }
        let default_index = templates
            .iter()
            .position(|t| t.id == default_id)
            .ok_or_else(|| ConfigError::UnknownDefault(default_id.to_string()))?;
        Ok(Self {
            templates,
            default_index,
        })
    }

    /// The templates shipped with the crate: `modern` (default), `classic`
    /// and `minimal`.
    pub fn builtin() -> Self {
        Self {
            templates: vec![
                Template::new(
                    "modern",
                    "Modern",
                    "Clean and contemporary design",
                    include_str!("../templates/modern.css"),
                ),
                Template::new(
                    "classic",
                    "Classic",
                    "Traditional professional layout",
                    include_str!("../templates/classic.css"),
                ),
                Template::new(
                    "minimal",
                    "Minimal",
                    "Simple and elegant design",
                    include_str!("../templates/minimal.css"),
                ),
            ],
            default_index: 0,
        }
    }

    /// Exact-match lookup.
    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Resolve an id to a template, substituting the default on a miss.
    pub fn resolve(&self, id: &str) -> &Template {
        match self.get(id) {
            Some(t) => t,
            None => {
                let fallback = self.default_template();
                log::debug!(
                    "template '{id}' is not registered; using default '{}'",
                    fallback.id
                );
                fallback
            }
        }
    }

    /// CSS body for `id`, or the default template's CSS on a miss.
    pub fn resolve_css(&self, id: &str) -> &str {
        &self.resolve(id).css
    }

    pub fn default_template(&self) -> &Template {
        &self.templates[self.default_index]
    }

    /// All templates in registration order.
    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    pub fn infos(&self) -> Vec<TemplateInfo> {
        self.templates.iter().map(Template::info).collect()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_in_registration_order() {
        let reg = TemplateRegistry::builtin();
        let ids: Vec<&str> = reg.list().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["modern", "classic", "minimal"]);
        assert_eq!(reg.default_template().id, DEFAULT_TEMPLATE_ID);
    }

    #[test]
    fn known_ids_resolve_to_their_own_css() {
        let reg = TemplateRegistry::builtin();
        for t in reg.list() {
            assert_eq!(reg.resolve_css(&t.id), t.css);
        }
        assert_ne!(reg.resolve_css("classic"), reg.resolve_css("modern"));
    }

    #[test]
    fn unknown_ids_fall_back_to_default() {
        let reg = TemplateRegistry::builtin();
        let default_css = reg.default_template().css.clone();
        for id in ["nonexistent", "", "MODERN", "modern "] {
            assert_eq!(reg.resolve_css(id), default_css);
        }
    }

    #[test]
    fn injected_registry_uses_its_own_default() {
        let reg = TemplateRegistry::new(
            vec![
                Template::new("a", "A", "first", "p { color: red }"),
                Template::new("b", "B", "second", "p { color: blue }"),
            ],
            "b",
        )
        .unwrap();
        assert_eq!(reg.resolve_css("zzz"), "p { color: blue }");
        assert_eq!(reg.resolve_css("a"), "p { color: red }");
    }

    #[test]
    fn registry_validation() {
        assert_eq!(
            TemplateRegistry::new(vec![], "x").unwrap_err(),
            ConfigError::EmptyRegistry
        );
        assert_eq!(
            TemplateRegistry::new(vec![Template::new("a", "A", "", "")], "b").unwrap_err(),
            ConfigError::UnknownDefault("b".into())
        );
        assert_eq!(
            TemplateRegistry::new(
                vec![Template::new("a", "A", "", ""), Template::new("a", "A2", "", "")],
                "a"
            )
            .unwrap_err(),
            ConfigError::DuplicateTemplate("a".into())
        );
    }

    #[test]
    fn info_serializes_camel_case() {
        let reg = TemplateRegistry::builtin();
        let json = serde_json::to_string(&reg.infos()).unwrap();
        assert!(json.contains("\"displayName\":\"Modern\""));
        assert!(!json.contains("css"));
    }
}
