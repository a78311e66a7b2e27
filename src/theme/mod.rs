//! Theme engine
//!
//! This module provides HTML rendering using Tera.
//! Features:
//! - Built-in templates embedded in the binary
//! - Per-file overrides from a directory on disk
//! - A `markdown` filter backed by the post renderer
//! - Site variables injected into every render

use chrono::{Datelike, Utc};
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Filter, Tera};

use crate::config::SiteConfig;
use crate::services::MarkdownRenderer;

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct BuiltinTemplates;

/// Template rendering the 404 page
pub const NOT_FOUND_TEMPLATE: &str = "404.html";

/// Theme engine for rendering templates
pub struct ThemeEngine {
    tera: Tera,
    site_name: String,
    site_description: String,
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("site_name", &self.site_name)
            .field("templates", &self.template_names())
            .finish()
    }
}

impl ThemeEngine {
    /// Create a theme engine from the built-in templates plus any `.html`
    /// overrides found under `override_dir`.
    ///
    /// A missing override directory is not an error.
    pub fn new(
        override_dir: &Path,
        site: &SiteConfig,
        renderer: MarkdownRenderer,
    ) -> Result<Self, ThemeError> {
        let mut templates = builtin_templates()?;

        if override_dir.is_dir() {
            let mut overrides = Vec::new();
            collect_templates_from_dir(override_dir, override_dir, &mut overrides)?;
            for (name, content) in overrides {
                if templates.contains_key(&name) {
                    tracing::info!("Template override: {}", name);
                } else {
                    tracing::debug!("Extra template: {}", name);
                }
                templates.insert(name, content);
            }
        } else {
            tracing::debug!(
                "Template override directory {:?} not found, using built-in templates",
                override_dir
            );
        }

        Self::from_templates(templates, site, renderer)
    }

    /// Create a theme engine from the built-in templates only
    pub fn builtin(site: &SiteConfig, renderer: MarkdownRenderer) -> Result<Self, ThemeError> {
        Self::from_templates(builtin_templates()?, site, renderer)
    }

    fn from_templates(
        templates: BTreeMap<String, String>,
        site: &SiteConfig,
        renderer: MarkdownRenderer,
    ) -> Result<Self, ThemeError> {
        let mut tera = Tera::default();
        tera.register_filter("markdown", MarkdownFilter { renderer });
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(error_chain("Failed to load templates", &e)))?;

        Ok(Self {
            tera,
            site_name: site.name.clone(),
            site_description: site.description.clone(),
        })
    }

    /// Render a template with the site variables added to `context`.
    ///
    /// # Arguments
    /// * `template` - Template name (e.g., "posts/post_list.html")
    /// * `context` - Tera context with page variables
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        if !self.has_template(template) {
            return Err(ThemeError::NotFound(template.to_string()));
        }

        let mut full_context = context.clone();
        full_context.insert("site_name", &self.site_name);
        full_context.insert("site_description", &self.site_description);
        full_context.insert("current_year", &Utc::now().year());

        self.tera.render(template, &full_context).map_err(|e| {
            ThemeError::TemplateError(error_chain(&format!("Failed to render '{}'", template), &e))
        })
    }

    /// Check if a template is registered
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Registered template names, sorted
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }
}

/// `{{ value | markdown }}`: renders a string as HTML.
/// Empty or non-string values give an empty string.
struct MarkdownFilter {
    renderer: MarkdownRenderer,
}

impl Filter for MarkdownFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value.as_str() {
            Some(text) if !text.trim().is_empty() => Ok(Value::String(self.renderer.render(text))),
            _ => Ok(Value::String(String::new())),
        }
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn builtin_templates() -> Result<BTreeMap<String, String>, ThemeError> {
    let mut templates = BTreeMap::new();
    for name in BuiltinTemplates::iter() {
        let file = BuiltinTemplates::get(&name)
            .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
        let content = String::from_utf8(file.data.into_owned()).map_err(|e| {
            ThemeError::TemplateError(format!("Template {} is not valid UTF-8: {}", name, e))
        })?;
        templates.insert(name.replace('\\', "/"), content);
    }
    Ok(templates)
}

/// Collect `.html` files under `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ThemeError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;

            // Forward slashes on every platform
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

fn error_chain(prefix: &str, e: &tera::Error) -> String {
    let mut message = format!("{}: {}", prefix, e);
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}
