//! Prompt Loader
//!
//! Resolves prompt templates from an override directory or falls back to embedded defaults.
//! All templates are read and compiled at construction so rendering never touches the disk.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine with every known template registered
    hbs: Handlebars<'static>,
    /// Override directory holding `{name}.pmt` files
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader, registering every template
    ///
    /// Checks in order:
    /// 1. Override: `{dir}/{name}.pmt`
    /// 2. Embedded fallback
    pub fn new(override_dir: Option<&Path>) -> Result<Self> {
        let override_dir = override_dir.filter(|d| d.exists()).map(Path::to_path_buf);
        debug!(?override_dir, "PromptLoader::new: called");

        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        for name in embedded::TEMPLATE_NAMES {
            let source = load_template(override_dir.as_deref(), name)?;
            hbs.register_template_string(name, source)
                .map_err(|e| eyre!("Failed to compile template {}: {}", name, e))?;
        }

        Ok(Self { hbs, override_dir })
    }

    /// Override directory in use, if any
    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Result<Self> {
        Self::new(None)
    }

    /// Render a registered template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "render: called");
        self.hbs
            .render(template_name, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}

fn load_template(override_dir: Option<&Path>, name: &str) -> Result<String> {
    if let Some(dir) = override_dir {
        let path = dir.join(format!("{}.pmt", name));
        if path.exists() {
            info!("Loading prompt from override: {:?}", path);
            return std::fs::read_to_string(&path).map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
        }
    }

    if let Some(content) = embedded::get_embedded(name) {
        debug!("Using embedded prompt: {}", name);
        return Ok(content.to_string());
    }

    Err(eyre!("Prompt template not found: {}", name))
}
