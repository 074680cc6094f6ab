//! Harness settings

use anyhow::Context;
use screentest_common::{ConfigError, Parameters, RequestMethod};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::session::RenderSessionBuilder;

/// Settings for a harness instance and the render session it drives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Literal substrings that mark a failed render when found in output
    pub error_signatures: Vec<String>,

    /// Maximum renders in flight in a batch
    pub concurrency: usize,

    /// Request method used for batch renders
    pub request_method: RequestMethod,

    /// Per-render timeout; unset waits indefinitely
    pub render_timeout_ms: Option<u64>,

    /// Session attributes every render's channel starts with
    pub session_attributes: Parameters,

    /// Render session options
    pub render: RenderSettings,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            error_signatures: vec![
                "[Template Error".to_string(),
                "FTL stack trace".to_string(),
                "Could not find subscreen or transition".to_string(),
            ],
            concurrency: 1,
            request_method: RequestMethod::Get,
            render_timeout_ms: None,
            session_attributes: Parameters::new(),
            render: RenderSettings::default(),
        }
    }
}

/// Render session options; empty strings mean unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub webapp_name: String,
    pub root_screen: String,
    pub base_screen_path: String,
    pub output_type: String,
    pub character_encoding: String,
    pub macro_template_location: String,
    pub base_link_url: String,
    pub servlet_context_path: String,
    pub skip_structured_payload: bool,
}

impl RenderSettings {
    /// Apply in order: webapp, root screen, base path, then plain options
    pub fn apply(
        &self,
        mut builder: RenderSessionBuilder,
    ) -> Result<RenderSessionBuilder, ConfigError> {
        if !self.webapp_name.is_empty() {
            builder = builder.webapp_name(&self.webapp_name)?;
        }
        if !self.root_screen.is_empty() {
            builder = builder.root_screen(&self.root_screen)?;
        }
        if !self.base_screen_path.is_empty() {
            builder = builder.base_screen_path(&self.base_screen_path)?;
        }
        Ok(builder
            .output_type(self.output_type.as_str())
            .character_encoding(self.character_encoding.as_str())
            .macro_template_location(self.macro_template_location.as_str())
            .base_link_url(self.base_link_url.as_str())
            .servlet_context_path(self.servlet_context_path.as_str())
            .skip_structured_payload(self.skip_structured_payload))
    }
}

impl HarnessSettings {
    /// Load settings from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings {}", path.display()))?;
            let settings: Self = toml::from_str(&content)
                .with_context(|| format!("parsing settings {}", path.display()))?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_ms.map(Duration::from_millis)
    }

    /// Concurrency of at least one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
