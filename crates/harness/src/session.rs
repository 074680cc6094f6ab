//! Render session configuration
//!
//! Built once through a [`RenderSessionBuilder`], then frozen into an
//! `Arc<RenderSessionConfig>` shared read-only by every render.
//!
//! ```ignore
//! let session = harness
//!     .session()
//!     .root_screen("/apps/tools")?
//!     .base_screen_path("")?
//!     .output_type("html")
//!     .build();
//! ```

use screentest_common::{ConfigError, HarnessResult, RenderRequest, ScreenDefinition};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::boundary::{RenderInvocation, WebappRegistry};
use crate::resolver::{split_base_path, ScreenPathResolver};

/// Host used to pick a webapp's root screen
pub const LOCAL_HOST: &str = "localhost";

/// Resolved root and base screens
#[derive(Debug, Clone)]
struct ResolvedRoot {
    location: String,
    root: ScreenDefinition,
    base: ScreenDefinition,
}

/// Immutable render options shared by all renders of a session
#[derive(Clone)]
pub struct RenderSessionConfig {
    resolver: ScreenPathResolver,
    root: Option<ResolvedRoot>,
    base_screen_path: String,
    base_screen_path_segments: Vec<String>,
    output_type: Option<String>,
    character_encoding: Option<String>,
    macro_template_location: Option<String>,
    base_link_url: Option<String>,
    servlet_context_path: Option<String>,
    webapp_name: Option<String>,
    skip_structured_payload: bool,
}

impl std::fmt::Debug for RenderSessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSessionConfig")
            .field("root_screen_location", &self.root_screen_location())
            .field("base_screen_path", &self.base_screen_path)
            .field("output_type", &self.output_type)
            .field("webapp_name", &self.webapp_name)
            .finish_non_exhaustive()
    }
}

impl RenderSessionConfig {
    pub fn root_screen_location(&self) -> Option<&str> {
        self.root.as_ref().map(|r| r.location.as_str())
    }

    pub fn base_screen_path(&self) -> &str {
        &self.base_screen_path
    }

    pub fn base_screen_path_segments(&self) -> &[String] {
        &self.base_screen_path_segments
    }

    pub fn output_type(&self) -> Option<&str> {
        self.output_type.as_deref()
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    pub fn macro_template_location(&self) -> Option<&str> {
        self.macro_template_location.as_deref()
    }

    pub fn base_link_url(&self) -> Option<&str> {
        self.base_link_url.as_deref()
    }

    pub fn servlet_context_path(&self) -> Option<&str> {
        self.servlet_context_path.as_deref()
    }

    pub fn webapp_name(&self) -> Option<&str> {
        self.webapp_name.as_deref()
    }

    pub fn skip_structured_payload(&self) -> bool {
        self.skip_structured_payload
    }

    /// Resolve a request's screen path against this session's root and base.
    /// Returns `None` when no root screen is configured.
    pub fn resolve(&self, request: &RenderRequest) -> Option<HarnessResult<Vec<String>>> {
        let root = self.root.as_ref()?;
        Some(self.resolver.resolve_request(
            &root.root,
            &root.base,
            &self.base_screen_path_segments,
            request,
        ))
    }

    /// Bundle the non-empty options for the pipeline
    pub fn invocation(&self, path_segments: Vec<String>) -> RenderInvocation {
        RenderInvocation {
            root_screen: self.root_screen_location().unwrap_or_default().to_string(),
            path_segments,
            output_type: self.output_type.clone(),
            character_encoding: self.character_encoding.clone(),
            macro_template_location: self.macro_template_location.clone(),
            base_link_url: self.base_link_url.clone(),
            servlet_context_path: self.servlet_context_path.clone(),
            webapp_name: self.webapp_name.clone(),
        }
    }
}

/// Chaining builder for [`RenderSessionConfig`]
pub struct RenderSessionBuilder {
    config: RenderSessionConfig,
    webapps: Arc<dyn WebappRegistry>,
}

impl std::fmt::Debug for RenderSessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSessionBuilder").finish_non_exhaustive()
    }
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    (!value.is_empty()).then_some(value)
}

impl RenderSessionBuilder {
    pub fn new(resolver: ScreenPathResolver, webapps: Arc<dyn WebappRegistry>) -> Self {
        Self {
            config: RenderSessionConfig {
                resolver,
                root: None,
                base_screen_path: String::new(),
                base_screen_path_segments: Vec::new(),
                output_type: None,
                character_encoding: None,
                macro_template_location: None,
                base_link_url: None,
                servlet_context_path: None,
                webapp_name: None,
                skip_structured_payload: false,
            },
            webapps,
        }
    }

    /// Resolve and set the root screen; the base screen resets to the root
    pub fn root_screen(mut self, location: &str) -> Result<Self, ConfigError> {
        let root = self.config.resolver.resolve_root(location)?;
        debug!("Root screen set to {}", location);
        self.config.root = Some(ResolvedRoot {
            location: location.to_string(),
            base: root.clone(),
            root,
        });
        self.config.base_screen_path = String::new();
        self.config.base_screen_path_segments = Vec::new();
        Ok(self)
    }

    /// Set the base path that render paths are relative to.
    /// Requires a root screen and resolves every segment immediately.
    pub fn base_screen_path(mut self, path: &str) -> Result<Self, ConfigError> {
        let Some(resolved) = self.config.root.as_mut() else {
            return Err(ConfigError::NoRootScreen);
        };

        let (trimmed, segments) = split_base_path(path);
        resolved.base = if segments.is_empty() {
            resolved.root.clone()
        } else {
            self.config.resolver.resolve_base(&resolved.root, &segments)?
        };
        self.config.base_screen_path = trimmed;
        self.config.base_screen_path_segments = segments;
        Ok(self)
    }

    /// Select a webapp and activate the first of its root screens whose
    /// host pattern matches `localhost`. Leaves the root untouched when
    /// none match.
    pub fn webapp_name(mut self, name: &str) -> Result<Self, ConfigError> {
        self.config.webapp_name = non_empty(name);

        let mappings = self.webapps.root_screens(name);
        match mappings.iter().find(|m| m.matches_host(LOCAL_HOST)) {
            Some(mapping) => {
                info!("Webapp {} serves {} from {}", name, LOCAL_HOST, mapping.location);
                let location = mapping.location.clone();
                self.root_screen(&location)
            }
            None => {
                warn!("Webapp {} has no root screen for {}", name, LOCAL_HOST);
                Ok(self)
            }
        }
    }

    pub fn output_type(mut self, value: impl Into<String>) -> Self {
        self.config.output_type = non_empty(value);
        self
    }

    pub fn character_encoding(mut self, value: impl Into<String>) -> Self {
        self.config.character_encoding = non_empty(value);
        self
    }

    pub fn macro_template_location(mut self, value: impl Into<String>) -> Self {
        self.config.macro_template_location = non_empty(value);
        self
    }

    pub fn base_link_url(mut self, value: impl Into<String>) -> Self {
        self.config.base_link_url = non_empty(value);
        self
    }

    pub fn servlet_context_path(mut self, value: impl Into<String>) -> Self {
        self.config.servlet_context_path = non_empty(value);
        self
    }

    pub fn skip_structured_payload(mut self, skip: bool) -> Self {
        self.config.skip_structured_payload = skip;
        self
    }

    pub fn build(self) -> Arc<RenderSessionConfig> {
        Arc::new(self.config)
    }
}
