//! Contracts of the collaborators the harness drives but does not implement

use async_trait::async_trait;
use screentest_common::{
    Authenticator, Parameters, PipelineError, RootScreenMapping, ScreenDefinition, SubscreenRef,
};
use std::sync::Arc;

use crate::context::ExecutionContext;

/// The screen-definition model and its path grammar
pub trait ScreenModel: Send + Sync {
    /// Load the screen at `location`
    fn resolve(&self, location: &str) -> Option<ScreenDefinition>;

    /// Look up the subscreen `name` of `screen`
    fn subscreen(&self, screen: &ScreenDefinition, name: &str) -> Option<SubscreenRef>;

    /// Canonical segments from the root for `requested`, relative to `base`.
    /// The result includes `base_segments` as its prefix.
    fn parse_path(
        &self,
        root: &ScreenDefinition,
        base: &ScreenDefinition,
        base_segments: &[String],
        requested: &str,
        parameters: &Parameters,
    ) -> Option<Vec<String>>;
}

/// Webapp registration: which root screens a webapp serves for which hosts
pub trait WebappRegistry: Send + Sync {
    fn root_screens(&self, webapp_name: &str) -> Vec<RootScreenMapping>;
}

/// Render options and the resolved path handed to the pipeline.
/// Options left empty in the session are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderInvocation {
    pub root_screen: String,
    pub path_segments: Vec<String>,
    pub output_type: Option<String>,
    pub character_encoding: Option<String>,
    pub macro_template_location: Option<String>,
    pub base_link_url: Option<String>,
    pub servlet_context_path: Option<String>,
    pub webapp_name: Option<String>,
}

/// The rendering engine. Output goes into the context's channel.
#[async_trait]
pub trait RenderPipeline: Send + Sync {
    async fn render(
        &self,
        invocation: &RenderInvocation,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError>;
}

/// Handles to every external collaborator of one harness
#[derive(Clone)]
pub struct Collaborators {
    pub screens: Arc<dyn ScreenModel>,
    pub webapps: Arc<dyn WebappRegistry>,
    pub pipeline: Arc<dyn RenderPipeline>,
    pub authenticator: Arc<dyn Authenticator>,
}
