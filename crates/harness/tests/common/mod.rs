//! Shared fixtures for harness integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use screentest_common::PipelineError;
use screentest_harness::{
    Collaborators, ExecutionContext, Fixture, RenderInvocation, RenderPipeline, ScreenTest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TREE: &str = r#"
webapps:
  webroot:
    root_screens:
      - host: "local.*"
        location: /apps
users:
  - username: john.doe
    handles: [sess-1]
  - username: locked
    disabled: true
screens:
  /apps:
    subscreens:
      tools: /apps/tools
  /apps/tools:
    template: "<nav>tools</nav>"
    subscreens:
      users: /apps/tools/users
      broken: /apps/tools/broken
      crash: /apps/tools/crash
      half: /apps/tools/half
      warned: /apps/tools/warned
      api: /apps/tools/api
      options: /apps/tools/options
      slow: /apps/tools/slow
      private: /apps/tools/private
      boom: /apps/tools/boom
      bare: /apps/tools/bare
  /apps/tools/users:
    template: "<h1>Users</h1>"
    subscreens:
      list: /apps/tools/users/list
  /apps/tools/users/list:
    scope:
      rowCount: 2
    template: "<ul><li>${user}</li><li>${rowCount} rows</li></ul>"
  /apps/tools/broken:
    template: "<div>${undefinedThing}</div>"
  /apps/tools/crash:
    fail: "division by zero"
  /apps/tools/half:
    partial: "<table>"
    fail: "row source closed"
  /apps/tools/warned:
    errors:
      - "Quantity must be positive"
    template: "<form/>"
  /apps/tools/api:
    json:
      items: [1, 2, 3]
  /apps/tools/options:
    template: "${outputType}|${encoding}|${baseLinkUrl}|${servletContextPath}|${webappName}|${macroTemplate}|${method}|${theme}"
  /apps/tools/slow:
    delay_ms: 400
    template: "done"
  /apps/tools/private:
    require_user: true
    template: "secret"
  /apps/tools/boom:
    template: "never written"
  /apps/tools/bare:
    template: "never written"
"#;

pub fn fixture() -> Arc<Fixture> {
    Arc::new(Fixture::from_yaml(TREE).expect("fixture parses"))
}

pub fn signatures() -> Vec<String> {
    vec![
        "[Template Error".to_string(),
        "FTL stack trace".to_string(),
        "Could not find subscreen or transition".to_string(),
    ]
}

pub fn harness() -> ScreenTest {
    ScreenTest::new(fixture().collaborators()).with_error_signatures(signatures())
}

/// Wraps a pipeline, counting invocations and tracking how many run at once
pub struct GaugePipeline {
    inner: Arc<dyn RenderPipeline>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub hold: Duration,
}

impl GaugePipeline {
    pub fn new(inner: Arc<dyn RenderPipeline>, hold: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            hold,
        })
    }
}

#[async_trait]
impl RenderPipeline for GaugePipeline {
    async fn render(
        &self,
        invocation: &RenderInvocation,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.hold).await;
        let result = self.inner.render(invocation, ctx).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Fixture collaborators with the pipeline swapped for a gauge
pub fn gauged(hold: Duration) -> (Collaborators, Arc<GaugePipeline>) {
    let mut collaborators = fixture().collaborators();
    let gauge = GaugePipeline::new(collaborators.pipeline.clone(), hold);
    collaborators.pipeline = gauge.clone() as Arc<dyn RenderPipeline>;
    (collaborators, gauge)
}

/// Writes the context's identity and authorization posture, then tries to
/// leak a session attribute for the next render
pub struct ProbePipeline;

#[async_trait]
impl RenderPipeline for ProbePipeline {
    async fn render(
        &self,
        _invocation: &RenderInvocation,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        let line = format!(
            "user={} authz_bypassed={} tarpit_suppressed={} depth={}",
            ctx.user().username().unwrap_or("-"),
            ctx.user().is_authz_bypassed(),
            ctx.user().is_rate_limiting_suppressed(),
            ctx.scope().depth(),
        );
        let channel = ctx
            .channel_mut()
            .ok_or_else(|| PipelineError::Render("no channel".to_string()))?;
        let seen = channel
            .request
            .session_attribute("marker")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        channel.request.set_session_attribute("marker", serde_json::json!("leaked"));
        channel.response.write(&format!("{} marker={}", line, seen));
        Ok(())
    }
}

pub fn probed() -> Collaborators {
    let mut collaborators = fixture().collaborators();
    collaborators.pipeline = Arc::new(ProbePipeline) as Arc<dyn RenderPipeline>;
    collaborators
}

/// Panics on `boom` after writing a fragment and on `bare` before writing
/// anything; every other path goes to the wrapped pipeline
pub struct PanickingPipeline {
    inner: Arc<dyn RenderPipeline>,
}

#[async_trait]
impl RenderPipeline for PanickingPipeline {
    async fn render(
        &self,
        invocation: &RenderInvocation,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        match invocation.path_segments.last().map(String::as_str) {
            Some("boom") => {
                if let Some(channel) = ctx.channel_mut() {
                    channel.response.write("<div>");
                }
                let rows: Vec<usize> = Vec::new();
                let row = rows[3];
                Err(PipelineError::Render(format!("unreachable row {}", row)))
            }
            Some("bare") => panic!("renderer state poisoned"),
            _ => self.inner.render(invocation, ctx).await,
        }
    }
}

pub fn panicking() -> Collaborators {
    let mut collaborators = fixture().collaborators();
    collaborators.pipeline = Arc::new(PanickingPipeline {
        inner: collaborators.pipeline.clone(),
    }) as Arc<dyn RenderPipeline>;
    collaborators
}
