//! Isolated render executor
//!
//! Every render runs on its own tokio task with a brand-new
//! [`ExecutionContext`]. The caller's identity crosses over only as an
//! [`IdentitySnapshot`]; the scope frame, channel and message state are
//! created inside the task and dropped with it.

use futures::FutureExt;
use screentest_common::{
    HarnessError, HarnessResult, IdentitySnapshot, Parameters, PipelineError, RenderRequest,
    RenderResult, UsageError,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, Instrument};

use crate::boundary::Collaborators;
use crate::channel::Channel;
use crate::classify::ErrorClassifier;
use crate::context::ExecutionContext;
use crate::resolver::ScreenPathResolver;
use crate::session::{RenderSessionBuilder, RenderSessionConfig};
use crate::settings::HarnessSettings;
use crate::stats::HarnessStats;

/// The render harness. Cheap to clone; clones share stats.
#[derive(Clone)]
pub struct ScreenTest {
    collaborators: Collaborators,
    classifier: Arc<ErrorClassifier>,
    stats: Arc<HarnessStats>,
    session_attributes: Arc<Parameters>,
    render_timeout: Option<Duration>,
}

impl ScreenTest {
    /// A harness with no error signatures, no session attributes and no timeout
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            classifier: Arc::new(ErrorClassifier::default()),
            stats: Arc::new(HarnessStats::new()),
            session_attributes: Arc::new(Parameters::new()),
            render_timeout: None,
        }
    }

    pub fn from_settings(collaborators: Collaborators, settings: &HarnessSettings) -> Self {
        Self::new(collaborators)
            .with_error_signatures(settings.error_signatures.clone())
            .with_session_attributes(settings.session_attributes.clone())
            .with_render_timeout(settings.render_timeout())
    }

    pub fn with_error_signatures(mut self, signatures: Vec<String>) -> Self {
        self.classifier = Arc::new(ErrorClassifier::new(signatures));
        self
    }

    pub fn with_session_attributes(mut self, attributes: Parameters) -> Self {
        self.session_attributes = Arc::new(attributes);
        self
    }

    pub fn with_render_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.render_timeout = timeout;
        self
    }

    /// Start configuring a render session against this harness's screen model
    pub fn session(&self) -> RenderSessionBuilder {
        RenderSessionBuilder::new(
            ScreenPathResolver::new(self.collaborators.screens.clone()),
            self.collaborators.webapps.clone(),
        )
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn stats(&self) -> &HarnessStats {
        &self.stats
    }

    pub fn session_attributes(&self) -> &Parameters {
        &self.session_attributes
    }

    /// Render `screen_path` with a GET and no parameters
    pub async fn render(
        &self,
        caller: &ExecutionContext,
        session: &Arc<RenderSessionConfig>,
        screen_path: &str,
    ) -> HarnessResult<RenderResult> {
        self.execute(caller, session, RenderRequest::new(screen_path)).await
    }

    /// Run one render in a fresh execution context on its own task.
    ///
    /// Resolution happens before the task is spawned, so an unresolvable
    /// path never reaches the pipeline. Pipeline failures, panics included,
    /// are folded into the result; setup failures inside the task are
    /// returned once it has unwound.
    pub async fn execute(
        &self,
        caller: &ExecutionContext,
        session: &Arc<RenderSessionConfig>,
        request: RenderRequest,
    ) -> HarnessResult<RenderResult> {
        let segments = session.resolve(&request).ok_or(UsageError::NoRootScreen)??;
        let identity = caller.user().snapshot();
        let path = request.screen_path.clone();

        let unit = RenderUnit {
            harness: self.clone(),
            session: session.clone(),
            request,
            segments,
            identity,
        };
        let handle = tokio::spawn(unit.run().instrument(info_span!("render", path = %path)));
        let abort = handle.abort_handle();

        let joined = match self.render_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    return Err(HarnessError::Timeout {
                        path,
                        millis: limit.as_millis() as u64,
                    });
                }
            },
            None => handle.await,
        };

        let result = joined
            .map_err(|e| HarnessError::ExecutionUnit(format!("render of {}: {}", path, e)))??;
        // only joined renders count, so a timed-out one never does
        self.stats.record(&result);
        Ok(result)
    }
}

/// Everything a render task owns
struct RenderUnit {
    harness: ScreenTest,
    session: Arc<RenderSessionConfig>,
    request: RenderRequest,
    segments: Vec<String>,
    identity: IdentitySnapshot,
}

impl RenderUnit {
    async fn run(self) -> HarnessResult<RenderResult> {
        let RenderUnit {
            harness,
            session,
            request,
            segments,
            identity,
        } = self;
        let path = request.screen_path;
        let collaborators = &harness.collaborators;

        let mut ctx = ExecutionContext::new();
        ctx.user_mut()
            .restore(&identity, collaborators.authenticator.as_ref())
            .await?;
        if identity.authz_disabled {
            ctx.user_mut().bypass_authz();
        }
        // never an end-user request, so no throttling
        ctx.user_mut().suppress_rate_limiting();

        ctx.scope_mut().push();
        let channel = Channel::new(
            request.request_method,
            &request.parameters,
            &harness.session_attributes,
        )
        .skip_structured_payload(session.skip_structured_payload());
        ctx.attach_channel(channel);
        let invocation = session.invocation(segments);

        let started = Instant::now();
        let failure = match AssertUnwindSafe(collaborators.pipeline.render(&invocation, &mut ctx))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome.err(),
            Err(panic) => Some(PipelineError::Panicked(panic_message(panic.as_ref()))),
        };
        let render_time_ms = started.elapsed().as_millis() as u64;

        let post_render_scope = ctx.scope_mut().pop().unwrap_or_default();
        let (mut output_text, structured_payload) = ctx
            .detach_channel()
            .map(Channel::into_output)
            .unwrap_or((None, None));
        let structured_errors = ctx.messages_mut().take_errors();

        let error_messages = harness.classifier.classify(
            &path,
            failure.as_ref(),
            structured_errors,
            &mut output_text,
        );

        let result = RenderResult {
            screen_path: path,
            output_text,
            structured_payload,
            render_time_ms,
            post_render_scope,
            error_messages,
        };
        debug!(
            "Rendered {} in {} ms ({} chars, {} errors)",
            result.screen_path,
            result.render_time_ms,
            result.output_chars(),
            result.error_messages.len()
        );
        Ok(result)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
