//! Declarative YAML fixture implementing every collaborator in memory
//!
//! A fixture describes a screen tree, webapp root-screen mappings and users.
//! Each screen may carry an output template plus scripted behavior (scope
//! variables, structured errors, failures, delays) so renders can be driven
//! end to end without an external engine.
//!
//! ```yaml
//! webapps:
//!   webroot:
//!     root_screens:
//!       - host: "local.*"
//!         location: /apps
//! users:
//!   - username: john.doe
//!     handles: [sess-1]
//! screens:
//!   /apps:
//!     subscreens:
//!       tools: /apps/tools
//!     template: "<body>"
//!   /apps/tools:
//!     template: "<h1>Tools for ${user}</h1>"
//! ```

use async_trait::async_trait;
use screentest_common::{
    Authenticator, HarnessError, HarnessResult, IdentityError, LoginHandle, Parameters,
    PipelineError, Principal, RootScreenMapping, ScreenDefinition, SubscreenRef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::boundary::{Collaborators, RenderInvocation, RenderPipeline, ScreenModel, WebappRegistry};
use crate::context::ExecutionContext;

/// A whole fixture document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub webapps: BTreeMap<String, WebappFixture>,

    #[serde(default)]
    pub users: Vec<UserFixture>,

    #[serde(default)]
    pub screens: BTreeMap<String, ScreenFixture>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebappFixture {
    #[serde(default)]
    pub root_screens: Vec<RootScreenMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFixture {
    pub username: String,

    /// Login session handles that resolve to this user
    #[serde(default)]
    pub handles: Vec<String>,

    #[serde(default)]
    pub disabled: bool,
}

/// One screen and its scripted render behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenFixture {
    /// Subscreen name to screen location
    #[serde(default)]
    pub subscreens: BTreeMap<String, String>,

    /// Output with `${name}` placeholders
    #[serde(default)]
    pub template: Option<String>,

    /// Structured payload sent instead of (or after) the template
    #[serde(default)]
    pub json: Option<Value>,

    /// Variables set in the render scope
    #[serde(default)]
    pub scope: Parameters,

    /// Structured error messages emitted without failing
    #[serde(default)]
    pub errors: Vec<String>,

    /// Text written before `fail` is raised
    #[serde(default)]
    pub partial: Option<String>,

    /// Raise a pipeline error with this message
    #[serde(default)]
    pub fail: Option<String>,

    #[serde(default)]
    pub delay_ms: Option<u64>,

    /// Emit a structured error when rendered anonymously
    #[serde(default)]
    pub require_user: bool,
}

impl Fixture {
    pub fn from_yaml(yaml: &str) -> HarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| HarnessError::Fixture(e.to_string()))
    }

    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Hand the same fixture out as every collaborator
    pub fn collaborators(self: Arc<Self>) -> Collaborators {
        Collaborators {
            screens: self.clone(),
            webapps: self.clone(),
            pipeline: self.clone(),
            authenticator: self,
        }
    }

    fn screen(&self, location: &str) -> Option<&ScreenFixture> {
        self.screens.get(location)
    }

    /// Screens from the root along `segments`, root first
    fn chain(
        &self,
        root: &str,
        segments: &[String],
    ) -> Result<Vec<(String, &ScreenFixture)>, PipelineError> {
        let mut location = root.to_string();
        let mut screen = self
            .screen(&location)
            .ok_or_else(|| PipelineError::ScreenNotFound(location.clone()))?;
        let mut chain = vec![(location.clone(), screen)];

        for segment in segments {
            location = screen.subscreens.get(segment).cloned().ok_or_else(|| {
                PipelineError::ScreenNotFound(format!("{} under {}", segment, location))
            })?;
            screen = self
                .screen(&location)
                .ok_or_else(|| PipelineError::ScreenNotFound(location.clone()))?;
            chain.push((location.clone(), screen));
        }
        Ok(chain)
    }
}

impl ScreenModel for Fixture {
    fn resolve(&self, location: &str) -> Option<ScreenDefinition> {
        self.screen(location).map(|_| ScreenDefinition::new(location))
    }

    fn subscreen(&self, screen: &ScreenDefinition, name: &str) -> Option<SubscreenRef> {
        let location = self.screen(&screen.location)?.subscreens.get(name)?;
        Some(SubscreenRef {
            name: name.to_string(),
            location: location.clone(),
        })
    }

    fn parse_path(
        &self,
        _root: &ScreenDefinition,
        base: &ScreenDefinition,
        base_segments: &[String],
        requested: &str,
        _parameters: &Parameters,
    ) -> Option<Vec<String>> {
        let mut current = base.location.clone();
        let mut segments = base_segments.to_vec();

        for segment in requested.split('/').filter(|s| !s.is_empty()) {
            let next = self.screen(&current)?.subscreens.get(segment)?;
            self.screen(next)?;
            current = next.clone();
            segments.push(segment.to_string());
        }
        Some(segments)
    }
}

impl WebappRegistry for Fixture {
    fn root_screens(&self, webapp_name: &str) -> Vec<RootScreenMapping> {
        self.webapps
            .get(webapp_name)
            .map(|w| w.root_screens.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Authenticator for Fixture {
    async fn login_by_handle(&self, handle: &LoginHandle) -> Result<Principal, IdentityError> {
        let user = self
            .users
            .iter()
            .find(|u| u.handles.iter().any(|h| h == handle.as_str()))
            .ok_or(IdentityError::UnknownHandle)?;
        active(user)
    }

    async fn login_by_username(&self, username: &str) -> Result<Principal, IdentityError> {
        let user = self
            .users
            .iter()
            .find(|u| u.username == username)
            .ok_or_else(|| IdentityError::UnknownUser(username.to_string()))?;
        active(user)
    }
}

fn active(user: &UserFixture) -> Result<Principal, IdentityError> {
    if user.disabled {
        return Err(IdentityError::Disabled(user.username.clone()));
    }
    Ok(Principal {
        username: user.username.clone(),
    })
}

fn content_type_for(output_type: &str) -> String {
    match output_type {
        "html" => "text/html".to_string(),
        "text" => "text/plain".to_string(),
        "json" => "application/json".to_string(),
        "xml" => "text/xml".to_string(),
        other => other.to_string(),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Look a placeholder up: render options, then parameters, scope, session
fn lookup(name: &str, invocation: &RenderInvocation, ctx: &ExecutionContext) -> Option<String> {
    let option = match name {
        "user" => Some(ctx.user().username().unwrap_or("anonymous").to_string()),
        "path" => Some(invocation.path_segments.join("/")),
        "rootScreen" => Some(invocation.root_screen.clone()),
        "outputType" => invocation.output_type.clone(),
        "encoding" => invocation.character_encoding.clone(),
        "macroTemplate" => invocation.macro_template_location.clone(),
        "baseLinkUrl" => invocation.base_link_url.clone(),
        "servletContextPath" => invocation.servlet_context_path.clone(),
        "webappName" => invocation.webapp_name.clone(),
        "method" => ctx.channel().map(|c| c.request.method().to_string()),
        _ => None,
    };
    if option.is_some() {
        return option;
    }

    let channel = ctx.channel();
    channel
        .and_then(|c| c.request.parameter(name))
        .or_else(|| ctx.scope().get(name))
        .or_else(|| channel.and_then(|c| c.request.session_attribute(name)))
        .map(display)
}

/// Substitute `${name}` placeholders. Undefined names render an inline
/// template error marker rather than failing.
fn expand(template: &str, invocation: &RenderInvocation, ctx: &ExecutionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = after[..end].trim();
                match lookup(name, invocation, ctx) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&format!("[Template Error: ${{{}}} is undefined]", name)),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl RenderPipeline for Fixture {
    async fn render(
        &self,
        invocation: &RenderInvocation,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        let chain = self.chain(&invocation.root_screen, &invocation.path_segments)?;

        {
            let channel = ctx
                .channel_mut()
                .ok_or_else(|| PipelineError::Render("no channel attached".to_string()))?;
            if let Some(output_type) = &invocation.output_type {
                channel.response.set_content_type(content_type_for(output_type));
            }
            if let Some(encoding) = &invocation.character_encoding {
                channel.response.set_character_encoding(encoding.clone());
            }
        }

        for (location, screen) in chain {
            if let Some(ms) = screen.delay_ms {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }

            if screen.require_user && ctx.user().username().is_none() {
                ctx.messages_mut()
                    .add_error(format!("User must be logged in to view {}", location));
                continue;
            }

            for (name, value) in &screen.scope {
                ctx.scope_mut().set(name.clone(), value.clone());
            }
            for error in &screen.errors {
                ctx.messages_mut().add_error(error.clone());
            }

            let text = screen
                .template
                .as_deref()
                .map(|t| expand(t, invocation, &*ctx));

            let Some(channel) = ctx.channel_mut() else {
                return Err(PipelineError::Render("channel detached during render".to_string()));
            };
            if let Some(partial) = &screen.partial {
                channel.response.write(partial);
            }
            if let Some(message) = &screen.fail {
                return Err(PipelineError::Render(message.clone()));
            }
            if let Some(text) = text {
                channel.response.write(&text);
            }
            if let Some(payload) = &screen.json {
                channel.response.send_structured(payload.clone())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use screentest_common::RequestMethod;
    use serde_json::json;

    const TREE: &str = r#"
users:
  - username: john.doe
    handles: [sess-1]
  - username: gone
    disabled: true
screens:
  /apps:
    template: "[${webappName}]"
    subscreens:
      tools: /apps/tools
  /apps/tools:
    scope:
      title: Tools
    template: "<h1>${title} for ${user} (${id})</h1><p>${missing}</p>"
"#;

    fn invocation(segments: &[&str]) -> RenderInvocation {
        RenderInvocation {
            root_screen: "/apps".to_string(),
            path_segments: segments.iter().map(|s| s.to_string()).collect(),
            webapp_name: Some("webroot".to_string()),
            output_type: Some("html".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_path_prefixes_base() {
        let fixture = Fixture::from_yaml(TREE).unwrap();
        let root = fixture.resolve("/apps").unwrap();
        let base = fixture.resolve("/apps/tools").unwrap();

        let segments = fixture
            .parse_path(&root, &base, &["tools".to_string()], "", &Parameters::new())
            .unwrap();
        assert_eq!(segments, vec!["tools".to_string()]);
        assert!(fixture
            .parse_path(&root, &root, &[], "tools/extra", &Parameters::new())
            .is_none());
    }

    #[test]
    fn test_bad_yaml() {
        assert!(matches!(Fixture::from_yaml("screens: [1, 2"), Err(HarnessError::Fixture(_))));
    }

    #[tokio::test]
    async fn test_render_expands_template() {
        let fixture = Fixture::from_yaml(TREE).unwrap();
        let mut params = Parameters::new();
        params.insert("id".to_string(), json!(42));

        let mut ctx = ExecutionContext::new();
        ctx.scope_mut().push();
        ctx.attach_channel(Channel::new(RequestMethod::Get, &params, &Parameters::new()));

        fixture.render(&invocation(&["tools"]), &mut ctx).await.unwrap();

        let channel = ctx.detach_channel().unwrap();
        assert_eq!(channel.response.content_type(), Some("text/html"));
        let (text, _) = channel.into_output();
        assert_eq!(
            text.as_deref(),
            Some(concat!(
                "[webroot]<h1>Tools for anonymous (42)</h1>",
                "<p>[Template Error: ${missing} is undefined]</p>"
            ))
        );
        assert_eq!(ctx.scope().get("title"), Some(&json!("Tools")));
    }

    #[tokio::test]
    async fn test_render_requires_channel() {
        let fixture = Fixture::from_yaml(TREE).unwrap();
        let mut ctx = ExecutionContext::new();
        let err = fixture.render(&invocation(&[]), &mut ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[tokio::test]
    async fn test_authenticator() {
        let fixture = Fixture::from_yaml(TREE).unwrap();

        let principal = fixture.login_by_handle(&LoginHandle::new("sess-1")).await.unwrap();
        assert_eq!(principal.username, "john.doe");

        assert_eq!(
            fixture.login_by_username("gone").await.unwrap_err(),
            IdentityError::Disabled("gone".to_string())
        );
        assert_eq!(
            fixture.login_by_username("nobody").await.unwrap_err(),
            IdentityError::UnknownUser("nobody".to_string())
        );
    }
}
