//! Core types for screentest

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Request parameters, session attributes and scope snapshots all share this shape
pub type Parameters = BTreeMap<String, serde_json::Value>;

/// HTTP-style request method of a simulated request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "get"),
            RequestMethod::Post => write!(f, "post"),
            RequestMethod::Put => write!(f, "put"),
            RequestMethod::Patch => write!(f, "patch"),
            RequestMethod::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(RequestMethod::Get),
            "post" => Ok(RequestMethod::Post),
            "put" => Ok(RequestMethod::Put),
            "patch" => Ok(RequestMethod::Patch),
            "delete" => Ok(RequestMethod::Delete),
            other => Err(format!("unsupported request method: {}", other)),
        }
    }
}

/// A screen definition as handed out by the screen model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenDefinition {
    pub location: String,
}

impl ScreenDefinition {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// A named subscreen entry of a screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscreenRef {
    pub name: String,
    pub location: String,
}

/// Host pattern to root screen mapping declared by a webapp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootScreenMapping {
    /// Regular expression matched against the whole host name
    pub host: String,
    pub location: String,
}

impl RootScreenMapping {
    /// Whether this mapping's host pattern matches `host` in full.
    /// An invalid pattern never matches.
    pub fn matches_host(&self, host: &str) -> bool {
        match Regex::new(&format!("^(?:{})$", self.host)) {
            Ok(re) => re.is_match(host),
            Err(e) => {
                warn!("Ignoring invalid host pattern '{}': {}", self.host, e);
                false
            }
        }
    }
}

/// A single render request. Parameters are owned copies of what the caller passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub screen_path: String,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub request_method: RequestMethod,
}

impl RenderRequest {
    pub fn new(screen_path: impl Into<String>) -> Self {
        Self {
            screen_path: screen_path.into(),
            parameters: Parameters::new(),
            request_method: RequestMethod::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: &Parameters) -> Self {
        self.parameters = parameters.clone();
        self
    }

    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.request_method = method;
        self
    }
}

/// Outcome of one render
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    pub screen_path: String,
    pub output_text: Option<String>,
    pub structured_payload: Option<serde_json::Value>,
    pub render_time_ms: u64,
    #[serde(default)]
    pub post_render_scope: Parameters,
    #[serde(default)]
    pub error_messages: Vec<String>,
}

impl RenderResult {
    /// A render passed when no error message was recorded
    pub fn is_success(&self) -> bool {
        self.error_messages.is_empty()
    }

    /// Number of characters of output text, zero when absent
    pub fn output_chars(&self) -> usize {
        self.output_text.as_deref().map(|t| t.chars().count()).unwrap_or(0)
    }

    pub fn assert_contains(&self, text: &str) -> bool {
        let found = self
            .output_text
            .as_deref()
            .map(|out| out.contains(text))
            .unwrap_or(false);
        if !found {
            warn!("Could not find '{}' in output of {}", text, self.screen_path);
        }
        found
    }

    pub fn assert_not_contains(&self, text: &str) -> bool {
        let found = self
            .output_text
            .as_deref()
            .map(|out| out.contains(text))
            .unwrap_or(false);
        if found {
            warn!("Found unexpected '{}' in output of {}", text, self.screen_path);
        }
        !found
    }

    /// Whether the output matches `pattern` in full; an invalid pattern never matches
    pub fn assert_regex(&self, pattern: &str) -> bool {
        let Some(out) = self.output_text.as_deref() else {
            warn!("No output for {} to match regex {}", self.screen_path, pattern);
            return false;
        };
        let matched = match Regex::new(&format!("(?s)^(?:{})$", pattern)) {
            Ok(re) => re.is_match(out),
            Err(e) => {
                warn!("Invalid regex {}: {}", pattern, e);
                false
            }
        };
        if !matched {
            warn!("Output of {} does not match regex {}", self.screen_path, pattern);
        }
        matched
    }
}

/// Point-in-time copy of the harness counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub render_count: u64,
    pub error_count: u64,
    pub total_output_chars: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(output: Option<&str>) -> RenderResult {
        RenderResult {
            screen_path: "users/list".to_string(),
            output_text: output.map(String::from),
            structured_payload: None,
            render_time_ms: 3,
            post_render_scope: Parameters::new(),
            error_messages: vec![],
        }
    }

    #[test]
    fn test_request_method_parse() {
        assert_eq!("GET".parse::<RequestMethod>().unwrap(), RequestMethod::Get);
        assert_eq!("post".parse::<RequestMethod>().unwrap(), RequestMethod::Post);
        assert!("teapot".parse::<RequestMethod>().is_err());
        assert_eq!(RequestMethod::Delete.to_string(), "delete");
    }

    #[test]
    fn test_host_pattern_matches_whole_host() {
        let mapping = RootScreenMapping {
            host: "local.*".to_string(),
            location: "/apps".to_string(),
        };
        assert!(mapping.matches_host("localhost"));
        assert!(!mapping.matches_host("notlocalhost"));

        let broken = RootScreenMapping {
            host: "(".to_string(),
            location: "/apps".to_string(),
        };
        assert!(!broken.matches_host("localhost"));
    }

    #[test]
    fn test_request_copies_parameters() {
        let mut params = Parameters::new();
        params.insert("id".to_string(), serde_json::json!(7));

        let request = RenderRequest::new("users/edit").with_parameters(&params);
        params.insert("id".to_string(), serde_json::json!(8));

        assert_eq!(request.parameters["id"], serde_json::json!(7));
    }

    #[test]
    fn test_output_assertions() {
        let result = result_with(Some("<h1>Users</h1>"));
        assert!(result.assert_contains("Users"));
        assert!(!result.assert_contains("Orders"));
        assert!(result.assert_not_contains("Orders"));
        assert!(result.assert_regex("<h1>.*</h1>"));
        assert!(!result.assert_regex("Users"));
        assert_eq!(result.output_chars(), 14);
    }

    #[test]
    fn test_absent_output_assertions() {
        let result = result_with(None);
        assert!(!result.assert_contains("x"));
        assert!(result.assert_not_contains("x"));
        assert!(!result.assert_regex(".*"));
        assert_eq!(result.output_chars(), 0);
        assert!(result.is_success());
    }
}
