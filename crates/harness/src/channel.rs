//! In-memory request/response channel standing in for a network transport

use screentest_common::{Parameters, RequestMethod};
use serde_json::Value;

/// The request half: method, parameters and a private copy of session attributes
#[derive(Debug, Clone)]
pub struct SimulatedRequest {
    method: RequestMethod,
    parameters: Parameters,
    session_attributes: Parameters,
    attributes: Parameters,
}

impl SimulatedRequest {
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn session_attribute(&self, name: &str) -> Option<&Value> {
        self.session_attributes.get(name)
    }

    /// Writes stay local to this channel
    pub fn set_session_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.session_attributes.insert(name.into(), value);
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }
}

/// The response half: captured text and/or a structured payload
#[derive(Debug, Clone)]
pub struct SimulatedResponse {
    text: Option<String>,
    structured: Option<Value>,
    content_type: Option<String>,
    character_encoding: Option<String>,
    status: u16,
    skip_structured_text: bool,
}

impl SimulatedResponse {
    pub fn write(&mut self, chunk: &str) {
        self.text.get_or_insert_with(String::new).push_str(chunk);
    }

    /// Record a structured payload. Unless serialization is skipped the
    /// payload is also written out as JSON text.
    pub fn send_structured(&mut self, payload: Value) -> Result<(), serde_json::Error> {
        if !self.skip_structured_text {
            let text = serde_json::to_string(&payload)?;
            self.write(&text);
        }
        self.content_type = Some("application/json".to_string());
        self.structured = Some(payload);
        Ok(())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn structured(&self) -> Option<&Value> {
        self.structured.as_ref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    pub fn set_character_encoding(&mut self, encoding: impl Into<String>) {
        self.character_encoding = Some(encoding.into());
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }
}

/// A request/response pair owned by exactly one render
#[derive(Debug, Clone)]
pub struct Channel {
    pub request: SimulatedRequest,
    pub response: SimulatedResponse,
}

impl Channel {
    /// Build a channel. Both maps are copied; the channel never writes back
    /// into the caller's session attributes.
    pub fn new(
        method: RequestMethod,
        parameters: &Parameters,
        session_attributes: &Parameters,
    ) -> Self {
        Self {
            request: SimulatedRequest {
                method,
                parameters: parameters.clone(),
                session_attributes: session_attributes.clone(),
                attributes: Parameters::new(),
            },
            response: SimulatedResponse {
                text: None,
                structured: None,
                content_type: None,
                character_encoding: None,
                status: 200,
                skip_structured_text: false,
            },
        }
    }

    pub fn skip_structured_payload(mut self, skip: bool) -> Self {
        self.response.skip_structured_text = skip;
        self
    }

    /// Consume the channel, yielding captured text and decoded payload
    pub fn into_output(self) -> (Option<String>, Option<Value>) {
        (self.response.text, self.response.structured)
    }
}
