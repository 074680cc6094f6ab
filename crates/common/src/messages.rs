//! Structured diagnostic messages collected during a render

use serde::{Deserialize, Serialize};

/// Side channel for non-fatal messages and errors
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MessageFacade {
    messages: Vec<String>,
    errors: Vec<String>,
}

impl MessageFacade {
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Drain current errors, leaving the channel empty
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }
}
