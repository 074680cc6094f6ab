//! Execution context: identity, messages, variable scope and active channel

use screentest_common::{MessageFacade, Parameters, UserFacade};
use serde_json::Value;

use crate::channel::Channel;

/// Stack of variable scopes; lookups search from the innermost frame out
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Parameters>,
}

impl ScopeStack {
    pub fn push(&mut self) {
        self.frames.push(Parameters::new());
    }

    pub fn pop(&mut self) -> Option<Parameters> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Set in the innermost frame, opening one if the stack is empty
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if self.frames.is_empty() {
            self.push();
        }
        if let Some(top) = self.frames.last_mut() {
            top.insert(name.into(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

/// Everything one render needs. The harness creates a fresh one per render
/// and drops it when the render ends; callers keep their own.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    user: UserFacade,
    messages: MessageFacade,
    scope: ScopeStack,
    channel: Option<Channel>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> &UserFacade {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut UserFacade {
        &mut self.user
    }

    pub fn messages(&self) -> &MessageFacade {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageFacade {
        &mut self.messages
    }

    pub fn scope(&self) -> &ScopeStack {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut ScopeStack {
        &mut self.scope
    }

    pub fn attach_channel(&mut self, channel: Channel) {
        self.channel = Some(channel);
    }

    pub fn detach_channel(&mut self) -> Option<Channel> {
        self.channel.take()
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    pub fn channel_mut(&mut self) -> Option<&mut Channel> {
        self.channel.as_mut()
    }
}
