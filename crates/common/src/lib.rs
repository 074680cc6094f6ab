//! Screentest Common Library
//!
//! Shared types, error taxonomy and per-context identity and message state
//! for the screentest render harness.

pub mod error;
pub mod identity;
pub mod messages;
pub mod types;

// Re-export commonly used types
pub use error::{
    ConfigError, HarnessError, HarnessResult, IdentityError, PipelineError, UsageError,
};
pub use identity::{Authenticator, IdentitySnapshot, LoginHandle, Principal, Rebind, UserFacade};
pub use messages::MessageFacade;
pub use types::*;

/// Screentest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
