//! Error types for screentest

use thiserror::Error;

/// Result type alias using the harness error
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Failures while building a render session configuration.
///
/// These are programmer errors: the configuration step that raised one is
/// rejected outright and nothing is deferred to render time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Root screen not found: {0}")]
    RootScreenNotFound(String),

    #[error("No root screen set; set the root screen before the base screen path")]
    NoRootScreen,

    #[error("Error in base screen path: could not resolve {segment} ({detail})")]
    BaseScreenPathInvalid { segment: String, detail: String },
}

/// Misuse of an otherwise valid harness
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("No root screen specified for render")]
    NoRootScreen,
}

/// Failures re-establishing an identity inside a fresh execution context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Login session handle is not recognized")]
    UnknownHandle,

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("User account is disabled: {0}")]
    Disabled(String),
}

/// Error raised by a render pipeline while producing output.
///
/// The harness never propagates these; they are converted into error
/// messages on the render result.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Render error: {0}")]
    Render(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Screen not found: {0}")]
    ScreenNotFound(String),

    #[error("Render panicked: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// The bare message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            PipelineError::Render(msg)
            | PipelineError::Template(msg)
            | PipelineError::ScreenNotFound(msg)
            | PipelineError::Panicked(msg) => msg.clone(),
            PipelineError::Io(e) => e.to_string(),
            PipelineError::Serialization(e) => e.to_string(),
        }
    }
}

/// Top-level harness error
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("Could not find screen path {path} under base {base}")]
    Resolution { path: String, base: String },

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Render execution unit failed: {0}")]
    ExecutionUnit(String),

    #[error("Render of {path} timed out after {millis} ms")]
    Timeout { path: String, millis: u64 },

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HarnessError {
    /// True for errors that reject the whole configuration rather than one render
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, HarnessError::Config(_) | HarnessError::Usage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_error_names_segment() {
        let err = ConfigError::BaseScreenPathInvalid {
            segment: "nope".to_string(),
            detail: "no subscreen under /apps".to_string(),
        };
        assert!(err.to_string().contains("nope"));
        assert!(err.to_string().contains("/apps"));
    }

    #[test]
    fn test_pipeline_message_strips_prefix() {
        let err = PipelineError::Template("missing macro".to_string());
        assert_eq!(err.message(), "missing macro");
        assert_eq!(err.to_string(), "Template error: missing macro");
    }

    #[test]
    fn test_programmer_errors() {
        assert!(HarnessError::from(UsageError::NoRootScreen).is_programmer_error());
        assert!(HarnessError::from(ConfigError::NoRootScreen).is_programmer_error());

        let resolution = HarnessError::Resolution {
            path: "a/b".to_string(),
            base: "/apps".to_string(),
        };
        assert!(!resolution.is_programmer_error());
    }
}
