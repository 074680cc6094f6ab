//! Screentest Harness
//!
//! Renders screens of a hierarchical screen tree in isolated execution
//! contexts and classifies each render as passed or failed:
//! - Builds a simulated request/response channel per render
//! - Rebinds the caller's identity inside a fresh context on its own task
//! - Collects structured errors and scans output for error signatures
//! - Aggregates render statistics across sequential or bounded-concurrent batches
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  BatchRunner::run_all(paths, params, method, concurrency)   │
//! │    └── ScreenTest::execute(caller, session, request)        │
//! │          ├── RenderSessionConfig::resolve  (ScreenModel)    │
//! │          └── tokio task: fresh ExecutionContext             │
//! │                ├── UserFacade::restore   (Authenticator)    │
//! │                ├── Channel + scope push                     │
//! │                ├── RenderPipeline::render                   │
//! │                ├── ErrorClassifier::classify                │
//! │                └── HarnessStats::record                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod batch;
pub mod boundary;
pub mod channel;
pub mod classify;
pub mod context;
pub mod executor;
pub mod fixture;
pub mod resolver;
pub mod session;
pub mod settings;
pub mod stats;

pub use batch::{BatchObserver, BatchOutcome, BatchReport, BatchRunner, LoggingObserver};
pub use boundary::{Collaborators, RenderInvocation, RenderPipeline, ScreenModel, WebappRegistry};
pub use channel::Channel;
pub use context::ExecutionContext;
pub use executor::ScreenTest;
pub use fixture::Fixture;
pub use session::{RenderSessionBuilder, RenderSessionConfig};
pub use settings::HarnessSettings;
pub use stats::HarnessStats;
