//! Screentest CLI - Main Entry Point
//!
//! Renders a list of screen paths from a YAML screen tree through the
//! isolated render harness and reports which ones passed.

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use screentest_common::{Authenticator, LoginHandle, Parameters, RequestMethod};
use screentest_harness::{BatchRunner, ExecutionContext, Fixture, HarnessSettings, ScreenTest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

mod output;

/// Screentest - render screens in isolation and flag broken ones
#[derive(Parser)]
#[command(name = "screentest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render screen paths and report failures
    Run(RunArgs),

    /// Write a settings file with default values
    Init {
        /// Destination of the settings file
        #[arg(default_value = "screentest.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Settings file (TOML)
    #[arg(long, env = "SCREENTEST_SETTINGS", default_value = "screentest.toml")]
    settings: PathBuf,

    /// Screen tree fixture (YAML)
    #[arg(long, env = "SCREENTEST_FIXTURE")]
    fixture: PathBuf,

    /// Root screen location
    #[arg(long)]
    root: Option<String>,

    /// Webapp whose localhost root screen becomes the root
    #[arg(long)]
    webapp: Option<String>,

    /// Base screen path prefixed to every requested path
    #[arg(long)]
    base: Option<String>,

    /// Maximum renders in flight
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Request method
    #[arg(long)]
    method: Option<RequestMethod>,

    /// Per-render timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Request parameter as name=value; values parse as JSON, else as text
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,

    /// Render as this user
    #[arg(long)]
    user: Option<String>,

    /// Render under this login session handle
    #[arg(long, conflicts_with = "user")]
    login_handle: Option<String>,

    /// Bypass authorization checks in every render
    #[arg(long)]
    no_authz: bool,

    /// Screen paths to render
    #[arg(required = true)]
    paths: Vec<String>,
}

fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Run(args) => match run(args, cli.format).await {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(e) => {
                output::print_error(&format!("{:#}", e));
                2
            }
        },
        Commands::Init { path, force } => match init(&path, force) {
            Ok(()) => {
                println!("✅ Wrote default settings to {}", path.display());
                0
            }
            Err(e) => {
                output::print_error(&format!("{:#}", e));
                2
            }
        },
        Commands::Version => {
            println!("screentest {}", screentest_common::VERSION);
            0
        }
    };

    std::process::exit(code);
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path.display());
    }
    HarnessSettings::default().save(path)
}

/// Returns whether every path passed
async fn run(args: RunArgs, format: output::OutputFormat) -> anyhow::Result<bool> {
    let mut settings = HarnessSettings::load(&args.settings)?;
    if let Some(root) = args.root {
        settings.render.root_screen = root;
    }
    if let Some(webapp) = args.webapp {
        settings.render.webapp_name = webapp;
    }
    if let Some(base) = args.base {
        settings.render.base_screen_path = base;
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if let Some(method) = args.method {
        settings.request_method = method;
    }
    if args.timeout_ms.is_some() {
        settings.render_timeout_ms = args.timeout_ms;
    }

    let fixture = Fixture::from_file(&args.fixture)
        .with_context(|| format!("loading fixture {}", args.fixture.display()))?;
    let harness = ScreenTest::from_settings(Arc::new(fixture).collaborators(), &settings);

    let session = settings
        .render
        .apply(harness.session())
        .context("configuring render session")?
        .build();
    if session.root_screen_location().is_none() {
        return Err(anyhow!("no root screen: pass --root or --webapp, or set render.root_screen"));
    }

    let mut caller = ExecutionContext::new();
    let authenticator = harness.collaborators().authenticator.clone();
    if let Some(handle) = args.login_handle {
        let handle = LoginHandle::new(handle);
        let principal = authenticator.login_by_handle(&handle).await?;
        caller.user_mut().login(principal, Some(handle));
    } else if let Some(user) = args.user {
        caller
            .user_mut()
            .login_by_username(authenticator.as_ref(), &user)
            .await?;
    }
    if args.no_authz {
        caller.user_mut().bypass_authz();
    }
    debug!("Rendering as {}", caller.user().username().unwrap_or("anonymous"));

    let parameters: Parameters = args.params.into_iter().collect();
    let concurrency = settings.effective_concurrency();
    info!(
        "Rendering {} screens (concurrency {}, {})",
        args.paths.len(),
        concurrency,
        settings.request_method
    );

    let runner = BatchRunner::new(harness, session);
    let report = runner
        .run_all(&caller, &args.paths, &parameters, settings.request_method, concurrency)
        .await;

    output::print_report(&report, format);
    Ok(report.failed == 0)
}
