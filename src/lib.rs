pub mod action;
pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod types;
pub mod workflow;

use anyhow::Context;
use backend::HttpBackend;
use clap::{Args, Parser, Subcommand};
use commands::{ActionPlan, AppState, DownloadTarget};
use config::{BackendConfig, DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS, ENV_BACKEND_URL, ENV_TIMEOUT_SECS};
use env_logger::Builder;
use error::WorkflowError;
use log::LevelFilter;
use std::io::Write;
use std::path::PathBuf;

/// Detect and mask personal data in documents using a redaction service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the redaction service
    #[arg(long, global = true, env = ENV_BACKEND_URL, default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = ENV_TIMEOUT_SECS, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Log requests and state changes
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a document and list the PII the service detects
    Scan {
        document: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload, choose actions, mask and download in one go
    Redact(RedactArgs),
}

#[derive(Args, Debug)]
pub struct RedactArgs {
    pub document: PathBuf,

    /// Per-field action as KEY=ACTION (redact, delete, mask; empty to skip). Repeatable.
    #[arg(short, long = "action", value_name = "KEY=ACTION")]
    pub actions: Vec<String>,

    /// Action for every detected field, applied before --action overrides
    #[arg(long, value_name = "ACTION")]
    pub all: Option<String>,

    /// Ask for an action per detected field on stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// File or directory for the masked document (default: the download folder)
    #[arg(short, long, conflicts_with = "open")]
    pub output: Option<PathBuf>,

    /// Open the download URL in the default browser instead of saving
    #[arg(long)]
    pub open: bool,
}

/// `[HH:MM:SS] [LEVEL] message` on stderr. `RUST_LOG` overrides the level.
fn init_logger(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}

fn action_plan(args: &RedactArgs) -> anyhow::Result<ActionPlan> {
    let all = args.all.as_deref().map(str::parse::<action::PiiAction>).transpose()?;
    let per_field = args
        .actions
        .iter()
        .map(|a| commands::parse_assignment(a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ActionPlan { all, per_field })
}

/// Nothing would be masked, so do not upload the document at all.
fn check_plan(plan: &ActionPlan, interactive: bool) -> Result<(), WorkflowError> {
    if plan.is_empty() && !interactive {
        return Err(WorkflowError::NoActionsChosen);
    }
    Ok(())
}

fn run_scan(state: &AppState<HttpBackend>, document: &std::path::Path, json: bool) -> anyhow::Result<()> {
    commands::select_file(state, document.display().to_string()).map_err(anyhow::Error::msg)?;
    let report = commands::verify_pii(state).map_err(anyhow::Error::msg)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{} -> {}", report.file_name, report.file_path);
    if report.fields.is_empty() {
        println!("No PII detected.");
    }
    for field in &report.fields {
        println!("  {} - {}", field.key, field.value);
    }
    Ok(())
}

fn run_redact(state: &AppState<HttpBackend>, args: &RedactArgs) -> anyhow::Result<()> {
    let plan = action_plan(args)?;
    check_plan(&plan, args.interactive)?;

    let mut guard = state.lock().map_err(anyhow::Error::msg)?;
    let session = &mut *guard;
    commands::scan(session, &args.document)?;
    commands::apply_plan(session, &plan)?;
    if args.interactive {
        let stdin = std::io::stdin();
        commands::prompt_actions(session, stdin.lock(), std::io::stdout())?;
    }

    let target = match (&args.output, args.open) {
        (_, true) => DownloadTarget::Open,
        (Some(output), false) => DownloadTarget::Save(output.clone()),
        (None, false) => DownloadTarget::SaveInDir(commands::default_download_dir()),
    };
    let outcome = commands::finish(session, &target)?;
    match outcome.saved_to {
        Some(path) => println!("Masked file saved to {}", path.display()),
        None => println!("Opened {}", outcome.download_url),
    }
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    config::load_env();
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = BackendConfig::new(&cli.backend_url, cli.timeout_secs)?;
    log::debug!("Using redaction service at {}", config.base_url);
    let state = AppState::new(HttpBackend::new(config)?);

    match &cli.command {
        Command::Scan { document, json } => run_scan(&state, document, *json)
            .with_context(|| format!("scan of {} failed", document.display())),
        Command::Redact(args) => run_redact(&state, args)
            .with_context(|| format!("redaction of {} failed", args.document.display())),
    }
}
