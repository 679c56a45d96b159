#![forbid(unsafe_code)]

//! `codex-exec` — one-shot command-line front end for the exec bridge.
//!
//! Launches a single run, prints every streamed line to stdout as soon as
//! it arrives, and exits non-zero with the failure on stderr. Ctrl-C cancels
//! the run.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use codex_exec_bridge::exec::{ApprovalPolicy, ReasoningEffort, SandboxMode};
use codex_exec_bridge::{
    AppError, BridgeConfig, ExecSupervisor, LaunchOptions, LaunchRequest, Result,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "codex-exec",
    about = "Run the vendored codex binary once and stream its output",
    version,
    long_about = None
)]
struct Cli {
    /// Prompt text; read from stdin when omitted.
    prompt: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Executable to launch instead of the vendored binary.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Model identifier.
    #[arg(long)]
    model: Option<String>,

    /// Sandbox policy.
    #[arg(long, value_enum)]
    sandbox: Option<SandboxMode>,

    /// Working directory for the agent.
    #[arg(long = "cd")]
    working_directory: Option<PathBuf>,

    /// Extra directory the agent may access (repeatable).
    #[arg(long = "add-dir")]
    add_dir: Vec<PathBuf>,

    /// Allow running outside a git repository.
    #[arg(long)]
    skip_git_repo_check: bool,

    /// Reasoning effort.
    #[arg(long, value_enum)]
    reasoning_effort: Option<ReasoningEffort>,

    /// Network access inside the workspace-write sandbox.
    #[arg(long)]
    network_access: Option<bool>,

    /// Enable or disable web search.
    #[arg(long)]
    web_search: Option<bool>,

    /// Approval policy.
    #[arg(long, value_enum)]
    approval_policy: Option<ApprovalPolicy>,

    /// Image to attach (repeatable).
    #[arg(long)]
    image: Vec<PathBuf>,

    /// Resume an existing thread.
    #[arg(long)]
    resume: Option<String>,

    /// Base URL for the model provider.
    #[arg(long)]
    base_url: Option<String>,

    /// JSON file holding the schema the final response must satisfy.
    #[arg(long)]
    output_schema: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            model: self.model.clone(),
            sandbox_mode: self.sandbox,
            working_directory: self.working_directory.clone(),
            additional_directories: self.add_dir.clone(),
            skip_git_repo_check: self.skip_git_repo_check,
            reasoning_effort: self.reasoning_effort,
            network_access: self.network_access,
            web_search: self.web_search,
            approval_policy: self.approval_policy,
            images: self.image.clone(),
            resume_thread_id: self.resume.clone(),
            base_url: self.base_url.clone(),
            api_key: None,
        }
    }
}

fn main() {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("codex-exec: {err}");
    }

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    if let Err(err) = outcome {
        error!(%err, "codex-exec failed");
        eprintln!("codex-exec: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::load_from_path(path)?,
        None => BridgeConfig::default(),
    };
    if let Some(executable) = &args.executable {
        config.executable_path = Some(executable.clone());
    }
    config.load_credentials().await?;

    let input = match &args.prompt {
        Some(prompt) => prompt.clone(),
        None => read_stdin_prompt()?,
    };
    let output_schema = args
        .output_schema
        .as_deref()
        .map(read_schema_file)
        .transpose()?;

    let request = LaunchRequest {
        input,
        options: args.launch_options(),
        output_schema,
    };

    let supervisor = ExecSupervisor::from_config(&config)?;
    info!(executable = %supervisor.executable().display(), "starting exec run");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling run");
            ctrl_c.cancel();
        }
    });

    let mut lines = supervisor.launch(request, Some(cancel)).await?;
    let stdout = std::io::stdout();
    while let Some(line) = lines.next_line().await? {
        let mut out = stdout.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
    }

    Ok(())
}

fn read_stdin_prompt() -> Result<String> {
    let mut prompt = String::new();
    std::io::stdin().read_to_string(&mut prompt)?;
    if prompt.trim().is_empty() {
        return Err(AppError::Config(
            "no prompt given as argument or on stdin".into(),
        ));
    }
    Ok(prompt)
}

fn read_schema_file(path: &Path) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| AppError::Schema(format!("cannot read {}: {err}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|err| AppError::Schema(format!("invalid JSON in {}: {err}", path.display())))
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
