//! Launch options and their mapping onto the child's argument vector.
//!
//! The executable parses named flags, so order only matters for
//! reproducibility. The order below is fixed so that two identical requests
//! always produce byte-identical command lines.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

/// Sandbox policy applied to commands the agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// No writes anywhere.
    ReadOnly,
    /// Writes limited to the workspace.
    WorkspaceWrite,
    /// No sandbox at all.
    DangerFullAccess,
}

impl SandboxMode {
    /// Wire spelling passed to `--sandbox`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

/// Reasoning effort requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Minimal effort.
    Minimal,
    /// Low effort.
    Low,
    /// Medium effort.
    Medium,
    /// High effort.
    High,
    /// Extra-high effort.
    Xhigh,
}

impl ReasoningEffort {
    /// Wire spelling used inside the `model_reasoning_effort` override.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Xhigh => "xhigh",
        }
    }
}

/// When the agent must ask before running a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalPolicy {
    /// Never ask.
    Never,
    /// Ask when the model requests it.
    OnRequest,
    /// Ask after a sandboxed command fails.
    OnFailure,
    /// Ask for anything not known to be safe.
    Untrusted,
}

impl ApprovalPolicy {
    /// Wire spelling used inside the `approval_policy` override.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnRequest => "on-request",
            Self::OnFailure => "on-failure",
            Self::Untrusted => "untrusted",
        }
    }
}

/// Named launch options for one run. Every field is optional; an absent
/// field produces no flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct LaunchOptions {
    /// Model identifier (`--model`).
    pub model: Option<String>,
    /// Sandbox policy (`--sandbox`).
    pub sandbox_mode: Option<SandboxMode>,
    /// Working directory for the agent (`--cd`).
    pub working_directory: Option<PathBuf>,
    /// Extra directories the agent may access (`--add-dir`, repeated).
    pub additional_directories: Vec<PathBuf>,
    /// Run outside a git repository (`--skip-git-repo-check`).
    pub skip_git_repo_check: bool,
    /// Reasoning effort override.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Network access inside the workspace-write sandbox.
    pub network_access: Option<bool>,
    /// Web search tool availability.
    pub web_search: Option<bool>,
    /// Approval policy override.
    pub approval_policy: Option<ApprovalPolicy>,
    /// Image attachments (`--image`, repeated).
    pub images: Vec<PathBuf>,
    /// Thread to resume instead of starting a new one.
    pub resume_thread_id: Option<String>,
    /// Base URL for the model provider; passed through the environment.
    pub base_url: Option<String>,
    /// API key for the model provider; passed through the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl LaunchOptions {
    /// Fill every option left unset in `self` from `base`.
    ///
    /// List options are taken from `base` only when `self` has none.
    #[must_use]
    pub fn with_fallback(self, base: &LaunchOptions) -> Self {
        fn pick<T: Clone>(own: Option<T>, base: Option<&T>) -> Option<T> {
            own.or_else(|| base.cloned())
        }
        fn pick_list<T: Clone>(own: Vec<T>, base: &[T]) -> Vec<T> {
            if own.is_empty() {
                base.to_vec()
            } else {
                own
            }
        }

        Self {
            model: pick(self.model, base.model.as_ref()),
            sandbox_mode: pick(self.sandbox_mode, base.sandbox_mode.as_ref()),
            working_directory: pick(self.working_directory, base.working_directory.as_ref()),
            additional_directories: pick_list(
                self.additional_directories,
                &base.additional_directories,
            ),
            skip_git_repo_check: self.skip_git_repo_check || base.skip_git_repo_check,
            reasoning_effort: pick(self.reasoning_effort, base.reasoning_effort.as_ref()),
            network_access: pick(self.network_access, base.network_access.as_ref()),
            web_search: pick(self.web_search, base.web_search.as_ref()),
            approval_policy: pick(self.approval_policy, base.approval_policy.as_ref()),
            images: pick_list(self.images, &base.images),
            resume_thread_id: pick(self.resume_thread_id, base.resume_thread_id.as_ref()),
            base_url: pick(self.base_url, base.base_url.as_ref()),
            api_key: pick(self.api_key, base.api_key.as_ref()),
        }
    }
}

/// One complete launch: the stdin payload plus its options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchRequest {
    /// Text written to the child's stdin before it is closed.
    pub input: String,
    /// Named options mapped onto flags and environment.
    pub options: LaunchOptions,
    /// JSON schema the final response must satisfy; staged to a temp file.
    pub output_schema: Option<serde_json::Value>,
}

impl LaunchRequest {
    /// Build a request with default options.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }
}

/// Build the argument vector for `options`.
///
/// `output_schema_file` is the already-staged schema path, if any.
#[must_use]
pub fn build_args(options: &LaunchOptions, output_schema_file: Option<&Path>) -> Vec<String> {
    let mut args = vec!["exec".to_owned(), "--experimental-json".to_owned()];

    if let Some(model) = &options.model {
        push_flag(&mut args, "--model", model);
    }
    if let Some(mode) = options.sandbox_mode {
        push_flag(&mut args, "--sandbox", mode.as_str());
    }
    if let Some(dir) = &options.working_directory {
        push_flag(&mut args, "--cd", &dir.to_string_lossy());
    }
    for dir in &options.additional_directories {
        push_flag(&mut args, "--add-dir", &dir.to_string_lossy());
    }
    if options.skip_git_repo_check {
        args.push("--skip-git-repo-check".to_owned());
    }
    if let Some(path) = output_schema_file {
        push_flag(&mut args, "--output-schema", &path.to_string_lossy());
    }
    if let Some(effort) = options.reasoning_effort {
        push_config(
            &mut args,
            &format!("model_reasoning_effort=\"{}\"", effort.as_str()),
        );
    }
    if let Some(enabled) = options.network_access {
        push_config(
            &mut args,
            &format!("sandbox_workspace_write.network_access={enabled}"),
        );
    }
    if let Some(enabled) = options.web_search {
        push_config(&mut args, &format!("features.web_search_request={enabled}"));
    }
    if let Some(policy) = options.approval_policy {
        push_config(
            &mut args,
            &format!("approval_policy=\"{}\"", policy.as_str()),
        );
    }
    for image in &options.images {
        push_flag(&mut args, "--image", &image.to_string_lossy());
    }
    if let Some(thread_id) = &options.resume_thread_id {
        args.push("resume".to_owned());
        args.push(thread_id.clone());
    }

    args
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_owned());
    args.push(value.to_owned());
}

fn push_config(args: &mut Vec<String>, assignment: &str) {
    push_flag(args, "--config", assignment);
}
