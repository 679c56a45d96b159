//! Unit tests for launch option → argument vector mapping.

use std::path::{Path, PathBuf};

use codex_exec_bridge::exec::args::build_args;
use codex_exec_bridge::exec::{ApprovalPolicy, LaunchOptions, ReasoningEffort, SandboxMode};

const PREFIX: [&str; 2] = ["exec", "--experimental-json"];

fn args_of(options: &LaunchOptions) -> Vec<String> {
    build_args(options, None)
}

fn count(args: &[String], item: &str) -> usize {
    args.iter().filter(|arg| arg.as_str() == item).count()
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(String::as_str)
}

// ── Baseline ────────────────────────────────────────────────────────────────

#[test]
fn empty_options_produce_only_the_prefix() {
    assert_eq!(args_of(&LaunchOptions::default()), PREFIX);
}

#[test]
fn identical_options_produce_identical_args() {
    let options = LaunchOptions {
        model: Some("gpt-5".into()),
        images: vec![PathBuf::from("a.png"), PathBuf::from("b.png")],
        ..LaunchOptions::default()
    };
    assert_eq!(args_of(&options), args_of(&options.clone()));
}

// ── Single-valued flags ─────────────────────────────────────────────────────

#[test]
fn model_adds_one_model_flag() {
    let args = args_of(&LaunchOptions {
        model: Some("gpt-5-codex".into()),
        ..LaunchOptions::default()
    });
    assert_eq!(count(&args, "--model"), 1);
    assert_eq!(value_after(&args, "--model"), Some("gpt-5-codex"));
}

#[test]
fn sandbox_modes_are_passed_verbatim() {
    for (mode, wire) in [
        (SandboxMode::ReadOnly, "read-only"),
        (SandboxMode::WorkspaceWrite, "workspace-write"),
        (SandboxMode::DangerFullAccess, "danger-full-access"),
    ] {
        let args = args_of(&LaunchOptions {
            sandbox_mode: Some(mode),
            ..LaunchOptions::default()
        });
        assert_eq!(count(&args, "--sandbox"), 1);
        assert_eq!(value_after(&args, "--sandbox"), Some(wire));
    }
}

#[test]
fn working_directory_adds_cd_flag() {
    let args = args_of(&LaunchOptions {
        working_directory: Some(PathBuf::from("/work/repo")),
        ..LaunchOptions::default()
    });
    assert_eq!(value_after(&args, "--cd"), Some("/work/repo"));
}

#[test]
fn skip_git_repo_check_is_a_bare_flag() {
    let args = args_of(&LaunchOptions {
        skip_git_repo_check: true,
        ..LaunchOptions::default()
    });
    assert_eq!(args, [&PREFIX[..], &["--skip-git-repo-check"]].concat());
}

#[test]
fn false_boolean_flag_adds_nothing() {
    let args = args_of(&LaunchOptions {
        skip_git_repo_check: false,
        ..LaunchOptions::default()
    });
    assert_eq!(args, PREFIX);
}

#[test]
fn output_schema_file_adds_output_schema_flag() {
    let args = build_args(&LaunchOptions::default(), Some(Path::new("/tmp/s/schema.json")));
    assert_eq!(value_after(&args, "--output-schema"), Some("/tmp/s/schema.json"));
}

// ── Config overrides ────────────────────────────────────────────────────────

#[test]
fn reasoning_effort_is_a_quoted_config_override() {
    let args = args_of(&LaunchOptions {
        reasoning_effort: Some(ReasoningEffort::Xhigh),
        ..LaunchOptions::default()
    });
    assert_eq!(
        value_after(&args, "--config"),
        Some("model_reasoning_effort=\"xhigh\"")
    );
}

#[test]
fn network_access_is_passed_for_both_values() {
    for (enabled, expected) in [
        (true, "sandbox_workspace_write.network_access=true"),
        (false, "sandbox_workspace_write.network_access=false"),
    ] {
        let args = args_of(&LaunchOptions {
            network_access: Some(enabled),
            ..LaunchOptions::default()
        });
        assert_eq!(value_after(&args, "--config"), Some(expected));
    }
}

#[test]
fn web_search_is_passed_for_both_values() {
    let args = args_of(&LaunchOptions {
        web_search: Some(false),
        ..LaunchOptions::default()
    });
    assert_eq!(
        value_after(&args, "--config"),
        Some("features.web_search_request=false")
    );
}

#[test]
fn approval_policy_is_a_quoted_config_override() {
    let args = args_of(&LaunchOptions {
        approval_policy: Some(ApprovalPolicy::OnRequest),
        ..LaunchOptions::default()
    });
    assert_eq!(
        value_after(&args, "--config"),
        Some("approval_policy=\"on-request\"")
    );
}

// ── Repeated flags ──────────────────────────────────────────────────────────

#[test]
fn additional_directories_repeat_in_input_order() {
    let args = args_of(&LaunchOptions {
        additional_directories: vec![PathBuf::from("/b"), PathBuf::from("/a"), PathBuf::from("/c")],
        ..LaunchOptions::default()
    });
    assert_eq!(
        args[2..],
        ["--add-dir", "/b", "--add-dir", "/a", "--add-dir", "/c"]
    );
}

#[test]
fn images_repeat_in_input_order() {
    let args = args_of(&LaunchOptions {
        images: vec![PathBuf::from("one.png"), PathBuf::from("two.jpg")],
        ..LaunchOptions::default()
    });
    assert_eq!(count(&args, "--image"), 2);
    assert_eq!(args[2..], ["--image", "one.png", "--image", "two.jpg"]);
}

// ── Resume and ordering ─────────────────────────────────────────────────────

#[test]
fn resume_is_positional_after_all_flags() {
    let args = args_of(&LaunchOptions {
        model: Some("m".into()),
        images: vec![PathBuf::from("x.png")],
        resume_thread_id: Some("thread-123".into()),
        ..LaunchOptions::default()
    });
    let tail = &args[args.len() - 2..];
    assert_eq!(tail, ["resume", "thread-123"]);
}

#[test]
fn full_options_follow_fixed_order() {
    let options = LaunchOptions {
        model: Some("gpt-5".into()),
        sandbox_mode: Some(SandboxMode::WorkspaceWrite),
        working_directory: Some(PathBuf::from("/repo")),
        additional_directories: vec![PathBuf::from("/extra")],
        skip_git_repo_check: true,
        reasoning_effort: Some(ReasoningEffort::High),
        network_access: Some(true),
        web_search: Some(true),
        approval_policy: Some(ApprovalPolicy::Never),
        images: vec![PathBuf::from("shot.png")],
        resume_thread_id: Some("t-1".into()),
        base_url: Some("http://proxy".into()),
        api_key: Some("sk-secret".into()),
    };

    let args = build_args(&options, Some(Path::new("/tmp/schema.json")));
    let expected = [
        "exec",
        "--experimental-json",
        "--model",
        "gpt-5",
        "--sandbox",
        "workspace-write",
        "--cd",
        "/repo",
        "--add-dir",
        "/extra",
        "--skip-git-repo-check",
        "--output-schema",
        "/tmp/schema.json",
        "--config",
        "model_reasoning_effort=\"high\"",
        "--config",
        "sandbox_workspace_write.network_access=true",
        "--config",
        "features.web_search_request=true",
        "--config",
        "approval_policy=\"never\"",
        "--image",
        "shot.png",
        "resume",
        "t-1",
    ];
    assert_eq!(args, expected);
}

#[test]
fn base_url_and_api_key_never_appear_in_args() {
    let args = args_of(&LaunchOptions {
        base_url: Some("http://proxy".into()),
        api_key: Some("sk-secret".into()),
        ..LaunchOptions::default()
    });
    assert_eq!(args, PREFIX);
}

// ── Defaults merging ────────────────────────────────────────────────────────

#[test]
fn with_fallback_fills_only_unset_options() {
    let base = LaunchOptions {
        model: Some("base-model".into()),
        sandbox_mode: Some(SandboxMode::ReadOnly),
        images: vec![PathBuf::from("base.png")],
        skip_git_repo_check: true,
        ..LaunchOptions::default()
    };
    let own = LaunchOptions {
        model: Some("own-model".into()),
        images: vec![PathBuf::from("own.png")],
        ..LaunchOptions::default()
    };

    let merged = own.with_fallback(&base);
    assert_eq!(merged.model.as_deref(), Some("own-model"));
    assert_eq!(merged.sandbox_mode, Some(SandboxMode::ReadOnly));
    assert_eq!(merged.images, vec![PathBuf::from("own.png")]);
    assert!(merged.skip_git_repo_check);
}

#[test]
fn with_fallback_on_empty_base_is_identity() {
    let own = LaunchOptions {
        web_search: Some(false),
        ..LaunchOptions::default()
    };
    assert_eq!(own.clone().with_fallback(&LaunchOptions::default()), own);
}
