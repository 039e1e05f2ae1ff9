mod output;
mod pipeline;
mod providers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use coderisk_agent::BlockMode;
use coderisk_core::CoreRiskConfig;
use coderisk_git::GitRepository;
use output::Verbosity;
use pipeline::Pipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "coderisk")]
#[command(about = "Pre-commit incident-risk assessment", long_about = None)]
#[command(version)]
struct Cli {
    /// Logging format for diagnostics.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this directory instead of stderr (rotation: one file,
    /// never rolled — matches a pre-commit hook's short-lived process).
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess the risk of a pending changeset.
    Check {
        /// Explicit paths to assess. Defaults to git's staged+unstaged
        /// changeset when omitted.
        paths: Vec<String>,

        /// Print the full hop-by-hop investigation trace for every file.
        #[arg(long)]
        explain: bool,

        /// Emit one JSON object per line instead of colored terminal output.
        #[arg(long)]
        ai_mode: bool,

        /// Quiet mode for a git pre-commit hook: only prints files that block.
        #[arg(long)]
        pre_commit: bool,

        /// Report findings without ever blocking the commit.
        #[arg(long)]
        advisory: bool,

        /// Repository root to evaluate. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        repo: String,

        /// Repository identity the knowledge graph was ingested under.
        /// Defaults to the repository root's directory name.
        #[arg(long)]
        repo_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_format, cli.verbose, cli.log_dir.as_deref());

    let exit_code = match cli.command {
        Commands::Check {
            paths,
            explain,
            ai_mode,
            pre_commit,
            advisory,
            repo,
            repo_id,
        } => {
            run_check(paths, explain, ai_mode, pre_commit, advisory, repo, repo_id).await
        }
    };

    std::process::exit(exit_code);
}

/// Installs the global subscriber and returns the `WorkerGuard` for a
/// file-backed writer, if one was set up — it must live for the rest of
/// `main` or the background flush thread shuts down and buffered lines are
/// lost. Mirrors `codegraph-mcp-server`'s non-blocking rolling-file setup;
/// unlike that binary this one never leaks the guard via `mem::forget`
/// since a `coderisk check` invocation is short-lived and `main` already
/// holds it for the whole run.
fn init_logging(
    format: LogFormat,
    verbose: bool,
    log_dir: Option<&str>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = if verbose { "coderisk=debug" } else { "coderisk=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "coderisk.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let registry = tracing_subscriber::registry().with(env_filter);
            match format {
                LogFormat::Pretty => {
                    registry
                        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
                        .init();
                }
                LogFormat::Json => {
                    registry
                        .with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
                        .init();
                }
            }
            Some(guard)
        }
        None => {
            match format {
                LogFormat::Pretty => {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(tracing_subscriber::fmt::layer())
                        .init();
                }
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(tracing_subscriber::fmt::layer().json())
                        .init();
                }
            }
            None
        }
    }
}

/// Runs `check` end to end and returns the process exit code: `0` when
/// nothing blocks, `1` when at least one file blocks, `2` for an internal
/// error (config, connection, or git failure). The exit-code boundary is
/// the one place a `CoreRiskError`/`anyhow::Error` is allowed to terminate
/// the process rather than becoming an emergency per-file assessment —
/// everything past this point runs per-file error handling instead.
async fn run_check(
    explicit_paths: Vec<String>,
    explain: bool,
    ai_mode: bool,
    pre_commit: bool,
    advisory: bool,
    repo_root: String,
    repo_id: Option<String>,
) -> i32 {
    match try_run_check(explicit_paths, explain, ai_mode, pre_commit, advisory, repo_root, repo_id).await {
        Ok(any_blocked) => i32::from(any_blocked),
        Err(e) => {
            tracing::error!(error = %e, "coderisk failed");
            eprintln!("coderisk: {e:#}");
            2
        }
    }
}

async fn try_run_check(
    explicit_paths: Vec<String>,
    explain: bool,
    ai_mode: bool,
    pre_commit: bool,
    advisory: bool,
    repo_root: String,
    repo_id: Option<String>,
) -> Result<bool> {
    let config = CoreRiskConfig::load().context("loading configuration")?;
    let repo_root = std::path::PathBuf::from(repo_root)
        .canonicalize()
        .context("resolving --repo path")?;
    let repo = GitRepository::open(&repo_root).context("opening git repository")?;

    let paths = if explicit_paths.is_empty() {
        repo.working_tree_changeset().context("reading the working-tree changeset")?
    } else {
        explicit_paths
    };

    if paths.is_empty() {
        println!("no changes to assess");
        return Ok(false);
    }

    let repo_id = repo_id.unwrap_or_else(|| {
        repo_root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown-repo".to_string())
    });

    let provider = providers::build_provider(&config).context("constructing the LLM provider")?;
    let block_mode = if advisory {
        BlockMode::Advisory
    } else {
        BlockMode::Enforced
    };

    let pipeline = Pipeline::connect(&repo_root, repo_id, config, provider, block_mode)
        .await
        .context("connecting to the knowledge graph and relational store")?;

    let assessments = pipeline.evaluate_all(&repo, &paths).await;

    let verbosity = match (ai_mode, explain, pre_commit) {
        (true, _, _) => None,
        (false, true, _) => Some(Verbosity::Explain),
        (false, false, true) => Some(Verbosity::PreCommit),
        (false, false, false) => Some(Verbosity::Default),
    };

    let mut any_blocked = false;
    for assessment in &assessments {
        any_blocked |= assessment.should_block;
        match verbosity {
            Some(v) => {
                output::print_assessment(assessment, v);
            }
            None => output::print_ai_mode(assessment),
        }
    }
    if !ai_mode && !pre_commit {
        output::print_summary(&assessments);
    }

    Ok(any_blocked)
}
