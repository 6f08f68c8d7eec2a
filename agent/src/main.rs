//! CLI for running autonomous coding-agent sessions.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use agent::core::state::AgentState;
use agent::io::config::{AgentConfig, load_config, write_config};
use agent::io::workspace::WorkspacePaths;
use agent::looping::{StopCause, run_session};
use agent::oracle::CommandOracle;
use agent::selector::ToolSelector;
use agent::tools::{ToolRegistry, execute::ExecSettings};
use agent::{exit_codes, logging};

const CONFIG_FILE: &str = "agent.toml";

#[derive(Parser)]
#[command(
    name = "agent",
    version,
    about = "Autonomous coding-agent session loop"
)]
struct Cli {
    /// Workspace directory holding `agent.toml`, `solutions/` and `logs/`.
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the workspace layout and a default `agent.toml` if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Run one session against a problem statement.
    Solve {
        /// The problem statement.
        problem: Option<String>,

        /// Read the problem statement from a file instead.
        #[arg(long, conflicts_with = "problem")]
        problem_file: Option<PathBuf>,

        /// Override the configured invocation budget.
        #[arg(long)]
        max_calls: Option<u32>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.workspace, force),
        Command::Solve {
            problem,
            problem_file,
            max_calls,
        } => cmd_solve(&cli.workspace, problem, problem_file, max_calls),
    }
}

fn cmd_init(workspace: &Path, force: bool) -> Result<i32> {
    let paths = WorkspacePaths::new(workspace);
    paths.init()?;

    let config_path = workspace.join(CONFIG_FILE);
    if force || !config_path.exists() {
        write_config(&config_path, &AgentConfig::default())?;
        println!("wrote {}", config_path.display());
    } else {
        println!("kept existing {}", config_path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_solve(
    workspace: &Path,
    problem: Option<String>,
    problem_file: Option<PathBuf>,
    max_calls: Option<u32>,
) -> Result<i32> {
    let problem = match (problem, problem_file) {
        (Some(problem), None) => problem,
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("read problem file {}", path.display()))?
            .trim()
            .to_string(),
        // clap rejects the conflicting pair before we get here.
        _ => bail!("a problem statement or --problem-file is required"),
    };
    if problem.is_empty() {
        bail!("problem statement is empty");
    }

    let mut config = load_config(&workspace.join(CONFIG_FILE))?;
    if let Some(max_calls) = max_calls {
        config.max_tool_calls = max_calls;
        config.validate()?;
    }

    let paths = WorkspacePaths::new(workspace);
    paths.init()?;

    let oracle = CommandOracle::new(
        config.oracle.command.clone(),
        Duration::from_secs(config.oracle_timeout_secs),
        config.output_limit_bytes,
    );
    let exec_settings = ExecSettings {
        interpreter: config.interpreter.clone(),
        timeout: Duration::from_secs(config.exec_timeout_secs),
        output_limit_bytes: config.output_limit_bytes,
    };
    let registry = ToolRegistry::standard(&oracle, &paths, &exec_settings);
    let thresholds = config.thresholds();
    let selector = ToolSelector::new(&oracle, thresholds);

    let mut state = AgentState::new(problem, config.max_tool_calls);
    let max_calls = state.max_tool_calls();
    let outcome = run_session(
        &mut state,
        &selector,
        &registry,
        &thresholds,
        &paths.logs_dir,
        None,
        |cycle| {
            let glyph = if cycle.success { "✓" } else { "✗" };
            println!(
                "[{}/{max_calls}] {} {glyph} {} (best {}/100)",
                cycle.cycle, cycle.tool, cycle.reasoning, cycle.best_quality
            );
        },
    )?;

    println!();
    match outcome.stop_cause {
        StopCause::OracleStop => println!("stopped: {}", state.stop_reason()),
        StopCause::HighQuality => println!("stopped: {}", state.stop_reason()),
        StopCause::BudgetExhausted => println!("stopped: invocation budget exhausted"),
        StopCause::Interrupted => println!("stopped: interrupted"),
    }
    match state.best_solution() {
        Some(best) => println!("best solution: {best} ({}/100)", state.best_quality()),
        None => println!("no solution was produced"),
    }
    if let Some(path) = &outcome.report_path {
        println!("report: {}", path.display());
    }

    let code = match outcome.stop_cause {
        StopCause::OracleStop | StopCause::HighQuality => exit_codes::OK,
        StopCause::BudgetExhausted | StopCause::Interrupted => exit_codes::INCOMPLETE,
    };
    Ok(code)
}
