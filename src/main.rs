use std::io::Write as _;
use std::process::Command;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use cathedral_swarm::agent::default_agents;
use cathedral_swarm::artifact::ArtifactStore;
use cathedral_swarm::config::Config;
use cathedral_swarm::core::graph::TaskGraph;
use cathedral_swarm::orchestration::Orchestrator;
use cathedral_swarm::tmux::{shell_escape, Tmux};
use cathedral_swarm::{swlog, swlog_error, Result};

/// Whole-run deadline; the poll loops check cancellation every tick.
const RUN_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Marks re-execution inside the tmux session. Without it, the binary wraps
/// itself: create the session, re-exec in pane 0, attach.
const INSIDE_ENV: &str = "SWARM_INSIDE";

/// Swarm - turn one goal into a DAG of coding tasks driven by Claude Code agents in tmux panes
#[derive(Parser, Debug)]
#[command(name = "swarm")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    SWARM_DEBUG=1   Enable debug logging (alternative to --debug)")]
struct Cli {
    /// Enable debug logging (writes to ~/.swarm/swarm.log)
    #[arg(short = 'd', long)]
    debug: bool,

    /// The goal to build, in natural language
    #[arg(required = true, num_args = 1..)]
    goal: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cathedral_swarm::log::init_with_debug(cli.debug);

    let goal = cli.goal.join(" ");
    preflight();

    let config = Config::load()?;
    let session = config.effective_session().to_string();

    if std::env::var(INSIDE_ENV).as_deref() != Ok("1") {
        return launch_in_tmux(&session, &goal);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_orchestrator(&config, &session, &goal))
}

/// Create a tmux session running this binary as pane 0, then attach.
fn launch_in_tmux(session: &str, goal: &str) -> Result<()> {
    Tmux::kill_session(session)?;

    let bin = std::env::current_exe()?;
    let inner_cmd = format!(
        "{}=1 {} {}",
        INSIDE_ENV,
        shell_escape(&bin.display().to_string()),
        shell_escape(goal)
    );
    Tmux::create_session(session, &inner_cmd)?;
    Tmux::configure_session(session)?;

    // Attach; blocks until the user detaches or the session dies
    let status = Command::new("tmux")
        .args(["attach", "-t", session])
        .status()?;
    if !status.success() {
        swlog_error!("tmux attach exited with {}", status);
    }
    Ok(())
}

async fn run_orchestrator(config: &Config, session: &str, goal: &str) -> Result<()> {
    let store = ArtifactStore::new(config.effective_base_dir());
    store.ensure_layout()?;

    let agents = default_agents(store.clone());
    let mut orch = Orchestrator::new(session, agents, store);

    let cancel = CancellationToken::new();

    // Deadline: cancel the whole run after the timeout
    let deadline_cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(RUN_TIMEOUT).await;
        deadline_cancel.cancel();
    });

    // Ctrl-C kills the session so orphan assistants do not persist
    let signal_cancel = cancel.clone();
    let signal_session = session.to_string();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            swlog!("interrupted, killing tmux session...");
            let _ = Tmux::kill_session(&signal_session);
            signal_cancel.cancel();
        }
    });

    let start = Instant::now();
    swlog!("=== Cathedral Swarm ===");
    swlog!("Goal: {}", goal);

    let result = orch.run(&cancel, goal).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(()) => swlog!("swarm completed in {:?}", elapsed),
        Err(e) => swlog_error!("swarm failed after {:?}: {}", elapsed, e),
    }
    print_summary(orch.graph());
    if let Some(path) = cathedral_swarm::log::path() {
        println!("Log: {}", path.display());
    }

    println!("\nPress Enter to exit...");
    let mut buf = String::new();
    let _ = std::io::stdin().read_line(&mut buf);

    result
}

/// Abort early with installation hints if required binaries are missing.
fn preflight() {
    let missing: Vec<&str> = ["tmux", "claude"]
        .into_iter()
        .filter(|bin| which::which(bin).is_err())
        .collect();
    if missing.is_empty() {
        return;
    }
    eprintln!("required commands not found: {}", missing.join(", "));
    eprintln!("install with: sudo apt-get install tmux  (or brew install tmux)");
    eprintln!("claude: https://docs.anthropic.com/en/docs/claude-code");
    let _ = std::io::stderr().flush();
    std::process::exit(1);
}

fn print_summary(graph: &TaskGraph) {
    println!("\n=== Task Summary ===");
    for t in graph.tasks() {
        let pane = match &t.pane_id {
            Some(p) => format!(" [pane {}]", p),
            None => String::new(),
        };
        println!(
            "  [{}] {} ({}){}: {}",
            t.status, t.id, t.role, pane, t.description
        );
    }
    println!("\nArtifacts written to ./artifacts/");
}
