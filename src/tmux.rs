//! Thin driver over the `tmux` command-line tool.
//!
//! Agents run as interactive TUIs inside named windows of one detached
//! session. Their stdout is never parsed; the orchestrator only cares
//! whether a pane is still alive and types the initial instruction into it.

use std::process::Command;
use std::time::Duration;

use crate::{swlog_debug, swlog_trace, swlog_warn, util, Error, Result};

/// How long a freshly-spawned TUI needs before it accepts input.
const TUI_INIT_WAIT: Duration = Duration::from_secs(5);
/// Pause between typing the message text and pressing Enter. The TUI does
/// not accept text+Enter atomically.
const ENTER_DELAY: Duration = Duration::from_millis(500);
/// Bound on the window-creation call; a wedged tmux server blocks forever.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Metadata about a tmux pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
    pub id: String,
    pub dead: bool,
}

pub struct Tmux;

impl Tmux {
    /// Create a detached session whose pane 0 runs `inner_cmd`.
    pub fn create_session(name: &str, inner_cmd: &str) -> Result<()> {
        swlog_debug!("Tmux::create_session name={} cmd={}", name, inner_cmd);
        run(&[
            "new-session",
            "-d",
            "-s",
            name,
            "-x",
            "200",
            "-y",
            "50",
            inner_cmd,
        ])
    }

    /// Apply session-level options: dead panes auto-close and a deep
    /// scrollback so agent output survives review.
    pub fn configure_session(name: &str) -> Result<()> {
        let _ = run(&["set-option", "-t", name, "remain-on-exit", "off"]);
        let _ = run(&["set-option", "-t", name, "history-limit", "50000"]);
        Ok(())
    }

    /// Destroy the session. A missing session is not an error.
    pub fn kill_session(name: &str) -> Result<()> {
        swlog_debug!("Tmux::kill_session name={}", name);
        match run(&["kill-session", "-t", name]) {
            Ok(()) => Ok(()),
            Err(Error::Tmux(msg))
                if msg.contains("session not found") || msg.contains("no server running") =>
            {
                swlog_debug!("Tmux session '{}' not found (already dead?)", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Create a named window in the session without stealing focus.
    /// Returns the new window's pane identifier.
    pub fn new_window(session: &str, name: &str, cmd: &str) -> Result<String> {
        swlog_debug!("Tmux::new_window session={} name={}", session, name);
        let out = output(&[
            "new-window", "-d", "-t", session, "-n", name, "-P", "-F", "#{pane_id}", cmd,
        ])?;
        Ok(out.trim().to_string())
    }

    /// Create a named window running `cmd`, wait for the TUI to initialize,
    /// then type `initial_msg` as literal text and press Enter separately so
    /// the TUI processes both correctly.
    pub async fn new_auto_window(
        session: &str,
        name: &str,
        cmd: &str,
        initial_msg: &str,
    ) -> Result<String> {
        let pane_id = {
            let (session, name, cmd) = (session.to_string(), name.to_string(), cmd.to_string());
            util::blocking_with_timeout(LAUNCH_TIMEOUT, move || {
                Self::new_window(&session, &name, &cmd)
            })
            .await?
        };

        tokio::time::sleep(TUI_INIT_WAIT).await;

        // -l sends the text without key-name interpretation
        run(&["send-keys", "-t", &pane_id, "-l", initial_msg])?;

        tokio::time::sleep(ENTER_DELAY).await;

        run(&["send-keys", "-t", &pane_id, "Enter"])?;

        swlog_debug!("Tmux::new_auto_window pane={} name={}", pane_id, name);
        Ok(pane_id)
    }

    /// True if the pane exists and its process is still running.
    pub fn is_pane_alive(pane_id: &str) -> bool {
        let filter = format!("#{{==:#{{pane_id}},{}}}", pane_id);
        let out = match output(&[
            "list-panes",
            "-a",
            "-F",
            "#{pane_id} #{pane_dead}",
            "-f",
            &filter,
        ]) {
            Ok(out) => out,
            Err(_) => return false,
        };
        let trimmed = out.trim();
        if trimmed.is_empty() {
            return false;
        }
        !trimmed.ends_with('1')
    }

    /// Enumerate all panes in a session with their dead flags.
    pub fn list_panes(session: &str) -> Result<Vec<PaneInfo>> {
        let out = output(&["list-panes", "-t", session, "-F", "#{pane_id} #{pane_dead}"])?;
        Ok(out.lines().filter_map(parse_pane_line).collect())
    }

    /// Send keystrokes to a pane, followed by Enter.
    pub fn send_keys(pane_id: &str, keys: &str) -> Result<()> {
        swlog_debug!("Tmux::send_keys pane={} keys={}", pane_id, keys);
        run(&["send-keys", "-t", pane_id, keys, "Enter"])
    }

    pub fn is_available() -> bool {
        Command::new("tmux")
            .arg("-V")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

fn parse_pane_line(line: &str) -> Option<PaneInfo> {
    let mut parts = line.split_whitespace();
    let id = parts.next()?.to_string();
    let dead = parts.next()?;
    Some(PaneInfo {
        id,
        dead: dead == "1",
    })
}

fn run(args: &[&str]) -> Result<()> {
    swlog_trace!("tmux {}", args.join(" "));
    let out = Command::new("tmux").args(args).output()?;
    if !out.status.success() {
        let err = combined_error(args[0], &out.stdout, &out.stderr);
        swlog_warn!("{}", err);
        return Err(Error::Tmux(err));
    }
    Ok(())
}

fn output(args: &[&str]) -> Result<String> {
    swlog_trace!("tmux {}", args.join(" "));
    let out = Command::new("tmux").args(args).output()?;
    if !out.status.success() {
        return Err(Error::Tmux(combined_error(args[0], &out.stdout, &out.stderr)));
    }
    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

/// Error text keyed by the tmux verb, carrying whatever the command printed.
fn combined_error(verb: &str, stdout: &[u8], stderr: &[u8]) -> String {
    let mut msg = String::from_utf8_lossy(&stderr).trim().to_string();
    let extra = String::from_utf8_lossy(&stdout);
    let extra = extra.trim();
    if !extra.is_empty() {
        if !msg.is_empty() {
            msg.push(' ');
        }
        msg.push_str(extra);
    }
    format!("tmux {}: {}", verb, msg)
}

/// Quote a string for use inside a shell command line.
pub fn shell_escape(s: &str) -> String {
    if s.chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}
