//! File-backed run log.
//!
//! The DAG display repaints the whole terminal every poll tick, so the file
//! at `~/.swarm/swarm.log` is the durable record of a run: phase changes,
//! launches, verdicts, tmux invocations. One file per run, truncated on
//! startup. The threshold is Info unless `--debug` or `SWARM_DEBUG=1`
//! raises it to Trace.

use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

static SINK: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static THRESHOLD: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Severity of a log line, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// Open the log sink. Until this runs, every log call is a no-op, which is
/// what library consumers and tests get.
pub fn init_with_debug(debug: bool) {
    let env_debug = matches!(
        std::env::var("SWARM_DEBUG").as_deref(),
        Ok("1") | Ok("true")
    );
    if debug || env_debug {
        THRESHOLD.store(LogLevel::Trace as u8, Ordering::SeqCst);
    }

    let Some(home) = dirs::home_dir() else { return };
    let dir = home.join(".swarm");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let path = dir.join("swarm.log");
    // File::create truncates the previous run's log
    if let Ok(file) = File::create(&path) {
        let _ = SINK.set(Mutex::new(file));
        let _ = LOG_PATH.set(path);
    }
}

/// Where the current run is logging to, once initialized.
pub fn path() -> Option<&'static Path> {
    LOG_PATH.get().map(PathBuf::as_path)
}

pub fn set_threshold(level: LogLevel) {
    THRESHOLD.store(level as u8, Ordering::SeqCst);
}

pub fn threshold() -> LogLevel {
    match THRESHOLD.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        3 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Append one line to the run log. Lines above the threshold, or written
/// before the sink opens, are dropped quietly.
pub fn write(level: LogLevel, msg: &str) {
    if (level as u8) > THRESHOLD.load(Ordering::Relaxed) {
        return;
    }
    let Some(sink) = SINK.get() else { return };
    let Ok(mut file) = sink.lock() else { return };
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let _ = writeln!(file, "{} {:<5} {}", stamp, level.tag(), msg);
}

/// Log macro for INFO level.
#[macro_export]
macro_rules! swlog {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Info, &format!($($arg)*))
    };
}

/// Log macro for ERROR level.
#[macro_export]
macro_rules! swlog_error {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Error, &format!($($arg)*))
    };
}

/// Log macro for WARN level.
#[macro_export]
macro_rules! swlog_warn {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Warn, &format!($($arg)*))
    };
}

/// Log macro for DEBUG level.
#[macro_export]
macro_rules! swlog_debug {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Debug, &format!($($arg)*))
    };
}

/// Log macro for TRACE level (tmux invocations, per-wave noise).
#[macro_export]
macro_rules! swlog_trace {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Trace, &format!($($arg)*))
    };
}
