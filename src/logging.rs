//! Structured logging initialization for koboswitch.
//!
//! Logs always go to stderr so stdout stays clean for results, which in
//! robot mode are JSON documents.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines, one event per line.
    Json,
    /// Colored multi-field output for an interactive terminal.
    Pretty,
    /// Single-line plain output for pipes and files.
    Compact,
}

impl LogFormat {
    /// Picks the format for the current stderr.
    pub fn detect(robot_mode: bool) -> Self {
        if robot_mode {
            Self::Json
        } else if io::stderr().is_terminal() {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// Filter used when `RUST_LOG` is unset.
///
/// `-q` wins over `-v`.
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "koboswitch=error";
    }
    match verbose {
        0 => "koboswitch=info",
        1 => "koboswitch=debug",
        _ => "koboswitch=trace",
    }
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Arguments
///
/// * `robot_mode` - If true, output structured JSON logs for machine consumption
/// * `verbose` - Verbosity level: 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - If true, only errors are logged
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override default filter (e.g., "koboswitch=debug,rusqlite=warn")
///
/// # Output Behavior
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | Robot | any | JSON lines to stderr |
/// | Human | yes | Pretty colored output to stderr |
/// | Human | no | Compact plain output to stderr |
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let base = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr);

    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::detect(robot_mode) {
        LogFormat::Json => registry.with(base.json().with_target(true)).init(),
        LogFormat::Pretty => registry.with(base.with_target(false)).init(),
        LogFormat::Compact => registry
            .with(base.compact().with_ansi(false).with_target(false))
            .init(),
    }
}
