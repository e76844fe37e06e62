//! Centralized shell output and progress management.
//!
//! The Shell module provides a unified API for all CLI output:
//! - Status messages with consistent formatting
//! - One spinner per grammar (via indicatif)
//! - Scoped timing spans with delayed start
//! - JSON output mode for machine-readable output
//!
//! # Design Principles
//!
//! 1. **Commands never manage spacing/indentation directly** - Shell handles all formatting
//! 2. **JSON mode is mutually exclusive** - No human output when JSON mode is enabled
//! 3. **Spans stay silent when fast** - Only spans over 200ms (or verbose) are reported
//! 4. **Timing is always shown** - End messages include duration unless in quiet mode

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::events::BuildEvent;
use crate::util::config::LogLevel;

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors and spinners.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only, no spinners
    Quiet,
    /// Default: status messages + spinners
    #[default]
    Normal,
    /// Immediate status lines, no spinners
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
///
/// Shell handles all formatting - callers just specify the semantic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Built,
    Cached,
    Emitted,
    Finished,
    Removed,

    // In-progress statuses (cyan)
    Building,
    Resolving,
    Serving,

    // Info statuses (blue/default)
    Info,

    // Warning statuses (yellow)
    Warning,

    // Error statuses (red)
    Failed,
    Error,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Built => "Built",
            Status::Cached => "Cached",
            Status::Emitted => "Emitted",
            Status::Finished => "Finished",
            Status::Removed => "Removed",
            Status::Building => "Building",
            Status::Resolving => "Resolving",
            Status::Serving => "Serving",
            Status::Info => "Info",
            Status::Warning => "Warning",
            Status::Failed => "Build failed",
            Status::Error => "error",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self {
            Status::Built | Status::Cached | Status::Emitted | Status::Finished | Status::Removed => {
                "\x1b[1;32m"
            }
            Status::Building | Status::Resolving | Status::Serving => {
                "\x1b[1;36m"
            }
            Status::Info => "\x1b[1;34m",
            Status::Warning => "\x1b[1;33m",
            Status::Failed | Status::Error => "\x1b[1;31m",
        }
    }

    /// Whether quiet mode still prints this status.
    fn is_error(&self) -> bool {
        matches!(self, Status::Failed | Status::Error)
    }

    /// Get the width for alignment (12 characters).
    fn width(&self) -> usize {
        12
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    /// Lines emitted in JSON mode, kept so tests can inspect them
    #[cfg(test)]
    json_output: Mutex<Vec<String>>,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            #[cfg(test)]
            json_output: Mutex::new(Vec::new()),
        }
    }

    /// Create a shell from the configured log level and CLI flags.
    ///
    /// JSON mode takes precedence over the log level.
    pub fn from_log_level(level: LogLevel, color: ColorChoice, message_format_json: bool) -> Self {
        let mode = if message_format_json {
            ShellMode::Json
        } else {
            ShellMode::Human {
                verbosity: level.verbosity(),
                color,
            }
        };

        Shell::new(mode)
    }

    /// A shell that prints nothing but errors, for tests and embedding.
    pub fn quiet() -> Self {
        Shell::new(ShellMode::Human {
            verbosity: Verbosity::Quiet,
            color: ColorChoice::Never,
        })
    }

    /// Get the current shell mode.
    pub fn mode(&self) -> &ShellMode {
        &self.mode
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    /// Check if shell is in JSON mode.
    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`
    ///
    /// In quiet mode, only error statuses are printed.
    /// In JSON mode, messages are silently ignored (use [`Shell::event`]).
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }

        if self.is_quiet() && !status.is_error() {
            return;
        }

        let prefix = self.format_status(status);
        eprintln!("{} {}", prefix, msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    ///
    /// In JSON mode, this outputs a JSON error event.
    pub fn error(&self, msg: impl Display) {
        if self.is_json() {
            self.event(&BuildEvent::Error {
                message: msg.to_string(),
            });
        } else {
            self.status(Status::Error, msg);
        }
    }

    /// Emit a build event to stdout. Ignored in human mode.
    pub fn event(&self, event: &BuildEvent) {
        if !self.is_json() {
            return;
        }

        let json_str = event.to_json();
        println!("{}", json_str);
        let _ = io::stdout().flush();

        self.record_json(json_str);
    }

    #[cfg(test)]
    fn record_json(&self, line: String) {
        if let Ok(mut buffer) = self.json_output.lock() {
            buffer.push(line);
        }
    }

    #[cfg(not(test))]
    fn record_json(&self, _line: String) {}

    /// JSON lines emitted so far.
    #[cfg(test)]
    pub fn json_lines(&self) -> Vec<String> {
        self.json_output
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// Format a status prefix with optional color.
    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        let width = status.width();

        if self.use_color {
            let color = status.color_code();
            format!("{}{:>width$}\x1b[0m", color, text, width = width)
        } else {
            format!("{:>width$}", text, width = width)
        }
    }

    /// Create a scoped span for timing operations.
    ///
    /// The end message with timing is printed unless in quiet mode, and only
    /// when the span ran longer than 200ms or verbose output is on.
    pub fn span(self: &Arc<Self>, status: Status, msg: impl Display) -> Span {
        Span::new(Arc::clone(self), status, msg.to_string())
    }

    /// Start a spinner for one grammar in the `Building` state.
    pub fn grammar_spinner(self: &Arc<Self>, name: impl Display) -> GrammarSpinner {
        GrammarSpinner::new(Arc::clone(self), name.to_string())
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}

/// A scoped timing span with delayed start output.
///
/// In verbose mode the start message is printed immediately. On drop the
/// message is repeated with the elapsed time, when the span was announced
/// or outlived the default delay (200ms).
pub struct Span {
    shell: Arc<Shell>,
    status: Status,
    message: String,
    start: Instant,
    start_printed: bool,
}

impl Span {
    /// Default delay before a span is worth reporting.
    const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    fn new(shell: Arc<Shell>, status: Status, message: String) -> Self {
        let start_printed = shell.is_verbose();

        if start_printed {
            shell.status(status, &message);
        }

        Span {
            shell,
            status,
            message,
            start: Instant::now(),
            start_printed,
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.shell.is_json() || self.shell.is_quiet() {
            return;
        }

        let elapsed = self.start.elapsed();
        if self.start_printed || elapsed > Self::DEFAULT_DELAY {
            self.shell.status(
                self.status,
                format!("{} in {}", self.message, format_duration(elapsed)),
            );
        }
    }
}

/// Spinner tracking one grammar through Building to Built, Cached or Failed.
///
/// Outside normal human mode no spinner is drawn; the final state is still
/// printed as a status line (or emitted as an event in JSON mode).
pub struct GrammarSpinner {
    shell: Arc<Shell>,
    name: String,
    pb: Option<ProgressBar>,
    start: Instant,
    done: bool,
}

impl GrammarSpinner {
    fn new(shell: Arc<Shell>, name: String) -> Self {
        let draw = !shell.is_quiet()
            && !shell.is_verbose()
            && !shell.is_json()
            && io::stderr().is_terminal();

        let pb = if draw {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(format!("Building {}", name));
            pb.enable_steady_tick(Duration::from_millis(80));
            Some(pb)
        } else {
            if shell.is_verbose() {
                shell.status(Status::Building, &name);
            }
            None
        };

        GrammarSpinner {
            shell,
            name,
            pb,
            start: Instant::now(),
            done: false,
        }
    }

    /// Grammar name shown by this spinner.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The artifact was compiled.
    pub fn built(mut self, artifact: impl Display) {
        let elapsed = format_duration(self.start.elapsed());
        self.finish(
            Status::Built,
            format!("{} ({}) in {}", self.name, artifact, elapsed),
        );
    }

    /// The cached artifact was reused.
    pub fn cached(mut self, artifact: impl Display) {
        self.finish(Status::Cached, format!("{} ({})", self.name, artifact));
    }

    /// The build failed.
    pub fn failed(mut self) {
        self.finish(Status::Failed, self.name.clone());
    }

    fn finish(&mut self, status: Status, line: String) {
        self.done = true;
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        self.shell.status(status, line);
    }
}

impl Drop for GrammarSpinner {
    fn drop(&mut self) {
        if !self.done {
            if let Some(pb) = self.pb.take() {
                pb.finish_and_clear();
            }
        }
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
