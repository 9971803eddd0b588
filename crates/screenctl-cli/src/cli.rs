//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use screenctl_core::{Result, ScreenConfig};

/// Version shown by `--version`, e.g. `0.3.0 (abc1234, 2026-10-15)`.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

/// Screenctl - drive GNU screen sessions from scripts
#[derive(Parser, Debug)]
#[command(name = "screenctl")]
#[command(author, version = LONG_VERSION, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Screen socket directory
    #[arg(long, env = "SCREENDIR")]
    pub screen_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List running sessions
    List {
        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Create a detached session and wait for it to start
    New {
        /// Session name
        name: String,

        /// Shell or program to run in the session
        #[arg(short, long, default_value = "sh")]
        shell: String,

        /// Seconds to wait for the session to appear
        #[arg(short, long, default_value_t = 10)]
        timeout: u64,
    },

    /// Paste text into a session's input
    Stuff {
        /// Session name
        name: String,

        /// Text to send, joined with spaces
        #[arg(required = true)]
        text: Vec<String>,

        /// Append a newline to submit the line
        #[arg(short, long)]
        enter: bool,
    },

    /// Change a session's working directory
    Chdir {
        /// Session name
        name: String,

        /// Directory for new windows
        path: PathBuf,
    },

    /// Run a program in a new window of a session
    Exec {
        /// Session name
        name: String,

        /// File descriptor pattern, e.g. "!..|"
        #[arg(long, default_value = "")]
        fdpat: String,

        /// Program to run
        command: String,

        /// Program arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Dump a session's scrollback buffer
    Hardcopy {
        /// Session name
        name: String,

        /// Write to this file instead of stdout
        path: Option<PathBuf>,

        /// Append to the file instead of replacing it
        #[arg(short, long)]
        append: bool,
    },

    /// Log a session's output to a file (omit path to stop logging)
    Log {
        /// Session name
        name: String,

        /// Log file
        path: Option<PathBuf>,

        /// Append to an existing log file
        #[arg(short, long)]
        append: bool,

        /// Flush interval in seconds
        #[arg(short, long, default_value_t = 10)]
        flush: u64,
    },

    /// Clear a session's scrollback buffer
    Clear {
        /// Session name
        name: String,
    },

    /// Quit a session
    Quit {
        /// Session name
        name: String,
    },

    /// Kill a session's current window
    Kill {
        /// Session name
        name: String,
    },

    /// Signal every process running in a session
    Signal {
        /// Session name
        name: String,

        /// Signal number or name (TERM, INT, KILL, ...)
        #[arg(value_parser = parse_signal)]
        signal: i32,
    },

    /// Run a command in a session and print what it logs
    Capture {
        /// Session name
        name: String,

        /// Command line to type into the session
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,

        /// Seconds to wait for output
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Brief,
}

/// Parse a signal given as a number or a name with or without `SIG`.
pub fn parse_signal(value: &str) -> std::result::Result<i32, String> {
    if let Ok(number) = value.parse::<i32>() {
        return if number > 0 {
            Ok(number)
        } else {
            Err(format!("invalid signal number: {}", number))
        };
    }

    let upper = value.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    match name {
        "HUP" => Ok(1),
        "INT" => Ok(2),
        "QUIT" => Ok(3),
        "KILL" => Ok(9),
        "USR1" => Ok(10),
        "USR2" => Ok(12),
        "TERM" => Ok(15),
        "CONT" => Ok(18),
        "STOP" => Ok(19),
        _ => Err(format!("unknown signal: {}", value)),
    }
}

impl Cli {
    /// Resolve the screen configuration for this invocation.
    pub fn config(&self) -> Result<ScreenConfig> {
        ScreenConfig::resolve(self.screen_dir.clone())
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
