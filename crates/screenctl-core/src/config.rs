//! Screen orchestration configuration.
//!
//! Configuration is resolved once at startup. Failing to locate the screen
//! binary, the socket directory or the invoking user is a fatal
//! [`ScreenError::Config`] rather than a per-call error.
//!
//! # Environment Variables
//!
//! - `SCREENDIR`: Override the screen socket directory (default `/run/screen`)
//! - `USER` / `LOGNAME`: Invoking user

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::{Result, ScreenError};

/// Environment variable for a custom screen socket directory.
pub const SCREEN_DIR_ENV: &str = "SCREENDIR";

/// Default socket directory when `SCREENDIR` is unset.
pub const DEFAULT_SCREEN_DIR: &str = "/run/screen";

/// Configuration for the screen orchestrator.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Path to the screen binary.
    pub screen_path: PathBuf,
    /// Socket directory, exported to every screen invocation when set.
    pub screen_dir: Option<PathBuf>,
    /// Invoking user.
    pub user: String,
    /// How often to poll discovery while waiting for a new session.
    pub create_poll_interval: Duration,
    /// How often to poll the log file during output capture.
    pub capture_poll_interval: Duration,
    /// Delay between enabling logging and injecting input.
    pub capture_settle_delay: Duration,
    /// Log flush interval used during output capture.
    pub capture_flush_interval: Duration,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            screen_path: PathBuf::from("screen"),
            screen_dir: None,
            user: String::new(),
            create_poll_interval: Duration::from_millis(100),
            capture_poll_interval: Duration::from_secs(1),
            capture_settle_delay: Duration::from_secs(2),
            capture_flush_interval: Duration::from_secs(1),
        }
    }
}

impl ScreenConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::ScreenNotFound` if screen is not in PATH and
    /// `ScreenError::Config` if the socket directory or user cannot be
    /// resolved.
    pub fn from_env() -> Result<Self> {
        Self::resolve(None)
    }

    /// Like [`from_env`](Self::from_env), with `screen_dir` taking precedence
    /// over `SCREENDIR`.
    pub fn resolve(screen_dir: Option<PathBuf>) -> Result<Self> {
        let screen_path = which::which("screen").map_err(|_| ScreenError::ScreenNotFound)?;

        let screen_dir = screen_dir
            .or_else(|| std::env::var_os(SCREEN_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCREEN_DIR));
        check_screen_dir(&screen_dir)?;

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .ok()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ScreenError::Config("cannot determine current user".to_string()))?;

        debug!(
            screen = %screen_path.display(),
            dir = %screen_dir.display(),
            user = %user,
            "resolved screen configuration"
        );

        Ok(Self {
            screen_path,
            screen_dir: Some(screen_dir),
            user,
            ..Self::default()
        })
    }

    /// Sets the screen binary path.
    pub fn with_screen_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.screen_path = path.into();
        self
    }

    /// Sets the socket directory.
    pub fn with_screen_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screen_dir = Some(dir.into());
        self
    }

    /// Sets the creation poll interval.
    pub fn with_create_poll_interval(mut self, interval: Duration) -> Self {
        self.create_poll_interval = interval;
        self
    }

    /// Sets the capture poll interval.
    pub fn with_capture_poll_interval(mut self, interval: Duration) -> Self {
        self.capture_poll_interval = interval;
        self
    }

    /// Sets the capture settle delay.
    pub fn with_capture_settle_delay(mut self, delay: Duration) -> Self {
        self.capture_settle_delay = delay;
        self
    }

    /// Sets the capture log flush interval. screen flushes in whole seconds.
    pub fn with_capture_flush_interval(mut self, interval: Duration) -> Self {
        self.capture_flush_interval = interval;
        self
    }

    /// Sets the invoking user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Environment passed to every screen invocation.
    pub(crate) fn screen_env(&self) -> Vec<(String, String)> {
        self.screen_dir
            .iter()
            .map(|dir| (SCREEN_DIR_ENV.to_string(), dir.to_string_lossy().into_owned()))
            .collect()
    }
}

fn check_screen_dir(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ScreenError::Config(format!(
            "{} is not a directory",
            dir.display()
        ))),
        Err(e) => Err(ScreenError::Config(format!(
            "screen directory {}: {}",
            dir.display(),
            e
        ))),
    }
}
