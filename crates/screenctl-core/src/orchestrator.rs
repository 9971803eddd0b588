//! Screen orchestrator for session discovery and lifecycle.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::registry::{SessionLock, SessionRegistry};
use crate::runner::{CommandOutput, CommandRunner, ProcessRunner};
use crate::session::{self, Session};
use crate::{Result, ScreenConfig, ScreenError};

/// Main screen orchestrator.
///
/// Every mutating operation holds the session's lock for its whole duration,
/// so operations against one name never interleave their screen invocations.
/// Operations on different names run independently.
pub struct ScreenOrchestrator {
    config: ScreenConfig,
    runner: Arc<dyn CommandRunner>,
    registry: Arc<SessionRegistry>,
}

impl std::fmt::Debug for ScreenOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenOrchestrator")
            .field("config", &self.config)
            .field("sessions_seen", &self.registry.len())
            .finish()
    }
}

impl ScreenOrchestrator {
    /// Create an orchestrator from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::ScreenNotFound` if screen is not available and
    /// `ScreenError::Config` if the environment cannot be resolved.
    pub fn new() -> Result<Self> {
        Ok(Self::with_config(ScreenConfig::from_env()?))
    }

    /// Create an orchestrator with an explicit configuration.
    pub fn with_config(config: ScreenConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner), SessionRegistry::global())
    }

    /// Create an orchestrator with a custom runner and registry.
    pub fn with_runner(
        config: ScreenConfig,
        runner: Arc<dyn CommandRunner>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            config,
            runner,
            registry,
        }
    }

    /// Check if screen is available in PATH.
    pub fn is_available() -> bool {
        which::which("screen").is_ok()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Returns the lock registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Run a screen command and return the output.
    async fn run_screen(&self, args: &[String]) -> Result<CommandOutput> {
        trace!(args = ?args, "running screen command");
        let output = self
            .runner
            .run(&self.config.screen_path, args, &self.config.screen_env())
            .await?;
        Ok(output)
    }

    /// Run a screen command and check for success.
    async fn run_screen_checked(&self, args: &[String]) -> Result<CommandOutput> {
        let output = self.run_screen(args).await?;
        if output.success {
            Ok(output)
        } else {
            Err(ScreenError::CommandFailed(output.combined()))
        }
    }

    /// Run `screen -S <name> -X <command...>`.
    pub(crate) async fn control(&self, name: &str, command: &[&str]) -> Result<()> {
        let mut args = vec!["-S".to_string(), name.to_string(), "-X".to_string()];
        args.extend(command.iter().map(|s| s.to_string()));
        self.run_screen_checked(&args).await?;
        Ok(())
    }

    // ==================== Discovery ====================

    /// Find a running session by exact name.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::InvalidInput` for an empty name and
    /// `ScreenError::SessionNotFound` if no session has that name.
    pub async fn find(&self, name: &str) -> Result<Session> {
        validate_name(name)?;

        // screen -ls exits non-zero even when it lists sessions
        let output = self.run_screen(&["-ls".to_string(), name.to_string()]).await?;
        let entry = session::find_entry(&output.combined(), name)?
            .ok_or_else(|| ScreenError::SessionNotFound(name.to_string()))?;

        let lock = self.registry.acquire_lock(&entry.name);
        Ok(Session::new(entry, lock))
    }

    /// List all running sessions.
    pub async fn find_all(&self) -> Result<Vec<Session>> {
        let output = self.run_screen(&["-ls".to_string()]).await?;
        let sessions = session::parse_listing(&output.combined())
            .into_iter()
            .map(|entry| {
                let lock = self.registry.acquire_lock(&entry.name);
                Session::new(entry, lock)
            })
            .collect::<Vec<_>>();
        debug!(count = sessions.len(), "listed screen sessions");
        Ok(sessions)
    }

    /// Check if a session exists.
    pub async fn session_exists(&self, name: &str) -> bool {
        self.find(name).await.is_ok()
    }

    // ==================== Lifecycle ====================

    /// Create a new detached session running `shell` and wait until it is
    /// visible to discovery.
    ///
    /// The session lock is held from the existence check through the end of
    /// polling. If `cancel` fires after screen accepted the command, the
    /// session may still come up on its own; nothing is rolled back.
    ///
    /// # Errors
    ///
    /// - `ScreenError::SessionExists` if the name is taken
    /// - `ScreenError::CommandFailed` with screen's output if creation failed
    /// - `ScreenError::Cancelled` if `cancel` fires before the session appears
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        name: &str,
        shell: &str,
    ) -> Result<Session> {
        validate_name(name)?;
        debug!(name = %name, shell = %shell, "creating screen session");

        let lock = self.registry.acquire_lock(name);
        let _guard = acquire(&lock, Some(cancel)).await?;

        match self.find(name).await {
            Ok(_) => return Err(ScreenError::SessionExists(name.to_string())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.run_screen_checked(&[
            "-dmS".to_string(),
            name.to_string(),
            shell.to_string(),
        ])
        .await?;

        let session = self.wait_for_session(cancel, name).await?;
        info!(
            name = %session.name,
            pid = ?session.pid,
            user = %self.config.user,
            "screen session created"
        );
        Ok(session)
    }

    /// Poll discovery until `name` shows up or `cancel` fires.
    async fn wait_for_session(&self, cancel: &CancellationToken, name: &str) -> Result<Session> {
        let interval = self.config.create_poll_interval;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(name = %name, "session wait cancelled");
                    return Err(ScreenError::Cancelled);
                }
                _ = tokio::time::sleep(interval) => {}
            }

            match self.find(name).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_not_found() => {
                    trace!(name = %name, "session not up yet");
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ==================== Locking ====================

    /// Lock `session` and confirm it is still running.
    ///
    /// Returns the guard together with a freshly discovered handle.
    pub(crate) async fn lock_live(
        &self,
        session: &Session,
        cancel: Option<&CancellationToken>,
    ) -> Result<(OwnedMutexGuard<()>, Session)> {
        let guard = acquire(session.lock(), cancel).await?;
        let live = self.find(&session.name).await?;
        Ok((guard, live))
    }
}

/// Wait for `lock`, giving up if `cancel` fires first.
async fn acquire(
    lock: &SessionLock,
    cancel: Option<&CancellationToken>,
) -> Result<OwnedMutexGuard<()>> {
    let lock = Arc::clone(lock);
    match cancel {
        Some(cancel) => tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScreenError::Cancelled),
            guard = lock.lock_owned() => Ok(guard),
        },
        None => Ok(lock.lock_owned().await),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ScreenError::InvalidInput(
            "session name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use super::*;
    use crate::runner::mock::MockRunner;

    /// Orchestrator over a mock runner with a private registry and short
    /// poll intervals.
    pub fn orchestrator(runner: &Arc<MockRunner>) -> ScreenOrchestrator {
        let config = ScreenConfig::new()
            .with_create_poll_interval(Duration::from_millis(5))
            .with_capture_poll_interval(Duration::from_millis(5))
            .with_capture_settle_delay(Duration::ZERO);
        ScreenOrchestrator::with_runner(
            config,
            Arc::clone(runner) as Arc<dyn CommandRunner>,
            Arc::new(SessionRegistry::new()),
        )
    }
}
