//! Reading session output back through temporary files.

use std::path::Path;

use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::orchestrator::ScreenOrchestrator;
use crate::session::Session;
use crate::{Result, ScreenError};

impl ScreenOrchestrator {
    /// Return the session's scrollback buffer as a string.
    ///
    /// The buffer goes through a temporary file that is removed before this
    /// returns, whatever the outcome.
    pub async fn hardcopy_string(&self, session: &Session) -> Result<String> {
        let file = NamedTempFile::new()?;
        let (_guard, live) = self.lock_live(session, None).await?;
        self.hardcopy_locked(&live.name, file.path(), false).await?;
        read_lossy(file.path()).await
    }

    /// Run `commands` in the session and return the output they log.
    ///
    /// Logging is pointed at a temporary file, `commands` are stuffed with a
    /// trailing newline, and the file is polled until it holds something.
    /// This is best effort: a slow command may be caught halfway through, so
    /// callers should allow generous timeouts and filter the result.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Cancelled` if `cancel` fires first.
    pub async fn capture_output(
        &self,
        cancel: &CancellationToken,
        session: &Session,
        commands: &[&str],
    ) -> Result<String> {
        let file = NamedTempFile::new()?;
        let (_guard, live) = self.lock_live(session, Some(cancel)).await?;
        let flush_secs = self.config().capture_flush_interval.as_secs().max(1);

        self.log_locked(&live.name, Some(file.path()), false, flush_secs)
            .await?;
        let result = self
            .capture_locked(cancel, &live.name, file.path(), commands)
            .await;

        if let Err(e) = self.log_locked(&live.name, None, false, flush_secs).await {
            warn!(session = %live.name, error = %e, "failed to disable capture log");
        }
        result
    }

    async fn capture_locked(
        &self,
        cancel: &CancellationToken,
        name: &str,
        log: &Path,
        commands: &[&str],
    ) -> Result<String> {
        // screen needs a moment before logging engages
        sleep_or_cancel(cancel, self.config().capture_settle_delay).await?;

        let mut line = commands.join(" ");
        line.push('\n');
        self.stuff_locked(name, &line).await?;

        let interval = self.config().capture_poll_interval;
        loop {
            sleep_or_cancel(cancel, interval).await?;
            match read_lossy(log).await {
                Ok(output) if !output.is_empty() => {
                    debug!(session = %name, len = output.len(), "captured output");
                    return Ok(output);
                }
                Ok(_) => trace!(session = %name, "no output yet"),
                Err(e) => trace!(session = %name, error = %e, "log not readable yet"),
            }
        }
    }
}

/// Read a file screen wrote, replacing invalid UTF-8.
async fn read_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn sleep_or_cancel(cancel: &CancellationToken, duration: std::time::Duration) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScreenError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
