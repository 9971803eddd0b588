//! Control commands dispatched to a running session.
//!
//! Each public operation locks the session, re-discovers it to confirm it is
//! still running, then issues a fixed sequence of `screen -X` commands. The
//! first failing command aborts the sequence; earlier commands are not undone.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::orchestrator::ScreenOrchestrator;
use crate::process_tree;
use crate::session::Session;
use crate::{Result, ScreenError};

/// Valid `exec` fd patterns: up to three of `.`, `!`, `:` and an optional `|`.
static FDPAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[.!:]{0,3}\|?$").expect("Invalid fdpat regex"));

/// Validate an `exec` fd pattern. Empty means screen's default.
pub fn validate_fdpat(fdpat: &str) -> Result<()> {
    if fdpat.is_empty() || FDPAT.is_match(fdpat) {
        Ok(())
    } else {
        Err(ScreenError::InvalidInput(format!(
            "invalid fd pattern '{}': expected up to three of '.', '!', ':' optionally followed by '|'",
            fdpat
        )))
    }
}

impl ScreenOrchestrator {
    // ==================== Input ====================

    /// Paste `commands`, joined by single spaces, into the session's input.
    ///
    /// No newline is added; end the last command with `\n` to submit it.
    pub async fn stuff(&self, session: &Session, commands: &[&str]) -> Result<()> {
        let (_guard, live) = self.lock_live(session, None).await?;
        self.stuff_locked(&live.name, &commands.join(" ")).await
    }

    pub(crate) async fn stuff_locked(&self, name: &str, text: &str) -> Result<()> {
        debug!(session = %name, len = text.len(), "stuffing input");
        self.control(name, &["stuff", text]).await
    }

    /// Change the working directory for new windows in the session.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Io` if `path` does not exist locally.
    pub async fn chdir(&self, session: &Session, path: &Path) -> Result<()> {
        let (_guard, live) = self.lock_live(session, None).await?;
        tokio::fs::metadata(path).await?;
        debug!(session = %live.name, path = %path.display(), "changing directory");
        self.control(&live.name, &["chdir", &path.to_string_lossy()])
            .await
    }

    /// Start `command` in a new window of the session.
    ///
    /// `fdpat` selects how the new process's descriptors are wired to the
    /// window; pass an empty string for screen's default.
    pub async fn exec(
        &self,
        session: &Session,
        fdpat: &str,
        command: &str,
        args: &[&str],
    ) -> Result<()> {
        validate_fdpat(fdpat)?;
        let (_guard, live) = self.lock_live(session, None).await?;

        let mut cmd = vec!["exec"];
        if !fdpat.is_empty() {
            cmd.push(fdpat);
        }
        cmd.push(command);
        cmd.extend_from_slice(args);

        debug!(session = %live.name, fdpat = %fdpat, command = %command, "exec");
        self.control(&live.name, &cmd).await
    }

    // ==================== Buffers ====================

    /// Write the session's scrollback buffer to `path`.
    pub async fn hardcopy(&self, session: &Session, path: &Path, append: bool) -> Result<()> {
        let (_guard, live) = self.lock_live(session, None).await?;
        self.hardcopy_locked(&live.name, path, append).await
    }

    pub(crate) async fn hardcopy_locked(&self, name: &str, path: &Path, append: bool) -> Result<()> {
        debug!(session = %name, path = %path.display(), append, "hardcopy");
        self.control(name, &["hardcopy_append", on_off(append)])
            .await?;
        self.control(name, &["hardcopy", &path.to_string_lossy()])
            .await
    }

    /// Log session output to `path`, or stop logging when `path` is `None`.
    ///
    /// Without `append` an existing log file is truncated first. Appending to
    /// a file that does not exist yet is fine; any other stat failure is
    /// returned.
    pub async fn log(
        &self,
        session: &Session,
        path: Option<&Path>,
        append: bool,
        flush_secs: u64,
    ) -> Result<()> {
        let (_guard, live) = self.lock_live(session, None).await?;
        self.log_locked(&live.name, path, append, flush_secs).await
    }

    pub(crate) async fn log_locked(
        &self,
        name: &str,
        path: Option<&Path>,
        append: bool,
        flush_secs: u64,
    ) -> Result<()> {
        if let Some(path) = path {
            prepare_log_file(path, append).await?;
            debug!(session = %name, path = %path.display(), append, flush_secs, "enabling log");
            self.control(name, &["logfile", &path.to_string_lossy()])
                .await?;
        } else {
            debug!(session = %name, "disabling log");
        }

        self.control(name, &["logfile", "flush", &flush_secs.to_string()])
            .await?;
        self.control(name, &["log", on_off(path.is_some())]).await
    }

    /// Clear the session's scrollback buffer.
    pub async fn clear(&self, session: &Session) -> Result<()> {
        self.simple(session, "clear").await
    }

    // ==================== Termination ====================

    /// Quit the session, closing all its windows.
    pub async fn quit(&self, session: &Session) -> Result<()> {
        self.simple(session, "quit").await
    }

    /// Kill the session's current window.
    pub async fn kill(&self, session: &Session) -> Result<()> {
        self.simple(session, "kill").await
    }

    /// Send `signo` to every descendant process of the session.
    ///
    /// A delivery that fails without output (the process is already gone) is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError::Signal` with `kill`'s output if a delivery fails
    /// with a diagnostic, or if the session's pid is unknown.
    pub async fn signal(&self, session: &Session, signo: i32) -> Result<()> {
        let (_guard, live) = self.lock_live(session, None).await?;
        let root = live.pid.ok_or_else(|| {
            ScreenError::Signal(format!("pid of session '{}' is unknown", live.name))
        })?;

        let pids = process_tree::descendants(self.runner(), root).await?;
        debug!(session = %live.name, root, signo, targets = pids.len(), "signalling process tree");

        let signal = format!("-{}", signo);
        for pid in pids {
            let args = [signal.clone(), pid.to_string()];
            let output = self.runner().run(Path::new("kill"), &args, &[]).await?;
            let diagnostic = output.combined();
            if !output.success && !diagnostic.trim().is_empty() {
                return Err(ScreenError::Signal(diagnostic));
            }
        }
        Ok(())
    }

    async fn simple(&self, session: &Session, command: &str) -> Result<()> {
        let (_guard, live) = self.lock_live(session, None).await?;
        debug!(session = %live.name, command = %command, "dispatching");
        self.control(&live.name, &[command]).await
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// screen appends to log files; truncate unless appending was asked for.
async fn prepare_log_file(path: &Path, append: bool) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) if !append => {
            tokio::fs::OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(path)
                .await?;
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::orchestrator::test_support::orchestrator;
    use crate::runner::mock::MockRunner;
    use crate::runner::CommandOutput;

    async fn setup(runner: MockRunner) -> (Arc<MockRunner>, ScreenOrchestrator, Session) {
        let runner = Arc::new(runner.with_session("100", "work"));
        let screen = orchestrator(&runner);
        let session = screen.find("work").await.unwrap();
        (runner, screen, session)
    }

    #[test]
    fn test_validate_fdpat() {
        for ok in ["", "|", ".", "!..|", ":!.", "...", "::|"] {
            assert!(validate_fdpat(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["bad", "....", "|.", "||", ". !", "/.!|"] {
            assert!(
                matches!(validate_fdpat(bad), Err(ScreenError::InvalidInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_stuff_joins_without_newline() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        screen.stuff(&session, &["echo", "hi"]).await.unwrap();
        assert_eq!(runner.controls(), vec!["stuff echo hi"]);

        let last = runner.calls().pop().unwrap();
        assert_eq!(last.args, vec!["-S", "work", "-X", "stuff", "echo hi"]);
    }

    #[tokio::test]
    async fn test_dispatch_rechecks_liveness() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        screen.quit(&session).await.unwrap();

        let result = screen.stuff(&session, &["echo"]).await;
        assert!(matches!(result, Err(ScreenError::SessionNotFound(n)) if n == "work"));
        assert_eq!(runner.controls(), vec!["quit"]);
    }

    #[tokio::test]
    async fn test_command_failure_carries_output() {
        let (_, screen, session) = setup(
            MockRunner::new().fail_control("clear", CommandOutput::failed("No screen session found.\n")),
        )
        .await;
        let result = screen.clear(&session).await;
        assert!(
            matches!(result, Err(ScreenError::CommandFailed(out)) if out == "No screen session found.\n")
        );
    }

    #[tokio::test]
    async fn test_chdir_missing_path() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let result = screen.chdir(&session, &missing).await;
        assert!(matches!(result, Err(ScreenError::Io(e)) if e.kind() == ErrorKind::NotFound));
        assert!(runner.controls().is_empty());

        screen.chdir(&session, dir.path()).await.unwrap();
        assert_eq!(
            runner.controls(),
            vec![format!("chdir {}", dir.path().display())]
        );
    }

    #[tokio::test]
    async fn test_exec_rejects_bad_fdpat_without_invoking() {
        let runner = Arc::new(MockRunner::new().with_session("100", "work"));
        let screen = orchestrator(&runner);
        let session = screen.find("work").await.unwrap();
        let before = runner.calls().len();

        let result = screen.exec(&session, "bad", "ls", &[]).await;
        assert!(matches!(result, Err(ScreenError::InvalidInput(_))));
        assert_eq!(runner.calls().len(), before);
    }

    #[tokio::test]
    async fn test_exec_arguments() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        screen.exec(&session, "!..|", "grep", &["-i", "err"]).await.unwrap();
        screen.exec(&session, "", "top", &[]).await.unwrap();
        assert_eq!(runner.controls(), vec!["exec !..| grep -i err", "exec top"]);
    }

    #[tokio::test]
    async fn test_hardcopy_sequence() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        screen
            .hardcopy(&session, Path::new("/tmp/copy.txt"), true)
            .await
            .unwrap();
        assert_eq!(
            runner.controls(),
            vec!["hardcopy_append on", "hardcopy /tmp/copy.txt"]
        );
        // one liveness check for both steps
        assert_eq!(runner.count("screen", "-ls"), 2);
    }

    #[tokio::test]
    async fn test_hardcopy_stops_after_failed_step() {
        let (runner, screen, session) = setup(
            MockRunner::new().fail_control("hardcopy_append", CommandOutput::failed("bad\n")),
        )
        .await;
        let result = screen.hardcopy(&session, Path::new("/tmp/x"), false).await;
        assert!(matches!(result, Err(ScreenError::CommandFailed(_))));
        assert_eq!(runner.controls(), vec!["hardcopy_append off"]);
    }

    #[tokio::test]
    async fn test_log_append_to_missing_file() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");

        screen.log(&session, Some(&path), true, 10).await.unwrap();
        assert_eq!(
            runner.controls(),
            vec![
                format!("logfile {}", path.display()),
                "logfile flush 10".to_string(),
                "log on".to_string(),
            ]
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_log_truncates_without_append() {
        let (_, screen, session) = setup(MockRunner::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        std::fs::write(&path, b"old output").unwrap();

        screen.log(&session, Some(&path), true, 10).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"old output");

        screen.log(&session, Some(&path), false, 10).await.unwrap();
        assert!(std::fs::read(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_propagates_other_stat_errors() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"").unwrap();
        let path = file.join("child.log");

        let result = screen.log(&session, Some(&path), true, 10).await;
        assert!(matches!(result, Err(ScreenError::Io(_))));
        assert!(runner.controls().is_empty());
    }

    #[tokio::test]
    async fn test_log_disable() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        screen.log(&session, None, false, 5).await.unwrap();
        assert_eq!(runner.controls(), vec!["logfile flush 5", "log off"]);
    }

    #[tokio::test]
    async fn test_simple_commands() {
        let (runner, screen, session) = setup(MockRunner::new()).await;
        screen.clear(&session).await.unwrap();
        screen.kill(&session).await.unwrap();
        assert_eq!(runner.controls(), vec!["clear", "kill"]);
        assert!(screen.quit(&session).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_signal_walks_tree() {
        let (runner, screen, session) = setup(
            MockRunner::new()
                .with_children(100, &[200])
                .with_children(200, &[300, 301]),
        )
        .await;

        screen.signal(&session, 15).await.unwrap();
        let kills: Vec<Vec<String>> = runner
            .calls()
            .into_iter()
            .filter(|c| c.program == "kill")
            .map(|c| c.args)
            .collect();
        assert_eq!(
            kills,
            vec![
                vec!["-15".to_string(), "200".to_string()],
                vec!["-15".to_string(), "300".to_string()],
                vec!["-15".to_string(), "301".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_signal_tolerates_silent_failure() {
        let (_, screen, session) = setup(
            MockRunner::new()
                .with_children(100, &[200, 201])
                .kill_result(200, CommandOutput::failed("")),
        )
        .await;
        screen.signal(&session, 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_signal_reports_diagnostic() {
        let (_, screen, session) = setup(
            MockRunner::new()
                .with_children(100, &[200])
                .kill_result(200, CommandOutput::failed("kill: (200) - Operation not permitted\n")),
        )
        .await;
        let result = screen.signal(&session, 9).await;
        assert!(matches!(result, Err(ScreenError::Signal(out)) if out.contains("not permitted")));
    }

    #[tokio::test]
    async fn test_signal_without_pid() {
        let runner = Arc::new(MockRunner::new().with_session("99999999999", "nopid"));
        let screen = orchestrator(&runner);
        let session = screen.find("nopid").await.unwrap();
        assert!(matches!(
            screen.signal(&session, 15).await,
            Err(ScreenError::Signal(_))
        ));
    }

    #[tokio::test]
    async fn test_same_session_operations_never_overlap() {
        let (runner, screen, session) =
            setup(MockRunner::new().with_control_delay(Duration::from_millis(10))).await;
        let screen = Arc::new(screen);

        let hardcopy = {
            let screen = Arc::clone(&screen);
            let session = session.clone();
            tokio::spawn(async move {
                screen
                    .hardcopy(&session, Path::new("/tmp/a"), false)
                    .await
            })
        };
        let log = {
            let screen = Arc::clone(&screen);
            let session = session.clone();
            tokio::spawn(async move { screen.log(&session, None, false, 1).await })
        };
        hardcopy.await.unwrap().unwrap();
        log.await.unwrap().unwrap();

        let mut controls: Vec<_> = runner
            .calls()
            .into_iter()
            .filter(|c| c.control().is_some())
            .collect();
        controls.sort_by_key(|c| c.started);
        for pair in controls.windows(2) {
            assert!(pair[0].finished <= pair[1].started, "control commands overlapped");
        }

        let order = runner.controls();
        let hardcopy_first = vec!["hardcopy_append off", "hardcopy /tmp/a", "logfile flush 1", "log off"];
        let log_first = vec!["logfile flush 1", "log off", "hardcopy_append off", "hardcopy /tmp/a"];
        assert!(order == hardcopy_first || order == log_first, "interleaved: {order:?}");
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_share_lock() {
        let runner = Arc::new(
            MockRunner::new()
                .with_session("1", "left")
                .with_session("2", "right"),
        );
        let screen = orchestrator(&runner);
        let left = screen.find("left").await.unwrap();
        let right = screen.find("right").await.unwrap();
        assert!(!left.shares_lock_with(&right));

        let _held = left.lock().lock().await;
        tokio::time::timeout(Duration::from_secs(1), screen.clear(&right))
            .await
            .expect("other session must not block")
            .unwrap();
    }
}
