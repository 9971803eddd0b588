//! Screen session data structures and listing parsers.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::registry::SessionLock;
use crate::{Result, ScreenError};

/// Phrase `screen -ls` prints when no session is running.
pub const NO_SESSIONS: &str = "No Sockets found";

/// One `<pid>.<name>` token at the start of a listing line.
static LISTING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s+(\d+)\.(\S+)(?:\s|$)").expect("Invalid listing line regex")
});

/// A handle to a running screen session.
///
/// Handles are cheap to clone and carry no liveness guarantee: the process
/// behind a session may exit at any time. Every handle for the same name
/// shares one lock.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Session name.
    pub name: String,
    /// Pid of the screen process backing the session, if it parsed.
    pub pid: Option<u32>,
    #[serde(skip)]
    lock: SessionLock,
}

impl Session {
    pub(crate) fn new(entry: SessionEntry, lock: SessionLock) -> Self {
        Self {
            name: entry.name,
            pid: entry.pid,
            lock,
        }
    }

    /// The lock serializing operations on this session name.
    pub fn lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Returns true if both handles serialize on the same lock.
    pub fn shares_lock_with(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

/// A session line parsed out of `screen -ls`, before lock resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    /// Session name.
    pub name: String,
    /// Owning pid, absent if the token did not fit a pid.
    pub pid: Option<u32>,
}

impl SessionEntry {
    fn from_tokens(pid: &str, name: &str) -> Self {
        let pid = match pid.parse() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(pid = %pid, name = %name, error = %e, "unparseable session pid");
                None
            }
        };
        Self {
            name: name.to_string(),
            pid,
        }
    }
}

/// Returns true if the listing says no session is running.
pub fn is_empty_listing(output: &str) -> bool {
    output.contains(NO_SESSIONS)
}

/// Find the session named exactly `name` in `screen -ls` output.
///
/// The name must be bounded by whitespace on the right, so a listing holding
/// only `foobar` does not match `foo`.
pub fn find_entry(output: &str, name: &str) -> Result<Option<SessionEntry>> {
    if is_empty_listing(output) {
        return Ok(None);
    }

    let pattern = format!(r"\s(\d+)\.({})\s", regex::escape(name));
    let re = Regex::new(&pattern)
        .map_err(|e| ScreenError::ParseError(format!("invalid session pattern: {}", e)))?;

    let entry = re
        .captures_iter(output)
        .find(|caps| &caps[2] == name)
        .map(|caps| SessionEntry::from_tokens(&caps[1], &caps[2]));
    Ok(entry)
}

/// Parse every session line of `screen -ls` output.
///
/// Header and footer lines do not start with whitespace and are skipped.
pub fn parse_listing(output: &str) -> Vec<SessionEntry> {
    if is_empty_listing(output) {
        return Vec::new();
    }

    LISTING_LINE
        .captures_iter(output)
        .map(|caps| SessionEntry::from_tokens(&caps[1], &caps[2]))
        .collect()
}
