//! Descendant process discovery via the process table.

use std::collections::{HashSet, VecDeque};
use std::path::Path;

use tracing::{trace, warn};

use crate::runner::CommandRunner;
use crate::Result;

/// Direct children of `pid`, as reported by `ps --ppid`.
///
/// A failed or empty query means `pid` is a leaf.
pub async fn children(runner: &dyn CommandRunner, pid: u32) -> Result<Vec<u32>> {
    let args = [
        "--no-headers".to_string(),
        "--ppid".to_string(),
        pid.to_string(),
        "-o".to_string(),
        "pid:1".to_string(),
    ];
    let output = runner.run(Path::new("ps"), &args, &[]).await?;
    if !output.success {
        return Ok(Vec::new());
    }

    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse() {
            Ok(child) => Some(child),
            Err(_) => {
                warn!(ppid = pid, line = %line, "unparseable ps line");
                None
            }
        })
        .collect())
}

/// Every descendant of `root`, breadth first. `root` itself is not included.
pub async fn descendants(runner: &dyn CommandRunner, root: u32) -> Result<Vec<u32>> {
    let mut found = Vec::new();
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);

    while let Some(pid) = queue.pop_front() {
        for child in children(runner, pid).await? {
            if seen.insert(child) {
                found.push(child);
                queue.push_back(child);
            }
        }
    }

    trace!(root, count = found.len(), "collected descendants");
    Ok(found)
}
