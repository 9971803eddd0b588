//! GNU screen orchestration for Screenctl.
//!
//! This crate drives named, detached `screen` sessions by shelling out to the
//! `screen` binary and parsing what it prints:
//! - Discover sessions by exact name, or list them all
//! - Create sessions and wait until they are up
//! - Send input, change directory, exec programs, hardcopy and log buffers
//! - Signal every process running inside a session
//! - Capture the output of a command typed into a session
//!
//! All handles for one session name share a process-wide lock, and every
//! mutating operation holds it, so two callers never interleave their
//! commands against the same session.
//!
//! # Example
//!
//! ```no_run
//! use screenctl_core::{CancellationToken, ScreenOrchestrator};
//!
//! # async fn demo() -> screenctl_core::Result<()> {
//! let screen = ScreenOrchestrator::new()?;
//! let cancel = CancellationToken::new();
//!
//! // Create a session and wait for it to come up
//! let session = screen.create(&cancel, "build", "sh").await?;
//!
//! // Type a command
//! screen.stuff(&session, &["make", "all\n"]).await?;
//!
//! // Read back the scrollback buffer
//! let text = screen.hardcopy_string(&session).await?;
//! println!("{}", text);
//!
//! // Clean up
//! screen.quit(&session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Checking screen Availability
//!
//! ```
//! use screenctl_core::ScreenOrchestrator;
//!
//! if ScreenOrchestrator::is_available() {
//!     println!("screen is available");
//! } else {
//!     println!("screen not found");
//! }
//! ```

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod process_tree;
pub mod registry;
pub mod runner;
pub mod session;

pub use config::ScreenConfig;
pub use dispatch::validate_fdpat;
pub use error::{Result, ScreenError};
pub use orchestrator::ScreenOrchestrator;
pub use registry::{SessionLock, SessionRegistry};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use session::{Session, SessionEntry};
pub use tokio_util::sync::CancellationToken;
