//! Screenctl CLI library.
//!
//! This crate provides the `screenctl` command-line interface over
//! `screenctl-core`.

pub mod cli;
pub mod commands;

use screenctl_core::ScreenError;

/// Process exit code for an error returned by a command.
///
/// Cancellation (Ctrl-C or timeout) exits with 130, everything else with 1.
pub fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<ScreenError>() {
        Some(ScreenError::Cancelled) => 130,
        _ => 1,
    }
}
