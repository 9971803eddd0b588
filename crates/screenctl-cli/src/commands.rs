//! Command handlers for CLI subcommands.

use std::path::Path;
use std::time::Duration;

use screenctl_core::{CancellationToken, ScreenOrchestrator, Session};
use tracing::{debug, info};

use crate::cli::{Commands, OutputFormat};

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Execute a CLI command.
pub async fn execute(command: Commands, screen: &ScreenOrchestrator) -> Result<()> {
    match command {
        Commands::List { format } => cmd_list(screen, format).await,
        Commands::New {
            name,
            shell,
            timeout,
        } => cmd_new(screen, &name, &shell, timeout).await,
        Commands::Stuff { name, text, enter } => {
            let session = screen.find(&name).await?;
            let mut text = text.join(" ");
            if enter {
                text.push('\n');
            }
            screen.stuff(&session, &[text.as_str()]).await?;
            Ok(())
        }
        Commands::Chdir { name, path } => {
            let session = screen.find(&name).await?;
            screen.chdir(&session, &path).await?;
            Ok(())
        }
        Commands::Exec {
            name,
            fdpat,
            command,
            args,
        } => {
            let session = screen.find(&name).await?;
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            screen.exec(&session, &fdpat, &command, &args).await?;
            Ok(())
        }
        Commands::Hardcopy { name, path, append } => {
            cmd_hardcopy(screen, &name, path.as_deref(), append).await
        }
        Commands::Log {
            name,
            path,
            append,
            flush,
        } => {
            let session = screen.find(&name).await?;
            screen.log(&session, path.as_deref(), append, flush).await?;
            Ok(())
        }
        Commands::Clear { name } => {
            let session = screen.find(&name).await?;
            screen.clear(&session).await?;
            Ok(())
        }
        Commands::Quit { name } => {
            let session = screen.find(&name).await?;
            screen.quit(&session).await?;
            println!("Quit session '{}'", name);
            Ok(())
        }
        Commands::Kill { name } => {
            let session = screen.find(&name).await?;
            screen.kill(&session).await?;
            Ok(())
        }
        Commands::Signal { name, signal } => {
            let session = screen.find(&name).await?;
            screen.signal(&session, signal).await?;
            Ok(())
        }
        Commands::Capture {
            name,
            command,
            timeout,
        } => cmd_capture(screen, &name, &command, timeout).await,
    }
}

async fn cmd_list(screen: &ScreenOrchestrator, format: OutputFormat) -> Result<()> {
    let sessions = screen.find_all().await?;

    match format {
        OutputFormat::Table => {
            if sessions.is_empty() {
                println!("No sessions found.");
                return Ok(());
            }

            println!("{:<10}  NAME", "PID");
            println!("{}", "-".repeat(40));
            for session in &sessions {
                println!("{:<10}  {}", format_pid(session), session.name);
            }
            println!("\n{} session(s)", sessions.len());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&sessions)?;
            println!("{}", json);
        }
        OutputFormat::Brief => {
            for session in &sessions {
                println!("{}\t{}", format_pid(session), session.name);
            }
        }
    }

    Ok(())
}

async fn cmd_new(screen: &ScreenOrchestrator, name: &str, shell: &str, timeout: u64) -> Result<()> {
    let cancel = cancel_on_interrupt(Duration::from_secs(timeout));
    let session = screen.create(&cancel, name, shell).await?;
    info!(name = %session.name, "session started");
    println!("Started session '{}' ({})", session.name, format_pid(&session));
    Ok(())
}

async fn cmd_hardcopy(
    screen: &ScreenOrchestrator,
    name: &str,
    path: Option<&Path>,
    append: bool,
) -> Result<()> {
    let session = screen.find(name).await?;
    match path {
        Some(path) => screen.hardcopy(&session, path, append).await?,
        None => print!("{}", screen.hardcopy_string(&session).await?),
    }
    Ok(())
}

async fn cmd_capture(
    screen: &ScreenOrchestrator,
    name: &str,
    command: &[String],
    timeout: u64,
) -> Result<()> {
    let session = screen.find(name).await?;
    let cancel = cancel_on_interrupt(Duration::from_secs(timeout));
    let command: Vec<&str> = command.iter().map(String::as_str).collect();
    let output = screen.capture_output(&cancel, &session, &command).await?;
    print!("{}", output);
    Ok(())
}

/// A token cancelled by Ctrl-C or once `timeout` elapses.
fn cancel_on_interrupt(timeout: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => debug!("interrupted"),
            _ = tokio::time::sleep(timeout) => debug!(timeout_secs = timeout.as_secs(), "timed out"),
        }
        trigger.cancel();
    });
    cancel
}

fn format_pid(session: &Session) -> String {
    session
        .pid
        .map(|pid| pid.to_string())
        .unwrap_or_else(|| "?".to_string())
}
