//! CLI command implementations

pub mod account;
pub mod admin;
pub mod login;
pub mod logs;
pub mod register;
pub mod transfer;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Password;
use log::debug;
use serde::Serialize;

use wallet_core::services::{EntryPoint, LogEvent, LoggingService};
use wallet_core::{OperationResult, WalletContext};

/// Marker error for failures already shown to the user (e.g. as JSON)
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("command failed")
    }
}

impl std::error::Error for Reported {}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let wallet_dir = get_wallet_dir().ok()?;
    std::fs::create_dir_all(&wallet_dir).ok()?;
    LoggingService::new(&wallet_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the wallet directory from environment or default
pub fn get_wallet_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WALLET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".wallet"))
        .context("Could not find home directory (set WALLET_DIR)")
}

/// Open the wallet, seeding the admin account if WALLET_ADMIN_PASSWORD is set
pub async fn get_context() -> Result<WalletContext> {
    let wallet_dir = get_wallet_dir()?;
    let admin_password = std::env::var("WALLET_ADMIN_PASSWORD").ok();
    debug!("Opening wallet at {}", wallet_dir.display());

    WalletContext::new(&wallet_dir, admin_password.as_deref())
        .await
        .context("Failed to open wallet")
}

/// Get a password from the flag or an interactive hidden prompt
pub fn get_password_or_prompt(password_flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    if atty::isnt(atty::Stream::Stdin) {
        anyhow::bail!("No terminal to prompt on; pass --password");
    }

    let p = Password::new().with_prompt(prompt).interact()?;
    Ok(p)
}

/// Report the outcome of a wallet operation and record it in the event log
///
/// With `json`, the result is printed as an `OperationResult`; otherwise
/// `render` prints a success and failures are returned to `main`.
pub fn finish<T, F>(
    command: &str,
    json: bool,
    result: wallet_core::domain::result::Result<T>,
    render: F,
) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    let logger = get_logger();

    match result {
        Ok(data) => {
            log_event(&logger, LogEvent::new("command_executed").with_command(command));
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
            } else {
                render(&data);
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("command_failed").with_command(command).with_error(&e),
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&OperationResult::<T>::fail(&e))?);
                return Err(Reported.into());
            }
            Err(e.into())
        }
    }
}
