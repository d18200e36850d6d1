//! Logs command - inspect the wallet's event log
//!
//! Every CLI command records `command_executed` or `command_failed` with
//! its error kind. These views answer "what failed, and why" without ever
//! showing balances or amounts.

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use super::get_wallet_dir;
use crate::output::create_table;
use wallet_core::services::logging::now_ms;
use wallet_core::services::{EntryPoint, LogEntry, LogQuery, LoggingService};

/// Upper bound for `clear --older-than-days`
const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Only events from this command (e.g. transfer, login)
        #[arg(long)]
        command: Option<String>,
        /// Only failed commands
        #[arg(long)]
        failed: bool,
        /// Number of events to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tally failures by error kind
    Failures {
        /// Only failures of this command
        #[arg(long)]
        command: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-command outcome counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old events
    Clear {
        /// Delete events older than N days
        #[arg(long, default_value = "30")]
        older_than_days: i64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let wallet_dir = get_wallet_dir()?;
    std::fs::create_dir_all(&wallet_dir)?;
    let service = LoggingService::new(&wallet_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            command,
            failed,
            limit,
            json,
        } => {
            let mut query = LogQuery::recent(limit);
            if let Some(command) = command {
                query = query.for_command(command);
            }
            if failed {
                query = query.failed();
            }
            list(&service, &query, json)
        }
        LogsCommands::Failures { command, json } => failures(&service, command.as_deref(), json),
        LogsCommands::Stats { json } => stats(&service, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&service, older_than_days, force, json),
    }
}

fn list(service: &LoggingService, query: &LogQuery, json: bool) -> Result<()> {
    let entries = service.search(query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No matching events.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "Command", "Outcome", "Detail"]);
    for entry in &entries {
        table.add_row(vec![
            when(entry.timestamp),
            entry.command.clone().unwrap_or_else(|| "-".to_string()),
            outcome(entry),
            entry.error_message.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn failures(service: &LoggingService, command: Option<&str>, json: bool) -> Result<()> {
    let counts = service.error_kind_counts(command)?;
    if json {
        let kinds: Vec<_> = counts
            .iter()
            .map(|(kind, count)| json!({ "error_kind": kind, "count": count }))
            .collect();
        let report = json!({ "command": command, "failures": kinds });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let scope = command.map(|c| format!(" for '{}'", c)).unwrap_or_default();
    if counts.is_empty() {
        println!("{}", format!("No failures recorded{}.", scope).green());
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Error kind", "Count"]);
    for (kind, count) in &counts {
        table.add_row(vec![kind.red().to_string(), count.to_string()]);
    }
    println!("{}", format!("Failures{}", scope).bold());
    println!("{}", table);
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let per_command = service.command_stats()?;
    let total = service.count()?;
    let db_path = service.db_path();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "total_events": total,
                "commands": per_command,
                "database_path": db_path.to_string_lossy(),
            }))?
        );
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Command", "Succeeded", "Failed"]);
    for row in &per_command {
        let failed = if row.failed > 0 {
            row.failed.to_string().red().to_string()
        } else {
            "0".to_string()
        };
        table.add_row(vec![row.command.clone(), row.succeeded.to_string(), failed]);
    }
    println!("{}", table);
    println!("{}", format!("{} events in {}", total, db_path.display()).dimmed());
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: i64, force: bool, json: bool) -> Result<()> {
    let days = older_than_days.clamp(0, MAX_RETENTION_DAYS);
    let cutoff_ms = now_ms() - Duration::days(days).num_milliseconds();

    let confirmed = force
        || json
        || Confirm::new()
            .with_prompt(format!("Delete events older than {} days?", days))
            .default(false)
            .interact()?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    let deleted = service.delete_before(cutoff_ms)?;
    if json {
        println!("{}", json!({ "deleted": deleted, "older_than_days": days }));
    } else {
        println!("Deleted {} event(s)", deleted);
    }
    Ok(())
}

fn when(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|at| crate::output::format_timestamp(&at))
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn outcome(entry: &LogEntry) -> String {
    match &entry.error_kind {
        Some(kind) => kind.red().to_string(),
        None if entry.event == "command_executed" => "ok".green().to_string(),
        None => entry.event.dimmed().to_string(),
    }
}
