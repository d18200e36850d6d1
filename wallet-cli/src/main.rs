//! Wallet CLI - accounts and transfers in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{account, admin, login, logs, register, transfer, Reported};

/// Wallet - register, log in and send money from the terminal
#[derive(Parser)]
#[command(name = "wallet", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        username: String,
        email: String,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check credentials and show the account overview
    Login {
        /// Username or email
        login: String,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show balance and transaction history
    Account {
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send money to another account
    Transfer {
        /// Sender username or payment ID
        #[arg(long)]
        from: String,
        /// Recipient username or payment ID
        #[arg(long)]
        to: String,
        /// Amount, at most two decimal places
        #[arg(allow_negative_numbers = true)]
        amount: String,
        /// Sender password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Administer accounts
    Admin {
        #[command(subcommand)]
        command: admin::AdminCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is::<Reported>() {
                output::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Register { username, email, password, json } => {
            register::run(&username, &email, password, json).await
        }
        Commands::Login { login, password, json } => login::run(&login, password, json).await,
        Commands::Account { username, json } => account::run(&username, json).await,
        Commands::Transfer { from, to, amount, password, json } => {
            transfer::run(&from, &to, &amount, password, json).await
        }
        Commands::Admin { command } => admin::run(command).await,
        Commands::Logs { command } => logs::run(command),
    }
}
