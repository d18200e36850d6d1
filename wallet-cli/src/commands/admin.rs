//! Admin commands - list and delete accounts

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use uuid::Uuid;

use super::{finish, get_context, get_password_or_prompt};
use crate::output::{self, create_table, format_amount};

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List all accounts
    List {
        /// Admin username or email
        #[arg(long, default_value = "admin")]
        admin: String,
        /// Admin password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an account and its history
    Delete {
        /// Account ID
        id: String,
        /// Admin username or email
        #[arg(long, default_value = "admin")]
        admin: String,
        /// Admin password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: AdminCommands) -> Result<()> {
    match command {
        AdminCommands::List { admin, password, json } => list(&admin, password, json).await,
        AdminCommands::Delete { id, admin, password, force, json } => {
            delete(&id, &admin, password, force, json).await
        }
    }
}

async fn list(admin: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = get_password_or_prompt(password, "Admin password")?;
    let ctx = get_context().await?;

    let result = match ctx.admin_service.authenticate(admin, &password).await {
        Ok(_) => ctx.admin_service.list_accounts().await,
        Err(e) => Err(e),
    };

    finish("admin list", json, result, |accounts| {
        if accounts.is_empty() {
            println!("{}", "No accounts".dimmed());
            return;
        }

        let mut table = create_table();
        table.set_header(vec!["ID", "Username", "Email", "Role", "Payment ID", "Balance"]);
        for account in accounts {
            table.add_row(vec![
                account.id.to_string(),
                account.username.clone(),
                account.email.clone(),
                account.role.to_string(),
                account.payment_id.clone(),
                format_amount(account.balance),
            ]);
        }
        println!("{}", table);
        println!("{}", format!("{} account(s)", accounts.len()).dimmed());
    })
}

async fn delete(id: &str, admin: &str, password: Option<String>, force: bool, json: bool) -> Result<()> {
    let id = Uuid::parse_str(id.trim()).with_context(|| format!("'{}' is not an account ID", id))?;
    let password = get_password_or_prompt(password, "Admin password")?;
    let ctx = get_context().await?;

    if let Err(e) = ctx.admin_service.authenticate(admin, &password).await {
        return finish("admin delete", json, Err::<(), _>(e), |_| {});
    }

    // Confirm deletion unless --force
    if !force && !json {
        println!("\n{}", format!("This will permanently delete account {}.", id).yellow());
        println!("{}\n", "Its balance and transaction history are removed too.".dimmed());

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let result = ctx.admin_service.delete_account(id).await;
    finish("admin delete", json, result, |deleted| {
        output::success(&format!("\nDeleted account '{}'\n", deleted.username));
    })
}
