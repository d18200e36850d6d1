//! Register command - create a new wallet account

use anyhow::Result;
use colored::Colorize;

use super::{finish, get_context, get_password_or_prompt};
use crate::output::{self, format_amount};

pub async fn run(username: &str, email: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => {
            let first = get_password_or_prompt(None, "Choose a password")?;
            let second = get_password_or_prompt(None, "Confirm password")?;
            if first != second {
                anyhow::bail!("Passwords do not match");
            }
            first
        }
    };

    let ctx = get_context().await?;
    let result = ctx.account_service.register(username, email, &password).await;

    finish("register", json, result, |registration| {
        output::success(&format!("\nAccount '{}' created", registration.username));
        println!("  Payment ID: {}", registration.payment_id.bold());
        println!("  Balance:    {}\n", format_amount(registration.balance));
    })
}
