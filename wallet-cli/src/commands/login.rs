//! Login command - check credentials and show the account overview

use anyhow::Result;
use colored::Colorize;

use super::{finish, get_context, get_password_or_prompt};
use crate::output::{self, format_amount};

pub async fn run(login: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = get_password_or_prompt(password, "Password")?;

    let ctx = get_context().await?;
    let result = ctx.account_service.login(login, &password).await;

    finish("login", json, result, |summary| {
        output::success(&format!("\nWelcome, {}", summary.username));
        println!("  Role:       {}", summary.role);
        println!("  Payment ID: {}", summary.payment_id.bold());
        println!("  Balance:    {}\n", format_amount(summary.balance));
    })
}
