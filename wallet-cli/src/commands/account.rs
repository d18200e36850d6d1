//! Account command - show balance and transaction history

use anyhow::Result;
use colored::Colorize;

use super::{finish, get_context};
use crate::output::{format_amount, history_table};

pub async fn run(username: &str, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let result = ctx.account_service.get_account(username).await;

    finish("account", json, result, |details| {
        println!("{}", details.username.bold());
        println!("  Email:      {}", details.email);
        println!("  Payment ID: {}", details.payment_id);
        println!("  Balance:    {}", format_amount(details.balance).bold());
        println!();

        if details.history.is_empty() {
            println!("{}", "No transactions yet".dimmed());
        } else {
            println!("{}", history_table(&details.history));
        }
    })
}
