//! Transfer command - send money to another account

use std::str::FromStr;

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use wallet_core::ports::AccountRepository;
use wallet_core::{Error, TransferReceipt, WalletContext};

use super::{finish, get_context, get_password_or_prompt};
use crate::output::{self, format_amount, history_table};

fn parse_amount(amount: &str) -> wallet_core::domain::result::Result<Decimal> {
    Decimal::from_str(amount.trim())
        .map_err(|_| Error::invalid(format!("'{}' is not a valid amount", amount)))
}

/// Check the sender's password, then move the funds
///
/// An unknown sender skips the password check so the transfer itself
/// reports it.
async fn authorized_transfer(
    ctx: &WalletContext,
    from: &str,
    to: &str,
    amount: &str,
    password: &str,
) -> wallet_core::domain::result::Result<TransferReceipt> {
    let amount = parse_amount(amount)?;

    if let Some(sender) = ctx.repository.find_by_identifier(from.trim()).await? {
        ctx.account_service.login(&sender.username, password).await?;
    }

    ctx.transfer_service.transfer(from, to, amount).await
}

pub async fn run(from: &str, to: &str, amount: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = get_password_or_prompt(password, &format!("Password for {}", from))?;

    let ctx = get_context().await?;
    let result = authorized_transfer(&ctx, from, to, amount, &password).await;

    finish("transfer", json, result, |receipt| {
        output::success(&format!(
            "\nSent {} to {}",
            format_amount(receipt.amount),
            receipt.recipient_payment_id
        ));
        println!("  New balance: {}", format_amount(receipt.sender_balance).bold());
        println!("  Reference:   {}\n", receipt.send_record_id.to_string().dimmed());

        let recent = receipt.sender_history.len().saturating_sub(5);
        println!("{}", history_table(&receipt.sender_history[recent..]));
    })
}
