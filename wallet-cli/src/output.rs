//! Output formatting utilities

use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

use wallet_core::{Direction, TransactionRecord};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format an amount with the currency sign and two decimals, e.g. `₹1,500.00`
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}₹{}.{}", sign, grouped, frac)
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render a transaction history, newest first
pub fn history_table(history: &[TransactionRecord]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Time", "Type", "Amount", "Counterparty"]);

    for record in history.iter().rev() {
        let (kind, amount) = match record.direction {
            Direction::Send => ("Sent".red().to_string(), format!("-{}", format_amount(record.amount))),
            Direction::Receive => (
                "Received".green().to_string(),
                format!("+{}", format_amount(record.amount)),
            ),
        };
        table.add_row(vec![
            format_timestamp(&record.timestamp),
            kind,
            amount,
            record.counterparty.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn amount(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(amount("0")), "₹0.00");
        assert_eq!(format_amount(amount("999.5")), "₹999.50");
        assert_eq!(format_amount(amount("1500")), "₹1,500.00");
        assert_eq!(format_amount(amount("1234567.89")), "₹1,234,567.89");
        assert_eq!(format_amount(amount("-2000")), "-₹2,000.00");
    }
}
