//! Transaction record domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which leg of a transfer a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Receive,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Receive => "receive",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(Direction::Send),
            "receive" => Ok(Direction::Receive),
            other => Err(format!("unknown transaction direction '{}'", other)),
        }
    }
}

/// One immutable leg of a transfer, stored in exactly one account's history
///
/// `counterparty` is the payment identifier of the other account: the
/// recipient for a `send` record, the sender for a `receive` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub direction: Direction,
    pub amount: Decimal,
    pub counterparty: String,
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn new(
        direction: Direction,
        amount: Decimal,
        counterparty: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            amount,
            counterparty: counterparty.into(),
            timestamp,
        }
    }
}

/// Currency amounts carry at most two fractional digits
const MAX_AMOUNT_SCALE: u32 = 2;

/// True if `amount` fits the currency's precision (trailing zeros ignored)
pub fn is_currency_amount(amount: Decimal) -> bool {
    amount.normalize().scale() <= MAX_AMOUNT_SCALE
}
