//! Account domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};
use super::transaction::{is_currency_amount, Direction, TransactionRecord};

/// Access level of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A wallet account
///
/// Balance and history change only through [`Account::debit`] and
/// [`Account::credit`], which keep the two in step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Unique login name, also usable as a transfer identifier
    pub username: String,
    pub email: String,
    /// Unique transfer handle, `<username>@<payment domain>`
    pub payment_id: String,
    /// Argon2 PHC string; never serialized
    #[serde(skip)]
    pub credential: String,
    pub role: Role,
    pub balance: Decimal,
    /// Oldest first
    pub history: Vec<TransactionRecord>,
    /// Version of the stored row this value was read from
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new user account with an empty history
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        payment_id: impl Into<String>,
        credential: impl Into<String>,
        balance: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            payment_id: payment_id.into(),
            credential: credential.into(),
            role: Role::User,
            balance,
            history: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Build the payment identifier for a username
    pub fn payment_id_for(username: &str, payment_domain: &str) -> String {
        format!("{}@{}", username, payment_domain)
    }

    /// True if `identifier` is this account's username or payment identifier
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.username == identifier || self.payment_id == identifier
    }

    /// True if `login` is this account's username or email
    pub fn matches_login(&self, login: &str) -> bool {
        self.username == login || self.email == login
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Remove `amount` and append a `send` record addressed to `counterparty`
    ///
    /// Leaves the account untouched when the balance cannot cover `amount`.
    pub fn debit(
        &mut self,
        amount: Decimal,
        counterparty: &str,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord> {
        if self.balance < amount {
            return Err(Error::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        let record = TransactionRecord::new(Direction::Send, amount, counterparty, at);
        self.balance -= amount;
        self.history.push(record.clone());
        Ok(record)
    }

    /// Add `amount` and append a `receive` record from `counterparty`
    pub fn credit(
        &mut self,
        amount: Decimal,
        counterparty: &str,
        at: DateTime<Utc>,
    ) -> TransactionRecord {
        let record = TransactionRecord::new(Direction::Receive, amount, counterparty, at);
        self.balance += amount;
        self.history.push(record.clone());
        record
    }

    pub fn last_record(&self) -> Option<&TransactionRecord> {
        self.history.last()
    }

    /// Check the fields a repository requires before storing a new account
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::invalid("username cannot be empty"));
        }
        if !self.email.contains('@') {
            return Err(Error::invalid("email must contain '@'"));
        }
        if self.payment_id.trim().is_empty() {
            return Err(Error::invalid("payment identifier cannot be empty"));
        }
        if self.balance.is_sign_negative() && !self.balance.is_zero() {
            return Err(Error::invalid("balance cannot be negative"));
        }
        if !is_currency_amount(self.balance) {
            return Err(Error::invalid("balance cannot have more than two decimal places"));
        }
        Ok(())
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            balance: self.balance,
            payment_id: self.payment_id.clone(),
        }
    }

    pub fn details(&self) -> AccountDetails {
        AccountDetails {
            username: self.username.clone(),
            email: self.email.clone(),
            balance: self.balance,
            payment_id: self.payment_id.clone(),
            history: self.history.clone(),
        }
    }
}

/// Account overview returned by login and the admin listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub balance: Decimal,
    pub payment_id: String,
}

/// Full account view including transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub username: String,
    pub email: String,
    pub balance: Decimal,
    pub payment_id: String,
    pub history: Vec<TransactionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(username: &str, balance: Decimal) -> Account {
        Account::new(
            username,
            format!("{}@example.com", username),
            Account::payment_id_for(username, "payment"),
            "$argon2id$placeholder",
            balance,
        )
    }

    #[test]
    fn test_payment_id_format() {
        assert_eq!(Account::payment_id_for("alice", "payment"), "alice@payment");
    }

    #[test]
    fn test_identifier_matching() {
        let alice = account("alice", dec!(2000));
        assert!(alice.matches_identifier("alice"));
        assert!(alice.matches_identifier("alice@payment"));
        assert!(!alice.matches_identifier("Alice"));
        assert!(!alice.matches_identifier("alice@example.com"));

        assert!(alice.matches_login("alice@example.com"));
        assert!(!alice.matches_login("alice@payment"));
    }

    #[test]
    fn test_debit_appends_send_record() {
        let mut alice = account("alice", dec!(2000));
        let now = Utc::now();

        let record = alice.debit(dec!(500), "bob@payment", now).unwrap();
        assert_eq!(record.direction, Direction::Send);
        assert_eq!(record.counterparty, "bob@payment");

        assert_eq!(alice.balance, dec!(1500));
        assert_eq!(alice.history.len(), 1);
    }

    #[test]
    fn test_debit_insufficient_leaves_account_untouched() {
        let mut alice = account("alice", dec!(50));

        let err = alice.debit(dec!(100), "bob@payment", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(alice.balance, dec!(50));
        assert!(alice.history.is_empty());
    }

    #[test]
    fn test_debit_whole_balance() {
        let mut alice = account("alice", dec!(75.25));
        alice.debit(dec!(75.25), "bob@payment", Utc::now()).unwrap();
        assert!(alice.balance.is_zero());
    }

    #[test]
    fn test_credit_appends_receive_record() {
        let mut bob = account("bob", dec!(10));
        let record = bob.credit(dec!(0.01), "alice@payment", Utc::now());
        assert_eq!(record.direction, Direction::Receive);
        assert_eq!(bob.balance, dec!(10.01));
        assert_eq!(bob.last_record().unwrap().counterparty, "alice@payment");
    }

    #[test]
    fn test_account_validation() {
        let mut alice = account("alice", dec!(0));
        assert!(alice.validate().is_ok());

        alice.balance = dec!(-1);
        assert!(alice.validate().is_err());

        alice.balance = dec!(10.005);
        assert!(matches!(alice.validate(), Err(Error::InvalidRequest(_))));

        alice.balance = dec!(1);
        alice.email = "not-an-email".to_string();
        assert!(alice.validate().is_err());
    }

    #[test]
    fn test_credential_is_not_serialized() {
        let alice = account("alice", dec!(1));
        let json = serde_json::to_string(&alice).unwrap();
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
