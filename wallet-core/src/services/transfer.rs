//! Transfer service - moves funds between two accounts
//!
//! A transfer debits the sender, credits the recipient, appends one history
//! record to each, and persists both accounts in a single repository
//! transaction. Either both legs land or neither does.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::locks::AccountLocks;
use crate::domain::result::{Error, Result};
use crate::domain::{is_currency_amount, TransactionRecord};
use crate::ports::AccountRepository;

/// Default number of read-validate-write attempts on version conflicts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Initial backoff between attempts (doubles each retry: 10, 20, 40, 80ms)
const INITIAL_RETRY_DELAY_MS: u64 = 10;

/// Backoff never grows past this
const MAX_RETRY_DELAY_MS: u64 = 500;

/// Outcome of a successful transfer, from the sender's point of view
#[derive(Debug, Clone, Serialize)]
pub struct TransferReceipt {
    pub amount: Decimal,
    pub sender_payment_id: String,
    pub recipient_payment_id: String,
    pub sender_balance: Decimal,
    pub sender_history: Vec<TransactionRecord>,
    pub send_record_id: Uuid,
    pub receive_record_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

/// A transfer request that passed input validation
#[derive(Debug, Clone)]
struct TransferRequest {
    sender: String,
    recipient: String,
    amount: Decimal,
}

impl TransferRequest {
    fn parse(sender: &str, recipient: &str, amount: Decimal) -> Result<Self> {
        let sender = sender.trim();
        let recipient = recipient.trim();

        if sender.is_empty() || recipient.is_empty() {
            return Err(Error::invalid("sender and recipient are required"));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::invalid("amount must be greater than zero"));
        }
        if !is_currency_amount(amount) {
            return Err(Error::invalid("amount cannot have more than two decimal places"));
        }
        if sender == recipient {
            return Err(Error::invalid("cannot transfer to the same account"));
        }

        Ok(Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
        })
    }
}

/// Transfer service
pub struct TransferService {
    repository: Arc<dyn AccountRepository>,
    locks: AccountLocks,
    max_attempts: u32,
}

impl TransferService {
    pub fn new(repository: Arc<dyn AccountRepository>) -> Self {
        Self::with_max_attempts(repository, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(repository: Arc<dyn AccountRepository>, max_attempts: u32) -> Self {
        Self {
            repository,
            locks: AccountLocks::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Transfer `amount` from one account to another
    ///
    /// Both identifiers may be a username or a payment identifier. Checks run
    /// in a fixed order and the first failure wins: request shape, sender,
    /// recipient, then funds. A failed transfer never mutates any account.
    pub async fn transfer(
        &self,
        sender_identifier: &str,
        recipient_identifier: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt> {
        let request = TransferRequest::parse(sender_identifier, recipient_identifier, amount)?;

        let mut attempt = 1;
        loop {
            match self.attempt(&request).await {
                Err(Error::Conflict(msg)) if attempt < self.max_attempts => {
                    let delay = Duration::from_millis(
                        (INITIAL_RETRY_DELAY_MS << (attempt - 1).min(16)).min(MAX_RETRY_DELAY_MS),
                    );
                    warn!(
                        "Transfer {} -> {} conflicted, retrying in {}ms (attempt {}/{}): {}",
                        request.sender,
                        request.recipient,
                        delay.as_millis(),
                        attempt,
                        self.max_attempts,
                        msg
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(Error::Conflict(msg)) => {
                    return Err(Error::persistence(format!(
                        "transfer abandoned after {} attempts: {}",
                        attempt, msg
                    )));
                }
                Err(Error::Internal(detail)) => {
                    error!(
                        "Transfer {} -> {} failed unexpectedly: {}",
                        request.sender, request.recipient, detail
                    );
                    return Err(Error::internal("transfer failed"));
                }
                Ok(receipt) => {
                    info!(
                        "Transfer completed: {} -> {} (send {}, receive {})",
                        receipt.sender_payment_id,
                        receipt.recipient_payment_id,
                        receipt.send_record_id,
                        receipt.receive_record_id
                    );
                    return Ok(receipt);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One read-validate-write cycle
    async fn attempt(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        let sender = self
            .repository
            .find_by_identifier(&request.sender)
            .await?
            .ok_or_else(|| Error::SenderNotFound(request.sender.clone()))?;
        let recipient = self
            .repository
            .find_by_identifier(&request.recipient)
            .await?
            .ok_or_else(|| Error::RecipientNotFound(request.recipient.clone()))?;

        // e.g. username on one side, payment id on the other
        if sender.id == recipient.id {
            return Err(Error::invalid("cannot transfer to the same account"));
        }

        let _guard = self.locks.lock_pair(sender.id, recipient.id).await;

        // Re-read under the locks: another transfer may have committed since
        let mut sender = self
            .repository
            .find_by_id(sender.id)
            .await?
            .ok_or_else(|| Error::SenderNotFound(request.sender.clone()))?;
        let mut recipient = self
            .repository
            .find_by_id(recipient.id)
            .await?
            .ok_or_else(|| Error::RecipientNotFound(request.recipient.clone()))?;

        let now = Utc::now();
        let send_record_id = sender.debit(request.amount, &recipient.payment_id, now)?.id;
        let receive_record_id = recipient.credit(request.amount, &sender.payment_id, now).id;

        let accounts = [sender, recipient];
        self.repository.save_all(&accounts).await?;
        let [sender, recipient] = accounts;

        Ok(TransferReceipt {
            amount: request.amount,
            sender_payment_id: sender.payment_id,
            recipient_payment_id: recipient.payment_id,
            sender_balance: sender.balance,
            sender_history: sender.history,
            send_record_id,
            receive_record_id,
            completed_at: now,
        })
    }
}
