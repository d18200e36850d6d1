//! Repository port - account persistence abstraction

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::Account;

/// Durable store of wallet accounts and their transaction histories
///
/// Lookups are exact and case-sensitive. Writes are version-checked: an
/// account is written only if the stored version still equals
/// `account.version`, after which the stored version is incremented. A stale
/// version fails with `Error::Conflict`.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    // === Lookups ===

    /// Find an account by username or payment identifier
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>>;

    /// Find an account by username or email (login lookup)
    async fn find_by_login(&self, username_or_email: &str) -> Result<Option<Account>>;

    /// Find an account by username only
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Find an account by its primary key
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Get all accounts
    async fn list(&self) -> Result<Vec<Account>>;

    // === Writes ===

    /// Create a new account
    ///
    /// Fails with `Error::UsernameOrEmailTaken` if the username, email or
    /// payment identifier is already in use.
    async fn insert(&self, account: &Account) -> Result<()>;

    /// Persist balances and append new history records for all `accounts`
    /// as one unit: either every account is written or none is.
    async fn save_all(&self, accounts: &[Account]) -> Result<()>;

    /// Persist a single account
    async fn save(&self, account: &Account) -> Result<()> {
        self.save_all(std::slice::from_ref(account)).await
    }

    /// Delete an account and its history. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}
