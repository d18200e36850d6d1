//! In-memory repository implementation
//!
//! Same contract as the DuckDB adapter, without durability. Used by unit
//! tests and by embedders that bring their own persistence.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::Account;
use crate::ports::AccountRepository;

#[derive(Default)]
pub struct InMemoryRepository {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Account>>> {
        self.accounts
            .lock()
            .map_err(|e| Error::persistence(format!("Lock poisoned: {}", e)))
    }

    fn find(&self, predicate: impl Fn(&Account) -> bool) -> Result<Option<Account>> {
        let accounts = self.lock()?;
        Ok(accounts.values().find(|a| predicate(a)).cloned())
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        self.find(|a| a.matches_identifier(identifier))
    }

    async fn find_by_login(&self, username_or_email: &str) -> Result<Option<Account>> {
        self.find(|a| a.matches_login(username_or_email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.find(|a| a.username == username)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = self.lock()?.values().cloned().collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    async fn insert(&self, account: &Account) -> Result<()> {
        account.validate()?;
        let mut accounts = self.lock()?;
        let taken = accounts.values().any(|a| {
            a.id == account.id
                || a.username == account.username
                || a.email == account.email
                || a.payment_id == account.payment_id
        });
        if taken {
            return Err(Error::UsernameOrEmailTaken);
        }

        let mut stored = account.clone();
        stored.version = 0;
        accounts.insert(stored.id, stored);
        Ok(())
    }

    async fn save_all(&self, updates: &[Account]) -> Result<()> {
        let mut accounts = self.lock()?;

        // Check every version before touching anything
        for update in updates {
            match accounts.get(&update.id) {
                Some(stored) if stored.version == update.version => {}
                Some(_) => {
                    return Err(Error::Conflict(format!(
                        "account '{}' changed since it was read",
                        update.username
                    )))
                }
                None => {
                    return Err(Error::Conflict(format!(
                        "account '{}' no longer exists",
                        update.username
                    )))
                }
            }
        }

        for update in updates {
            let mut stored = update.clone();
            stored.version += 1;
            accounts.insert(stored.id, stored);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock()?.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(username: &str) -> Account {
        Account::new(
            username,
            format!("{}@example.com", username),
            Account::payment_id_for(username, "payment"),
            "credential",
            dec!(2000),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let repo = InMemoryRepository::new();
        repo.insert(&account("alice")).await.unwrap();

        let err = repo.insert(&account("alice")).await.unwrap_err();
        assert!(matches!(err, Error::UsernameOrEmailTaken));

        let mut same_email = account("alice2");
        same_email.email = "alice@example.com".to_string();
        let err = repo.insert(&same_email).await.unwrap_err();
        assert!(matches!(err, Error::UsernameOrEmailTaken));
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_accounts() {
        let repo = InMemoryRepository::new();

        let mut no_email = account("alice");
        no_email.email = "alice".to_string();
        let err = repo.insert(&no_email).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let mut sub_cent = account("bob");
        sub_cent.balance = dec!(2000.555);
        let err = repo.insert(&sub_cent).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookups() {
        let repo = InMemoryRepository::new();
        let alice = account("alice");
        repo.insert(&alice).await.unwrap();

        assert!(repo.find_by_identifier("alice@payment").await.unwrap().is_some());
        assert!(repo.find_by_identifier("alice@example.com").await.unwrap().is_none());
        assert!(repo.find_by_login("alice@example.com").await.unwrap().is_some());
        assert!(repo.find_by_username("alice@payment").await.unwrap().is_none());
        assert!(repo.find_by_id(alice.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_all_is_all_or_nothing() {
        let repo = InMemoryRepository::new();
        let alice = account("alice");
        let bob = account("bob");
        repo.insert(&alice).await.unwrap();
        repo.insert(&bob).await.unwrap();

        // Someone else updates bob first
        let mut bob_elsewhere = repo.find_by_id(bob.id).await.unwrap().unwrap();
        bob_elsewhere.balance = dec!(1);
        repo.save(&bob_elsewhere).await.unwrap();

        let mut alice_update = repo.find_by_id(alice.id).await.unwrap().unwrap();
        alice_update.balance = dec!(0);
        let err = repo.save_all(&[alice_update, bob]).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let stored_alice = repo.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(stored_alice.balance, dec!(2000));
        assert_eq!(stored_alice.version, 0);
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let repo = InMemoryRepository::new();
        let alice = account("alice");
        repo.insert(&alice).await.unwrap();

        repo.save(&alice).await.unwrap();
        assert_eq!(repo.find_by_id(alice.id).await.unwrap().unwrap().version, 1);

        // Second save from the same stale copy is rejected
        assert!(matches!(repo.save(&alice).await, Err(Error::Conflict(_))));
    }
}
