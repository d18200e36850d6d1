//! Admin service - account listing, deletion and admin seeding

use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountSummary, Role};
use crate::ports::{AccountRepository, IdentityStore};

/// Admin service
pub struct AdminService {
    repository: Arc<dyn AccountRepository>,
    identity: Arc<dyn IdentityStore>,
    payment_domain: String,
}

impl AdminService {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        identity: Arc<dyn IdentityStore>,
        payment_domain: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            identity,
            payment_domain: payment_domain.into(),
        }
    }

    /// All accounts, ordered by username
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let accounts = self.repository.list().await?;
        Ok(accounts.iter().map(Account::summary).collect())
    }

    /// Delete a user account and its history
    ///
    /// Admin accounts cannot be deleted.
    pub async fn delete_account(&self, id: Uuid) -> Result<AccountSummary> {
        let account = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("account {}", id)))?;

        if account.is_admin() {
            return Err(Error::invalid("admin accounts cannot be deleted"));
        }

        // Lost a race with another delete
        if !self.repository.delete(id).await? {
            return Err(Error::not_found(format!("account {}", id)));
        }

        info!("Deleted account {} ({})", account.username, account.id);
        Ok(account.summary())
    }

    /// Verify that the credentials belong to an admin account
    pub async fn authenticate(&self, username_or_email: &str, password: &str) -> Result<AccountSummary> {
        let account = self
            .repository
            .find_by_login(username_or_email.trim())
            .await?
            .filter(Account::is_admin)
            .ok_or(Error::InvalidCredentials)?;

        let identity = Arc::clone(&self.identity);
        let password = password.to_string();
        let credential = account.credential.clone();
        let verified = tokio::task::spawn_blocking(move || {
            identity.verify_credential(&password, &credential)
        })
        .await
        .map_err(|e| Error::internal(format!("credential check task failed: {}", e)))??;

        if !verified {
            return Err(Error::InvalidCredentials);
        }
        Ok(account.summary())
    }

    /// Create the admin account unless the username is already taken
    ///
    /// Returns true if an account was created. The admin holds no funds.
    pub async fn ensure_admin(&self, username: &str, email: &str, password: &str) -> Result<bool> {
        if let Some(existing) = self.repository.find_by_username(username).await? {
            if !existing.is_admin() {
                return Err(Error::invalid(format!(
                    "'{}' is already registered as a regular user",
                    username
                )));
            }
            return Ok(false);
        }

        let identity = Arc::clone(&self.identity);
        let secret = password.to_string();
        let credential = tokio::task::spawn_blocking(move || identity.hash_credential(&secret))
            .await
            .map_err(|e| Error::internal(format!("credential hashing task failed: {}", e)))??;

        let mut admin = Account::new(
            username,
            email,
            Account::payment_id_for(username, &self.payment_domain),
            credential,
            Decimal::ZERO,
        );
        admin.role = Role::Admin;
        self.repository.insert(&admin).await?;

        info!("Seeded admin account {}", admin.username);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::identity::Argon2IdentityStore;
    use crate::adapters::memory::InMemoryRepository;
    use crate::domain::Argon2Params;
    use rust_decimal_macros::dec;

    fn service() -> (Arc<InMemoryRepository>, AdminService) {
        let repo = Arc::new(InMemoryRepository::new());
        let identity = Arc::new(Argon2IdentityStore::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        }));
        (repo.clone(), AdminService::new(repo, identity, "payment"))
    }

    async fn add_user(repo: &InMemoryRepository, username: &str) -> Account {
        let account = Account::new(
            username,
            format!("{}@example.com", username),
            Account::payment_id_for(username, "payment"),
            "credential",
            dec!(2000),
        );
        repo.insert(&account).await.unwrap();
        account
    }

    #[tokio::test]
    async fn test_list_accounts_sorted() {
        let (repo, service) = service();
        add_user(&repo, "carol").await;
        add_user(&repo, "alice").await;

        let names: Vec<String> = service
            .list_accounts()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.username)
            .collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_delete_account() {
        let (repo, service) = service();
        let alice = add_user(&repo, "alice").await;

        let deleted = service.delete_account(alice.id).await.unwrap();
        assert_eq!(deleted.username, "alice");
        assert!(repo.find_by_id(alice.id).await.unwrap().is_none());

        let err = service.delete_account(alice.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let (repo, service) = service();

        assert!(service.ensure_admin("admin", "admin@system.com", "admin-secret").await.unwrap());
        assert!(!service.ensure_admin("admin", "admin@system.com", "admin-secret").await.unwrap());

        let admin = repo.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.balance, Decimal::ZERO);

        let err = service.delete_account(admin.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_ensure_admin_refuses_user_name() {
        let (repo, service) = service();
        add_user(&repo, "admin").await;

        let err = service.ensure_admin("admin", "root@system.com", "admin-secret").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_authenticate_requires_admin_role() {
        let (repo, service) = service();
        service.ensure_admin("admin", "admin@system.com", "admin-secret").await.unwrap();
        add_user(&repo, "alice").await;

        let admin = service.authenticate("admin@system.com", "admin-secret").await.unwrap();
        assert_eq!(admin.role, Role::Admin);

        let err = service.authenticate("admin", "wrong-secret").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));

        let err = service.authenticate("alice", "credential").await.unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }
}
