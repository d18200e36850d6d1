//! Account service - registration, login and account lookup

use std::sync::{Arc, OnceLock};

use log::info;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountDetails, AccountSummary};
use crate::ports::{AccountRepository, IdentityStore};

const MIN_PASSWORD_LEN: usize = 8;

/// Result of a successful registration
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub payment_id: String,
    pub balance: Decimal,
}

fn username_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").ok())
        .as_ref()
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

fn matches(pattern: Option<&'static Regex>, value: &str) -> Result<bool> {
    pattern
        .map(|re| re.is_match(value))
        .ok_or_else(|| Error::internal("validation pattern failed to compile"))
}

/// Account service
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
    identity: Arc<dyn IdentityStore>,
    starting_balance: Decimal,
    payment_domain: String,
}

impl AccountService {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        identity: Arc<dyn IdentityStore>,
        starting_balance: Decimal,
        payment_domain: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            identity,
            starting_balance,
            payment_domain: payment_domain.into(),
        }
    }

    /// Create a user account with the configured starting balance
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Registration> {
        let username = username.trim();
        let email = email.trim();

        if !matches(username_pattern(), username)? {
            return Err(Error::invalid(
                "username must be 3-32 characters of letters, digits, '_', '.' or '-'",
            ));
        }
        if !matches(email_pattern(), email)? {
            return Err(Error::invalid("email address is not valid"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        // Cheap pre-check so a duplicate does not pay for a hash
        if self.repository.find_by_login(username).await?.is_some()
            || self.repository.find_by_login(email).await?.is_some()
        {
            return Err(Error::UsernameOrEmailTaken);
        }

        let credential = self.hash(password).await?;
        let payment_id = Account::payment_id_for(username, &self.payment_domain);
        let account = Account::new(username, email, payment_id, credential, self.starting_balance);
        self.repository.insert(&account).await?;

        info!("Registered account {} ({})", account.username, account.payment_id);
        Ok(Registration {
            username: account.username,
            payment_id: account.payment_id,
            balance: account.balance,
        })
    }

    /// Check credentials by username or email
    ///
    /// An unknown login and a wrong password are indistinguishable to the caller.
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<AccountSummary> {
        let account = self
            .repository
            .find_by_login(username_or_email.trim())
            .await?
            .ok_or(Error::InvalidCredentials)?;

        if !self.verify(password, &account.credential).await? {
            return Err(Error::InvalidCredentials);
        }
        Ok(account.summary())
    }

    /// Balance, payment identifier and history of one account
    pub async fn get_account(&self, username: &str) -> Result<AccountDetails> {
        self.repository
            .find_by_username(username.trim())
            .await?
            .map(|account| account.details())
            .ok_or_else(|| Error::not_found(format!("account '{}'", username.trim())))
    }

    async fn hash(&self, password: &str) -> Result<String> {
        let identity = Arc::clone(&self.identity);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || identity.hash_credential(&password))
            .await
            .map_err(|e| Error::internal(format!("credential hashing task failed: {}", e)))?
    }

    async fn verify(&self, password: &str, credential: &str) -> Result<bool> {
        let identity = Arc::clone(&self.identity);
        let password = password.to_string();
        let credential = credential.to_string();
        tokio::task::spawn_blocking(move || identity.verify_credential(&password, &credential))
            .await
            .map_err(|e| Error::internal(format!("credential check task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::identity::Argon2IdentityStore;
    use crate::adapters::memory::InMemoryRepository;
    use crate::domain::{Argon2Params, Role};
    use rust_decimal_macros::dec;

    fn service() -> (Arc<InMemoryRepository>, AccountService) {
        let repo = Arc::new(InMemoryRepository::new());
        let identity = Arc::new(Argon2IdentityStore::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        }));
        let service = AccountService::new(repo.clone(), identity, dec!(2000), "payment");
        (repo, service)
    }

    #[tokio::test]
    async fn test_register_creates_account_with_starting_balance() {
        let (repo, service) = service();

        let registration = service
            .register("alice", "alice@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(registration.payment_id, "alice@payment");
        assert_eq!(registration.balance, dec!(2000));

        let stored = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.role, Role::User);
        assert!(stored.history.is_empty());
        assert_ne!(stored.credential, "correct horse");
        assert!(stored.credential.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let (_repo, service) = service();
        service.register("alice", "alice@example.com", "password1").await.unwrap();

        let err = service.register("alice", "other@example.com", "password1").await.unwrap_err();
        assert!(matches!(err, Error::UsernameOrEmailTaken));

        let err = service.register("alice2", "alice@example.com", "password1").await.unwrap_err();
        assert!(matches!(err, Error::UsernameOrEmailTaken));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let (repo, service) = service();

        for (username, email, password) in [
            ("al", "al@example.com", "password1"),
            ("has space", "x@example.com", "password1"),
            ("bob", "not-an-email", "password1"),
            ("bob", "bob@example.com", "short"),
        ] {
            let err = service.register(username, email, password).await.unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{} {}", username, email);
        }
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let (_repo, service) = service();
        service.register("alice", "alice@example.com", "password1").await.unwrap();

        let summary = service.login("alice", "password1").await.unwrap();
        assert_eq!(summary.username, "alice");
        assert_eq!(summary.balance, dec!(2000));

        let summary = service.login("alice@example.com", "password1").await.unwrap();
        assert_eq!(summary.payment_id, "alice@payment");
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let (_repo, service) = service();
        service.register("alice", "alice@example.com", "password1").await.unwrap();

        let wrong = service.login("alice", "password2").await.unwrap_err();
        let unknown = service.login("mallory", "password1").await.unwrap_err();
        assert!(matches!(wrong, Error::InvalidCredentials));
        assert!(matches!(unknown, Error::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_get_account() {
        let (_repo, service) = service();
        service.register("alice", "alice@example.com", "password1").await.unwrap();

        let details = service.get_account("alice").await.unwrap();
        assert_eq!(details.balance, dec!(2000));
        assert_eq!(details.payment_id, "alice@payment");
        assert!(details.history.is_empty());

        let err = service.get_account("bob").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Lookup is by username only
        let err = service.get_account("alice@payment").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
