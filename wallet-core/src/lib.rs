//! Wallet Core - Business logic for a digital wallet
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, TransactionRecord, errors)
//! - **ports**: Trait definitions for external dependencies (AccountRepository, IdentityStore)
//! - **services**: Business logic orchestration (transfers, accounts, admin, event log)
//! - **adapters**: Concrete implementations (DuckDB, in-memory, Argon2)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::identity::Argon2IdentityStore;
use config::Config;
use ports::{AccountRepository, IdentityStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, ErrorKind, OperationResult};
pub use domain::{Account, AccountDetails, AccountSummary, Direction, Role, TransactionRecord};
pub use services::{Registration, TransferReceipt};

pub const DB_FILENAME: &str = "wallet.duckdb";

/// Main context for wallet operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct WalletContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub account_service: AccountService,
    pub transfer_service: TransferService,
    pub admin_service: AdminService,
}

impl WalletContext {
    /// Open (or create) the wallet stored in `wallet_dir`
    ///
    /// When `admin_password` is given, the configured admin account is
    /// created if it does not exist yet.
    pub async fn new(wallet_dir: &Path, admin_password: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(wallet_dir)
            .with_context(|| format!("Failed to create {}", wallet_dir.display()))?;
        let config = Config::load(wallet_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&wallet_dir.join(DB_FILENAME))?);

        // Initialize schema
        repository.ensure_schema()?;

        let accounts: Arc<dyn AccountRepository> = repository.clone();
        let identity: Arc<dyn IdentityStore> =
            Arc::new(Argon2IdentityStore::new(config.argon2.clone()));

        let account_service = AccountService::new(
            Arc::clone(&accounts),
            Arc::clone(&identity),
            config.starting_balance,
            config.payment_domain.clone(),
        );
        let transfer_service =
            TransferService::with_max_attempts(Arc::clone(&accounts), config.transfer_max_attempts);
        let admin_service = AdminService::new(accounts, identity, config.payment_domain.clone());

        if let Some(password) = admin_password {
            admin_service
                .ensure_admin(&config.admin.username, &config.admin.email, password)
                .await?;
        }

        Ok(Self {
            config,
            repository,
            account_service,
            transfer_service,
            admin_service,
        })
    }
}
