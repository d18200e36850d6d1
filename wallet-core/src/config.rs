//! Configuration management
//!
//! Settings live in `<wallet_dir>/settings.json`; every field is optional:
//! ```json
//! {
//!   "startingBalance": "2000",
//!   "paymentDomain": "payment",
//!   "transferMaxAttempts": 5,
//!   "admin": { "username": "admin", "email": "admin@system.com" },
//!   "argon2": { "timeCost": 3, "memoryCost": 65536, "parallelism": 4, "hashLen": 32 }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{is_currency_amount, Argon2Params};
use crate::services::transfer::DEFAULT_MAX_ATTEMPTS;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_STARTING_BALANCE: u32 = 2000;
pub const DEFAULT_PAYMENT_DOMAIN: &str = "payment";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    starting_balance: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payment_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transfer_max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin: Option<AdminSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    argon2: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Identity of the seeded admin account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin@system.com".to_string(),
        }
    }
}

/// Wallet configuration (resolved view of settings.json plus environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub starting_balance: Decimal,
    pub payment_domain: String,
    pub transfer_max_attempts: u32,
    pub admin: AdminSettings,
    pub argon2: Argon2Params,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(DEFAULT_STARTING_BALANCE),
            payment_domain: DEFAULT_PAYMENT_DOMAIN.to_string(),
            transfer_max_attempts: DEFAULT_MAX_ATTEMPTS,
            admin: AdminSettings::default(),
            argon2: Argon2Params::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the wallet directory
    ///
    /// A missing or unreadable settings file yields the defaults. The
    /// starting balance can be overridden with WALLET_STARTING_BALANCE.
    pub fn load(wallet_dir: &Path) -> Result<Self> {
        let raw = Self::read_settings(wallet_dir)?;
        let defaults = Self::default();

        let starting_balance = match std::env::var("WALLET_STARTING_BALANCE") {
            Ok(value) => Decimal::from_str(value.trim())
                .with_context(|| format!("Invalid WALLET_STARTING_BALANCE '{}'", value))?,
            Err(_) => raw.starting_balance.unwrap_or(defaults.starting_balance),
        };
        if starting_balance.is_sign_negative() && !starting_balance.is_zero() {
            anyhow::bail!("Starting balance cannot be negative");
        }
        if !is_currency_amount(starting_balance) {
            anyhow::bail!("Starting balance cannot have more than two decimal places");
        }

        Ok(Self {
            starting_balance,
            payment_domain: raw
                .payment_domain
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(defaults.payment_domain),
            transfer_max_attempts: raw
                .transfer_max_attempts
                .unwrap_or(defaults.transfer_max_attempts),
            admin: raw.admin.clone().unwrap_or_default(),
            argon2: raw.argon2.clone().unwrap_or_default(),
            _raw_settings: raw,
        })
    }

    fn read_settings(wallet_dir: &Path) -> Result<SettingsFile> {
        let settings_path = wallet_dir.join(SETTINGS_FILE);
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(&settings_path)?;
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }

    /// Save config to the wallet directory
    /// Preserves settings this crate doesn't manage
    pub fn save(&self, wallet_dir: &Path) -> Result<()> {
        let mut settings = Self::read_settings(wallet_dir)?;

        settings.starting_balance = Some(self.starting_balance);
        settings.payment_domain = Some(self.payment_domain.clone());
        settings.transfer_max_attempts = Some(self.transfer_max_attempts);
        settings.admin = Some(self.admin.clone());
        settings.argon2 = Some(self.argon2.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(wallet_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.payment_domain, "payment");
        assert_eq!(config.transfer_max_attempts, 5);
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.admin.email, "admin@system.com");
        assert_eq!(config.argon2, Argon2Params::default());
    }

    #[test]
    fn test_reads_camel_case_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "paymentDomain": "upi",
                "transferMaxAttempts": 3,
                "admin": { "username": "root", "email": "root@bank.test" }
            }"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.payment_domain, "upi");
        assert_eq!(config.transfer_max_attempts, 3);
        assert_eq!(config.admin.username, "root");
    }

    #[test]
    fn test_starting_balance_precision() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        std::fs::write(&path, r#"{ "startingBalance": "2000.555" }"#).unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("two decimal places"));

        std::fs::write(&path, r#"{ "startingBalance": "-1" }"#).unwrap();
        assert!(Config::load(dir.path()).is_err());

        std::fs::write(&path, r#"{ "startingBalance": "150.500" }"#).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().starting_balance, dec!(150.5));
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.payment_domain, "payment");
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "paymentDomain": "upi" }"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.transfer_max_attempts = 7;
        config.starting_balance = dec!(150.50);
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["paymentDomain"], "upi");
        assert_eq!(value["transferMaxAttempts"], 7);

        let reloaded = Config::load(dir.path()).unwrap();
        assert_eq!(reloaded.transfer_max_attempts, 7);
        assert_eq!(reloaded.payment_domain, "upi");
    }
}
