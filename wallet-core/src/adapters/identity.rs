//! Argon2id identity store
//!
//! Credentials are stored as PHC strings (`$argon2id$v=19$m=...$salt$hash`),
//! so every hash carries its own salt and cost parameters.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;
use crate::ports::IdentityStore;

/// Salt length in bytes (16 bytes, matching the Argon2 recommendation)
const SALT_LEN: usize = 16;

/// Identity store backed by Argon2id password hashing
pub struct Argon2IdentityStore {
    params: Argon2Params,
}

impl Argon2IdentityStore {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    fn hasher(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            Some(self.params.hash_len as usize),
        )
        .map_err(|e| Error::internal(format!("Failed to create argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2IdentityStore {
    fn default() -> Self {
        Self::new(Argon2Params::default())
    }
}

impl IdentityStore for Argon2IdentityStore {
    fn hash_credential(&self, password: &str) -> Result<String> {
        let salt_bytes: [u8; SALT_LEN] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::internal(format!("Failed to encode salt: {}", e)))?;

        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::internal(format!("Failed to hash credential: {}", e)))?;

        Ok(hash.to_string())
    }

    fn verify_credential(&self, password: &str, credential: &str) -> Result<bool> {
        let parsed = PasswordHash::new(credential)
            .map_err(|e| Error::internal(format!("Stored credential is malformed: {}", e)))?;

        // Parameters come from the PHC string, not from self.params
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::internal(format!("Failed to verify credential: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_store() -> Argon2IdentityStore {
        Argon2IdentityStore::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        })
    }

    #[test]
    fn test_hash_is_salted_phc_string() {
        let store = fast_store();
        let first = store.hash_credential("hunter22").unwrap();
        let second = store.hash_credential("hunter22").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("hunter22"));
        assert_ne!(first, second, "same password must hash differently");
    }

    #[test]
    fn test_verify_accepts_right_password_only() {
        let store = fast_store();
        let credential = store.hash_credential("correct horse").unwrap();

        assert!(store.verify_credential("correct horse", &credential).unwrap());
        assert!(!store.verify_credential("wrong horse", &credential).unwrap());
    }

    #[test]
    fn test_verify_uses_stored_params() {
        let credential = fast_store().hash_credential("secret-pw").unwrap();
        let other = Argon2IdentityStore::new(Argon2Params {
            time_cost: 2,
            memory_cost: 2048,
            parallelism: 1,
            hash_len: 32,
        });
        assert!(other.verify_credential("secret-pw", &credential).unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_credential() {
        let err = fast_store()
            .verify_credential("whatever", "plaintext-password")
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
