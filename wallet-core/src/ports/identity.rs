//! Identity store port - credential hashing and verification

use crate::domain::result::Result;

/// Turns passwords into stored credentials and checks them later
///
/// Implementations must salt every hash and must never store or return the
/// plaintext password.
pub trait IdentityStore: Send + Sync {
    /// Produce a salted one-way credential for `password`
    fn hash_credential(&self, password: &str) -> Result<String>;

    /// Check `password` against a credential produced by `hash_credential`
    fn verify_credential(&self, password: &str, credential: &str) -> Result<bool>;
}
