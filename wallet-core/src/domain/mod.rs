//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod credentials;
pub mod result;
mod transaction;

pub use account::{Account, AccountDetails, AccountSummary, Role};
pub use credentials::Argon2Params;
pub use transaction::{is_currency_amount, Direction, TransactionRecord};
