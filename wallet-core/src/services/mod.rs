//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod admin;
mod locks;
pub mod logging;
pub mod migration;
pub mod transfer;

pub use account::{AccountService, Registration};
pub use admin::AdminService;
pub use locks::{AccountLocks, PairGuard};
pub use logging::{CommandStats, EntryPoint, LogEntry, LogEvent, LogQuery, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use transfer::{TransferReceipt, TransferService};
