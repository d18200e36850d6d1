//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the AccountRepository port
//! - In-memory map for the AccountRepository port (tests, embedding)
//! - Argon2id for the IdentityStore port

pub mod duckdb;
pub mod identity;
pub mod memory;
