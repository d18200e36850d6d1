//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content), applied in order.

/// All wallet database migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// When adding a new migration, create NNN_description.sql next to this file
/// and append it here. Never edit a migration that has shipped.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_wallet_schema.sql", include_str!("001_wallet_schema.sql")),
];

/// Name of the bootstrap migration that creates sys_migrations
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";
