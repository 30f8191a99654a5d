//! # Wallet Repository
//!
//! SQLite adapter implementing the `LedgerRepository` port. Schema
//! migration runs automatically on connect; the settle primitive is a
//! conditional status flip and balance move inside one database
//! transaction.

pub mod sqlite;
mod types;


pub use sqlite::SqliteLedgerRepo;

/// Build and initialize a repository from a database URL.
///
/// # Examples
///
/// ```ignore
/// let repo = build_repo("sqlite://wallet.db?mode=rwc").await?;
/// ```
pub async fn build_repo(database_url: &str) -> anyhow::Result<SqliteLedgerRepo> {
    SqliteLedgerRepo::new(database_url).await
}
