// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use pennywise::application::LedgerService;
use pennywise::domain::{TransactionType, UserId};
use pennywise::storage::Repository;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Like `test_service`, but also hands back the pool so a test can reach
/// the tables directly.
pub async fn test_service_with_pool() -> Result<(LedgerService, SqlitePool, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
    let repo = Repository::new(pool.clone());
    repo.migrate().await?;
    Ok((LedgerService::new(repo), pool, temp_dir))
}

/// Register a user and create their savings record, like a first login.
pub async fn logged_in_user(service: &LedgerService, username: &str) -> Result<UserId> {
    service.register(username, "secret").await?;
    let user = service.login(username, "secret").await?;
    Ok(user.id)
}

pub async fn expense(
    service: &LedgerService,
    user_id: UserId,
    category: &str,
    amount: &str,
) -> Result<()> {
    service
        .add_transaction(user_id, "2024-03-01", category, amount, TransactionType::Expense)
        .await?;
    Ok(())
}

pub async fn income(
    service: &LedgerService,
    user_id: UserId,
    category: &str,
    amount: &str,
) -> Result<()> {
    service
        .add_transaction(user_id, "2024-03-01", category, amount, TransactionType::Income)
        .await?;
    Ok(())
}
