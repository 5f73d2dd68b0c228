use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    saturating_total, CategoryBudget, Cents, OverrunInfo, Savings, Transaction, TransactionType,
    User, UserId, MAX_AMOUNT_CENTS,
};

use super::MIGRATION_001_INITIAL;

/// Per-category expense totals used by the reporting queries.
#[derive(Debug, Clone)]
pub struct CategoryAggregate {
    pub category: String,
    pub count: i64,
    pub total: Cents,
}

/// Outcome of [`Repository::add_to_savings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingsUpdate {
    /// The deposit was stored; carries the new saved amount.
    Applied(Cents),
    /// The user has no savings row.
    NoRecord,
    /// The new saved amount would exceed `MAX_AMOUNT_CENTS` in magnitude.
    /// Nothing was written.
    OutOfRange,
}

/// Repository for persisting and querying users, transactions, budgets and savings.
///
/// The repository is the only holder of the connection pool. Nothing read
/// from the store is cached between calls.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Insert a user. Returns `false` without writing anything when the
    /// username is already taken.
    pub async fn save_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(username) DO NOTHING
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Exact-match lookup of a username and password pair.
    pub async fn find_user_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserId>> {
        let row = sqlx::query("SELECT id FROM users WHERE username = ? AND password = ?")
            .bind(username)
            .bind(password)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up credentials")?;

        match row {
            Some(row) => {
                let id_str: String = row.get("id");
                Ok(Some(Uuid::parse_str(&id_str).context("Invalid user ID")?))
            }
            None => Ok(None),
        }
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            username: row.get("username"),
            password: row.get("password"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Insert a transaction and evaluate its category budget in one database
    /// transaction. Assigns `transaction.sequence`.
    ///
    /// A failed evaluation is logged and reported as no overrun; the insert
    /// is committed regardless.
    pub async fn save_transaction_and_check(
        &self,
        transaction: &mut Transaction,
    ) -> Result<Option<OverrunInfo>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, date, category, amount_cents, transaction_type, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING sequence
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.user_id.to_string())
        .bind(&transaction.date)
        .bind(&transaction.category)
        .bind(transaction.amount_cents)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.recorded_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to save transaction")?;
        transaction.sequence = row.get("sequence");

        let overrun = match Self::evaluate_overrun(
            &mut tx,
            transaction.user_id,
            &transaction.category,
        )
        .await
        {
            Ok(overrun) => overrun,
            Err(err) => {
                tracing::warn!(
                    category = %transaction.category,
                    error = %err,
                    "budget check failed after recording transaction"
                );
                None
            }
        };

        tx.commit().await.context("Failed to commit transaction")?;
        Ok(overrun)
    }

    async fn evaluate_overrun(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        user_id: UserId,
        category: &str,
    ) -> Result<Option<OverrunInfo>> {
        let Some(budget) = fetch_category_budget(&mut **tx, user_id, category).await? else {
            return Ok(None);
        };
        let total = sum_expenses(&mut **tx, user_id, category).await?;
        Ok(budget.evaluate(total))
    }

    /// List a user's transactions in insertion order.
    pub async fn list_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, user_id, date, category, amount_cents, transaction_type, recorded_at
            FROM transactions
            WHERE user_id = ?
            ORDER BY sequence
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Sum of expense amounts for one category (exact, case-sensitive match).
    pub async fn sum_expenses_for_category(&self, user_id: UserId, category: &str) -> Result<Cents> {
        sum_expenses(&self.pool, user_id, category).await
    }

    /// Expense totals grouped by category. Categories without expenses are absent.
    pub async fn expenses_by_category(&self, user_id: UserId) -> Result<BTreeMap<String, Cents>> {
        Ok(self
            .expense_aggregates(user_id)
            .await?
            .into_iter()
            .map(|agg| (agg.category, agg.total))
            .collect())
    }

    /// Expense count and total per category, ordered by category. Totals
    /// are summed here rather than with SQL `SUM`, which turns into a
    /// float or an error once it leaves the integer range.
    pub async fn expense_aggregates(&self, user_id: UserId) -> Result<Vec<CategoryAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT category, amount_cents
            FROM transactions
            WHERE user_id = ? AND transaction_type = ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(TransactionType::Expense.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to aggregate expenses")?;

        let mut by_category: BTreeMap<String, CategoryAggregate> = BTreeMap::new();
        for row in &rows {
            let category: String = row.try_get("category").context("Invalid category")?;
            let amount: Cents = row.try_get("amount_cents").context("Invalid amount")?;
            let agg = by_category
                .entry(category.clone())
                .or_insert_with(|| CategoryAggregate {
                    category,
                    count: 0,
                    total: 0,
                });
            agg.count += 1;
            agg.total = saturating_total([agg.total, amount]);
        }

        Ok(by_category.into_values().collect())
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let type_str: String = row.get("transaction_type");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            date: row.get("date"),
            category: row.get("category"),
            amount_cents: row.get("amount_cents"),
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            recorded_at: parse_timestamp(&recorded_at_str)?,
        })
    }

    // ========================
    // Budget operations
    // ========================

    /// Insert or replace the budget for `(user_id, category)`.
    pub async fn upsert_category_budget(&self, budget: &CategoryBudget) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO category_budgets (user_id, category, budget_cents, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, category)
            DO UPDATE SET budget_cents = excluded.budget_cents, updated_at = excluded.updated_at
            "#,
        )
        .bind(budget.user_id.to_string())
        .bind(&budget.category)
        .bind(budget.budget_cents)
        .bind(budget.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save category budget")?;
        Ok(())
    }

    pub async fn get_category_budget(
        &self,
        user_id: UserId,
        category: &str,
    ) -> Result<Option<CategoryBudget>> {
        fetch_category_budget(&self.pool, user_id, category).await
    }

    /// List a user's budgets ordered by category.
    pub async fn list_category_budgets(&self, user_id: UserId) -> Result<Vec<CategoryBudget>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, category, budget_cents, updated_at
            FROM category_budgets
            WHERE user_id = ?
            ORDER BY category
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list category budgets")?;

        rows.iter().map(row_to_category_budget).collect()
    }

    // ========================
    // Savings operations
    // ========================

    /// Insert a zeroed savings row unless one exists. Returns `true` if a row was created.
    pub async fn ensure_savings(&self, user_id: UserId) -> Result<bool> {
        let savings = Savings::empty(user_id);
        let result = sqlx::query(
            "INSERT OR IGNORE INTO savings (user_id, goal_cents, saved_cents) VALUES (?, ?, ?)",
        )
        .bind(savings.user_id.to_string())
        .bind(savings.goal_cents)
        .bind(savings.saved_cents)
        .execute(&self.pool)
        .await
        .context("Failed to initialize savings")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_savings(&self, user_id: UserId) -> Result<Option<Savings>> {
        let row = sqlx::query("SELECT user_id, goal_cents, saved_cents FROM savings WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch savings")?;

        match row {
            Some(row) => {
                let user_id_str: String = row.try_get("user_id").context("Invalid user ID")?;
                Ok(Some(Savings {
                    user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
                    goal_cents: row.try_get("goal_cents").context("Invalid savings goal")?,
                    saved_cents: row.try_get("saved_cents").context("Invalid saved amount")?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the goal. Returns `false` if the user has no savings row.
    pub async fn set_savings_goal(&self, user_id: UserId, goal_cents: Cents) -> Result<bool> {
        let result = sqlx::query("UPDATE savings SET goal_cents = ? WHERE user_id = ?")
            .bind(goal_cents)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to set savings goal")?;

        Ok(result.rows_affected() == 1)
    }

    /// Add to the saved amount. The read, the checked addition and the write
    /// share one database transaction; an out-of-range result writes nothing.
    pub async fn add_to_savings(
        &self,
        user_id: UserId,
        amount_cents: Cents,
    ) -> Result<SavingsUpdate> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query("SELECT saved_cents FROM savings WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch savings")?;
        let Some(row) = row else {
            return Ok(SavingsUpdate::NoRecord);
        };
        let saved: Cents = row.try_get("saved_cents").context("Invalid saved amount")?;

        let Some(new_saved) = saved
            .checked_add(amount_cents)
            .filter(|total| total.unsigned_abs() <= MAX_AMOUNT_CENTS.unsigned_abs())
        else {
            return Ok(SavingsUpdate::OutOfRange);
        };

        sqlx::query("UPDATE savings SET saved_cents = ? WHERE user_id = ?")
            .bind(new_saved)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to update savings")?;

        tx.commit().await.context("Failed to commit savings update")?;
        Ok(SavingsUpdate::Applied(new_saved))
    }
}

async fn sum_expenses<'e, E>(executor: E, user_id: UserId, category: &str) -> Result<Cents>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT amount_cents
        FROM transactions
        WHERE user_id = ? AND category = ? AND transaction_type = ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(category)
    .bind(TransactionType::Expense.as_str())
    .fetch_all(executor)
    .await
    .context("Failed to sum expenses")?;

    let amounts = rows
        .iter()
        .map(|row| row.try_get::<Cents, _>("amount_cents"))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid amount")?;
    Ok(saturating_total(amounts))
}

async fn fetch_category_budget<'e, E>(
    executor: E,
    user_id: UserId,
    category: &str,
) -> Result<Option<CategoryBudget>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT user_id, category, budget_cents, updated_at
        FROM category_budgets
        WHERE user_id = ? AND category = ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(category)
    .fetch_optional(executor)
    .await
    .context("Failed to fetch category budget")?;

    row.as_ref().map(row_to_category_budget).transpose()
}

fn row_to_category_budget(row: &sqlx::sqlite::SqliteRow) -> Result<CategoryBudget> {
    let user_id_str: String = row.try_get("user_id").context("Invalid user ID")?;
    let updated_at_str: String = row.try_get("updated_at").context("Invalid timestamp")?;

    Ok(CategoryBudget {
        user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
        category: row.try_get("category").context("Invalid category")?,
        budget_cents: row.try_get("budget_cents").context("Invalid budget amount")?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}
