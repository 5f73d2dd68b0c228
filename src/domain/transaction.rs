use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Expense,
    Income,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Some(TransactionType::Expense),
            "income" => Some(TransactionType::Income),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::from_str(s).ok_or_else(|| format!("unknown transaction type '{}'", s))
    }
}

/// A single income or expense entry in a user's ledger.
/// Entries are append-only: there is no edit or delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Insertion order across the whole ledger, assigned by the repository
    pub sequence: i64,
    pub user_id: UserId,
    /// Free-form date text as entered by the caller
    pub date: String,
    /// Free-text label, matched exactly (case-sensitive) against budgets
    pub category: String,
    pub amount_cents: Cents,
    pub transaction_type: TransactionType,
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        date: impl Into<String>,
        category: impl Into<String>,
        amount_cents: Cents,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Assigned on insert
            user_id,
            date: date.into(),
            category: category.into(),
            amount_cents,
            transaction_type,
            recorded_at: Utc::now(),
        }
    }
}
