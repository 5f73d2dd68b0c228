use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{CategoryBudget, Savings, Transaction, User, UserId};

/// Everything held for one user, as written by a full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<CategoryBudget>,
    pub savings: Option<Savings>,
}

/// Writes a user's ledger out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export transactions to CSV in insertion order. Returns the row count.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        user_id: UserId,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.service.list_transactions(user_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "sequence",
            "date",
            "category",
            "amount_cents",
            "type",
            "recorded_at",
        ])?;

        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.sequence.to_string(),
                tx.date.clone(),
                tx.category.clone(),
                tx.amount_cents.to_string(),
                tx.transaction_type.as_str().to_string(),
                tx.recorded_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export the user's whole ledger as a pretty-printed JSON snapshot.
    /// Passwords are never included.
    pub async fn export_full_json<W: Write>(
        &self,
        user_id: UserId,
        mut writer: W,
    ) -> Result<LedgerSnapshot> {
        let user = self.service.get_user(user_id).await?;
        let transactions = self.service.list_transactions(user_id).await?;
        let budgets = self.service.list_category_budgets(user_id).await?;
        let savings = match self.service.get_savings(user_id).await {
            Ok(savings) => Some(savings),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err.into()),
        };

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            user,
            transactions,
            budgets,
            savings,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
