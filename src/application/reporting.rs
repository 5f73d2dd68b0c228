use serde::{Deserialize, Serialize};

use crate::domain::Cents;

/// Expense totals per category, the data behind spending charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseReport {
    pub categories: Vec<CategorySummary>,
    pub total: Cents,
}

impl ExpenseReport {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: Cents,
    pub count: i64,
    /// Share of all expenses, 0..=100
    pub percentage: f64,
}

/// Share of `part` in `whole` as a percentage; zero when `whole` is not positive.
pub fn percentage_of(part: Cents, whole: Cents) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}
