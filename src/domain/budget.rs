use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, UserId};

/// Spending ceiling for one category. A user holds at most one per category;
/// setting it again replaces the previous value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub user_id: UserId,
    pub category: String,
    pub budget_cents: Cents,
    pub updated_at: DateTime<Utc>,
}

impl CategoryBudget {
    pub fn new(user_id: UserId, category: impl Into<String>, budget_cents: Cents) -> Self {
        Self {
            user_id,
            category: category.into(),
            budget_cents,
            updated_at: Utc::now(),
        }
    }

    /// Compare summed expenses against the ceiling.
    /// Only strictly exceeding the budget counts as an overrun.
    pub fn evaluate(&self, total_expenses_cents: Cents) -> Option<OverrunInfo> {
        if total_expenses_cents > self.budget_cents {
            Some(OverrunInfo {
                category: self.category.clone(),
                budget_cents: self.budget_cents,
                total_expenses_cents,
            })
        } else {
            None
        }
    }
}

/// A category whose expenses exceed its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrunInfo {
    pub category: String,
    pub budget_cents: Cents,
    pub total_expenses_cents: Cents,
}

impl OverrunInfo {
    pub fn excess(&self) -> Cents {
        self.total_expenses_cents.saturating_sub(self.budget_cents)
    }
}
