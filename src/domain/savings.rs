use serde::{Deserialize, Serialize};

use super::{Cents, UserId};

/// The single savings record of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Savings {
    pub user_id: UserId,
    pub goal_cents: Cents,
    pub saved_cents: Cents,
}

impl Savings {
    /// Zero-initialized record, as created the first time a user is seen.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            goal_cents: 0,
            saved_cents: 0,
        }
    }

    /// Saved amount as a percentage of the goal; zero when no positive goal is set.
    pub fn progress_percent(&self) -> f64 {
        if self.goal_cents > 0 {
            self.saved_cents as f64 / self.goal_cents as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn progress(&self) -> SavingsProgress {
        SavingsProgress {
            goal_cents: self.goal_cents,
            saved_cents: self.saved_cents,
            progress_percent: self.progress_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsProgress {
    pub goal_cents: Cents,
    pub saved_cents: Cents,
    pub progress_percent: f64,
}
