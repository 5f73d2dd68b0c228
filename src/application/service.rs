use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::domain::{
    parse_cents, saturating_total, CategoryBudget, Cents, OverrunInfo, Savings, SavingsProgress,
    Transaction, TransactionType, User, UserId,
};
use crate::storage::{Repository, SavingsUpdate};

use super::{percentage_of, AppError, CategorySummary, ExpenseReport};

/// The ledger engine. Owns the store handle and exposes every operation a
/// front end (CLI, API, TUI, ...) needs.
pub struct LedgerService {
    repo: Repository,
}

/// Result of recording a transaction
#[derive(Debug, Clone)]
pub struct TransactionOutcome {
    pub transaction: Transaction,
    /// Present when the transaction's category is now over budget
    pub overrun: Option<OverrunInfo>,
}

/// Budget status information
#[derive(Debug, Clone)]
pub struct BudgetStatus {
    pub budget: CategoryBudget,
    pub spent: Cents,
    pub remaining: Cents,
    pub is_overrun: bool,
}

impl LedgerService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        debug!(path = database_path, "database initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing, already migrated database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Accounts
    // ========================

    /// Create a user account. Fails without side effects if the username is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserId, AppError> {
        let user = User::new(username, password);
        if !self.repo.save_user(&user).await? {
            debug!(username, "registration rejected: username taken");
            return Err(AppError::DuplicateUsername(username.to_string()));
        }
        info!(username, user_id = %user.id, "registered user");
        Ok(user.id)
    }

    /// Exact-match credential check. `None` means no user has this
    /// username and password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserId>, AppError> {
        let found = self.repo.find_user_by_credentials(username, password).await?;
        if found.is_none() {
            debug!(username, "authentication failed");
        }
        Ok(found)
    }

    /// Authenticate and make sure the user's savings record exists.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user_id = self
            .authenticate(username, password)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        self.ensure_savings(user_id).await?;
        self.get_user(user_id).await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        self.repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), AppError> {
        self.get_user(user_id).await.map(|_| ())
    }

    // ========================
    // Transactions
    // ========================

    /// Record a transaction and check its category against the budget.
    ///
    /// The insert and the budget check happen in one database transaction.
    /// The check is advisory: a failing check never blocks the insert.
    pub async fn add_transaction(
        &self,
        user_id: UserId,
        date: &str,
        category: &str,
        amount: &str,
        transaction_type: TransactionType,
    ) -> Result<TransactionOutcome, AppError> {
        let amount_cents = parse_amount(amount)?;
        if amount_cents < 0 {
            return Err(AppError::InvalidAmount(format!(
                "transaction amount must not be negative: {}",
                amount.trim()
            )));
        }
        self.require_user(user_id).await?;

        let mut transaction =
            Transaction::new(user_id, date, category, amount_cents, transaction_type);
        let overrun = self.repo.save_transaction_and_check(&mut transaction).await?;

        info!(
            user_id = %user_id,
            category,
            amount_cents,
            kind = %transaction_type,
            "recorded transaction"
        );
        if let Some(over) = &overrun {
            warn!(
                category = %over.category,
                budget_cents = over.budget_cents,
                total_expenses_cents = over.total_expenses_cents,
                "category over budget"
            );
        }

        Ok(TransactionOutcome {
            transaction,
            overrun,
        })
    }

    /// All of a user's transactions, oldest first.
    pub async fn list_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions(user_id).await?)
    }

    // ========================
    // Budgets
    // ========================

    /// Set the budget for a category, replacing any previous value.
    pub async fn set_category_budget(
        &self,
        user_id: UserId,
        category: &str,
        budget: &str,
    ) -> Result<CategoryBudget, AppError> {
        let budget_cents = parse_amount(budget)?;
        self.require_user(user_id).await?;

        let budget = CategoryBudget::new(user_id, category, budget_cents);
        self.repo.upsert_category_budget(&budget).await?;
        info!(user_id = %user_id, category, budget_cents, "set category budget");
        Ok(budget)
    }

    pub async fn get_category_budget(
        &self,
        user_id: UserId,
        category: &str,
    ) -> Result<Option<CategoryBudget>, AppError> {
        Ok(self.repo.get_category_budget(user_id, category).await?)
    }

    pub async fn list_category_budgets(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CategoryBudget>, AppError> {
        Ok(self.repo.list_category_budgets(user_id).await?)
    }

    /// Overrun info for one category, or `None` when it has no budget or is
    /// within it.
    pub async fn check_category_overrun(
        &self,
        user_id: UserId,
        category: &str,
    ) -> Result<Option<OverrunInfo>, AppError> {
        let Some(budget) = self.repo.get_category_budget(user_id, category).await? else {
            return Ok(None);
        };
        let total = self.repo.sum_expenses_for_category(user_id, category).await?;
        Ok(budget.evaluate(total))
    }

    /// Every budgeted category currently in overrun. Empty means no alerts.
    pub async fn check_all_budget_alerts(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OverrunInfo>, AppError> {
        let budgets = self.repo.list_category_budgets(user_id).await?;
        let mut alerts = Vec::new();

        for budget in budgets {
            let spent = self
                .repo
                .sum_expenses_for_category(user_id, &budget.category)
                .await?;
            alerts.extend(budget.evaluate(spent));
        }

        Ok(alerts)
    }

    /// Spending against every budgeted category.
    pub async fn budget_statuses(&self, user_id: UserId) -> Result<Vec<BudgetStatus>, AppError> {
        let budgets = self.repo.list_category_budgets(user_id).await?;
        let mut statuses = Vec::with_capacity(budgets.len());

        for budget in budgets {
            let spent = self
                .repo
                .sum_expenses_for_category(user_id, &budget.category)
                .await?;
            statuses.push(BudgetStatus {
                remaining: budget.budget_cents.saturating_sub(spent),
                is_overrun: spent > budget.budget_cents,
                spent,
                budget,
            });
        }

        Ok(statuses)
    }

    // ========================
    // Savings
    // ========================

    /// Create the zeroed savings record for a user if it does not exist yet.
    pub async fn ensure_savings(&self, user_id: UserId) -> Result<(), AppError> {
        self.require_user(user_id).await?;
        if self.repo.ensure_savings(user_id).await? {
            debug!(user_id = %user_id, "created savings record");
        }
        Ok(())
    }

    /// Overwrite the savings goal.
    pub async fn set_savings_goal(&self, user_id: UserId, goal: &str) -> Result<(), AppError> {
        let goal_cents = parse_amount(goal)?;
        if !self.repo.set_savings_goal(user_id, goal_cents).await? {
            return Err(self.missing_savings(user_id).await);
        }
        info!(user_id = %user_id, goal_cents, "set savings goal");
        Ok(())
    }

    /// Add to the saved amount. Negative deposits are accepted and reduce it.
    /// A deposit that would push the saved amount out of range is rejected
    /// and leaves it unchanged.
    pub async fn deposit_savings(&self, user_id: UserId, amount: &str) -> Result<(), AppError> {
        let amount_cents = parse_amount(amount)?;
        match self.repo.add_to_savings(user_id, amount_cents).await? {
            SavingsUpdate::Applied(saved_cents) => {
                info!(user_id = %user_id, amount_cents, saved_cents, "deposited savings");
                Ok(())
            }
            SavingsUpdate::NoRecord => Err(self.missing_savings(user_id).await),
            SavingsUpdate::OutOfRange => {
                debug!(user_id = %user_id, amount_cents, "deposit rejected: saved amount out of range");
                Err(AppError::InvalidAmount(format!(
                    "deposit of {} would put savings out of range",
                    amount.trim()
                )))
            }
        }
    }

    pub async fn get_savings(&self, user_id: UserId) -> Result<Savings, AppError> {
        match self.repo.get_savings(user_id).await? {
            Some(savings) => Ok(savings),
            None => Err(self.missing_savings(user_id).await),
        }
    }

    pub async fn savings_progress(&self, user_id: UserId) -> Result<SavingsProgress, AppError> {
        Ok(self.get_savings(user_id).await?.progress())
    }

    async fn missing_savings(&self, user_id: UserId) -> AppError {
        match self.repo.get_user(user_id).await {
            Ok(Some(_)) => AppError::SavingsNotFound(user_id),
            Ok(None) => AppError::UserNotFound(user_id),
            Err(err) => AppError::Database(err),
        }
    }

    // ========================
    // Reporting
    // ========================

    /// Summed expense amounts per category. Categories with no expenses are absent.
    pub async fn expenses_by_category(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<String, Cents>, AppError> {
        Ok(self.repo.expenses_by_category(user_id).await?)
    }

    /// Expense totals per category with their share of all expenses.
    pub async fn expense_breakdown(&self, user_id: UserId) -> Result<ExpenseReport, AppError> {
        let aggregates = self.repo.expense_aggregates(user_id).await?;
        let total = saturating_total(aggregates.iter().map(|agg| agg.total));

        let categories = aggregates
            .into_iter()
            .map(|agg| CategorySummary {
                percentage: percentage_of(agg.total, total),
                category: agg.category,
                total: agg.total,
                count: agg.count,
            })
            .collect();

        Ok(ExpenseReport { categories, total })
    }
}

fn parse_amount(input: &str) -> Result<Cents, AppError> {
    parse_cents(input).map_err(|e| AppError::InvalidAmount(e.to_string()))
}
