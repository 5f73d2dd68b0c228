use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::domain::{format_cents, OverrunInfo, TransactionType, User};
use crate::io::Exporter;

/// Pennywise - personal income, expense, budget and savings tracker
#[derive(Parser)]
#[command(name = "pennywise")]
#[command(about = "Track income and expenses, category budgets and a savings goal")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "PENNYWISE_DB", default_value = "pennywise.db")]
    pub database: String,

    /// Username to act as
    #[arg(short, long, env = "PENNYWISE_USER", global = true)]
    pub user: Option<String>,

    /// Password for --user
    #[arg(short, long, env = "PENNYWISE_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Create a user account
    Register {
        /// Username (must be unique)
        username: String,

        /// Password for the new account
        #[arg(long = "new-password")]
        new_password: String,

        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },

    #[command(flatten)]
    Account(AccountCommands),
}

/// Commands that act as a logged-in user
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Check credentials and show the current user
    Whoami,

    /// Record and list transactions
    #[command(subcommand)]
    Tx(TxCommands),

    /// Category budgets and overrun alerts
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Savings goal and deposits
    #[command(subcommand)]
    Savings(SavingsCommands),

    /// Expense reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export your data to CSV or JSON
    Export {
        /// What to export: transactions, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction
    Add {
        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Category label (matched exactly against budgets)
        #[arg(short, long)]
        category: String,

        /// Transaction type: expense, income
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,

        /// Date of the transaction (free text, defaults to today as YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// List transactions, oldest first
    List {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set (or replace) a category budget
    Set {
        /// Category to limit
        category: String,

        /// Budget amount (e.g., "400" or "400.00")
        amount: String,
    },

    /// Show the budget for one category
    Show {
        category: String,
    },

    /// List budgets with spending against each
    List,

    /// Show every category over budget
    Alerts,

    /// Check a single category for overrun
    Check {
        category: String,
    },
}

#[derive(Subcommand)]
pub enum SavingsCommands {
    /// Set the savings goal (replaces the previous goal)
    Goal {
        amount: String,
    },

    /// Add to the saved amount
    Deposit {
        /// Amount to add (negative values withdraw)
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Show progress towards the goal
    Progress,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Expenses by category
    Expenses {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let Cli {
            database,
            user,
            password,
            command,
            ..
        } = self;

        match command {
            Commands::Init => {
                LedgerService::init(&database).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Register {
                username,
                new_password,
                confirm,
            } => {
                if new_password != confirm {
                    anyhow::bail!("Passwords do not match");
                }
                let service = LedgerService::connect(&database).await?;
                service.register(&username, &new_password).await?;
                println!("Registered user: {}", username);
            }

            Commands::Account(cmd) => {
                let service = LedgerService::connect(&database).await?;
                let current = login(&service, user.as_deref(), password.as_deref()).await?;
                run_account_command(&service, &current, cmd).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(
    service: &LedgerService,
    user: &User,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Whoami => println!("{} ({})", user.username, user.id),
        AccountCommands::Tx(cmd) => run_tx_command(service, user, cmd).await?,
        AccountCommands::Budget(cmd) => run_budget_command(service, user, cmd).await?,
        AccountCommands::Savings(cmd) => run_savings_command(service, user, cmd).await?,
        AccountCommands::Report(cmd) => run_report_command(service, user, cmd).await?,
        AccountCommands::Export {
            export_type,
            output,
        } => run_export_command(service, user, &export_type, output.as_deref()).await?,
    }
    Ok(())
}

async fn login(
    service: &LedgerService,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<User> {
    let (Some(username), Some(password)) = (username, password) else {
        anyhow::bail!(
            "Missing credentials: pass --user and --password or set PENNYWISE_USER and PENNYWISE_PASSWORD"
        );
    };
    Ok(service.login(username, password).await?)
}

async fn run_tx_command(service: &LedgerService, user: &User, cmd: TxCommands) -> Result<()> {
    match cmd {
        TxCommands::Add {
            amount,
            category,
            kind,
            date,
        } => {
            let transaction_type: TransactionType = kind.parse().map_err(|e| {
                anyhow::anyhow!("Invalid type '{}'. Valid types: expense, income. Error: {}", kind, e)
            })?;
            let date = date.unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

            let outcome = service
                .add_transaction(user.id, &date, &category, &amount, transaction_type)
                .await?;

            println!(
                "Recorded {}: {} {} on {} ({})",
                outcome.transaction.transaction_type,
                format_cents(outcome.transaction.amount_cents),
                outcome.transaction.category,
                outcome.transaction.date,
                outcome.transaction.id
            );
            if let Some(overrun) = outcome.overrun {
                print_overrun(&overrun);
            }
        }

        TxCommands::List { format } => {
            let transactions = service.list_transactions(user.id).await?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&transactions)?),
                _ => {
                    if transactions.is_empty() {
                        println!("No transactions found.");
                    } else {
                        println!("{:<12} {:<20} {:>12} {:<8}", "DATE", "CATEGORY", "AMOUNT", "TYPE");
                        println!("{}", "-".repeat(55));
                        for tx in transactions {
                            println!(
                                "{:<12} {:<20} {:>12} {:<8}",
                                truncate(&tx.date, 12),
                                truncate(&tx.category, 20),
                                format_cents(tx.amount_cents),
                                tx.transaction_type
                            );
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

async fn run_budget_command(
    service: &LedgerService,
    user: &User,
    cmd: BudgetCommands,
) -> Result<()> {
    match cmd {
        BudgetCommands::Set { category, amount } => {
            let budget = service
                .set_category_budget(user.id, &category, &amount)
                .await?;
            println!(
                "Budget for '{}' set to {}",
                budget.category,
                format_cents(budget.budget_cents)
            );
        }

        BudgetCommands::Show { category } => {
            match service.get_category_budget(user.id, &category).await? {
                Some(budget) => println!(
                    "{}: {} (updated {})",
                    budget.category,
                    format_cents(budget.budget_cents),
                    budget.updated_at.format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("No budget set for '{}'.", category),
            }
        }

        BudgetCommands::List => {
            let statuses = service.budget_statuses(user.id).await?;
            if statuses.is_empty() {
                println!("No budgets found.");
            } else {
                println!(
                    "{:<20} {:>12} {:>12} {:>12}",
                    "CATEGORY", "BUDGET", "SPENT", "REMAINING"
                );
                println!("{}", "-".repeat(60));
                for status in statuses {
                    println!(
                        "{:<20} {:>12} {:>12} {:>12}{}",
                        truncate(&status.budget.category, 20),
                        format_cents(status.budget.budget_cents),
                        format_cents(status.spent),
                        format_cents(status.remaining),
                        if status.is_overrun { "  !" } else { "" }
                    );
                }
            }
        }

        BudgetCommands::Alerts => {
            let alerts = service.check_all_budget_alerts(user.id).await?;
            if alerts.is_empty() {
                println!("You're within all category budgets.");
            } else {
                for overrun in &alerts {
                    print_overrun(overrun);
                }
            }
        }

        BudgetCommands::Check { category } => {
            match service.check_category_overrun(user.id, &category).await? {
                Some(overrun) => print_overrun(&overrun),
                None => println!("'{}' is not over budget.", category),
            }
        }
    }
    Ok(())
}

async fn run_savings_command(
    service: &LedgerService,
    user: &User,
    cmd: SavingsCommands,
) -> Result<()> {
    match cmd {
        SavingsCommands::Goal { amount } => {
            service.set_savings_goal(user.id, &amount).await?;
            println!("Savings goal set.");
        }

        SavingsCommands::Deposit { amount } => {
            service.deposit_savings(user.id, &amount).await?;
            let savings = service.get_savings(user.id).await?;
            println!("Savings updated. Saved: {}", format_cents(savings.saved_cents));
        }

        SavingsCommands::Progress => {
            let progress = service.savings_progress(user.id).await?;
            println!("Goal:     {}", format_cents(progress.goal_cents));
            println!("Saved:    {}", format_cents(progress.saved_cents));
            println!("Progress: {:.2}%", progress.progress_percent);
        }
    }
    Ok(())
}

async fn run_report_command(
    service: &LedgerService,
    user: &User,
    cmd: ReportCommands,
) -> Result<()> {
    match cmd {
        ReportCommands::Expenses { format } => {
            let report = service.expense_breakdown(user.id).await?;
            if report.is_empty() {
                println!("No expense data available.");
                return Ok(());
            }

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&report)?),
                _ => {
                    println!(
                        "{:<20} {:>12} {:>6} {:>8}  ",
                        "CATEGORY", "TOTAL", "COUNT", "SHARE"
                    );
                    println!("{}", "-".repeat(72));
                    for summary in &report.categories {
                        println!(
                            "{:<20} {:>12} {:>6} {:>7.1}%  {}",
                            truncate(&summary.category, 20),
                            format_cents(summary.total),
                            summary.count,
                            summary.percentage,
                            bar(summary.percentage, 20)
                        );
                    }
                    println!("{}", "-".repeat(72));
                    println!("{:<20} {:>12}", "TOTAL", format_cents(report.total));
                }
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    user: &User,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(user.id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(user.id, writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported {} transactions and {} budgets",
                    snapshot.transactions.len(),
                    snapshot.budgets.len()
                );
            }
        }
        other => anyhow::bail!(
            "Unknown export type '{}'. Valid types: transactions, full",
            other
        ),
    }
    Ok(())
}

fn print_overrun(overrun: &OverrunInfo) {
    println!(
        "Budget alert: '{}' exceeded its budget (budget {}, expenses {}, over by {})",
        overrun.category,
        format_cents(overrun.budget_cents),
        format_cents(overrun.total_expenses_cents),
        format_cents(overrun.excess())
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Horizontal bar for a percentage, `width` cells at 100%.
fn bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage / 100.0) * width as f64).round() as usize;
    "#".repeat(filled.min(width))
}
