//! Monthly budget limits per category and their comparison against spending.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error, UserID,
    money::Money,
    month::BudgetMonth,
    transaction::{CategoryName, Summary, summarize},
};

/// The most a user wants to spend on a category in a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Budget {
    pub user_id: UserID,
    pub category: CategoryName,
    pub month: BudgetMonth,
    pub limit: Money,
}

/// How much of a budget has been spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetStatus {
    pub category: CategoryName,
    pub limit: Money,
    /// The expense total for the category over the budget's month.
    pub spent: Money,
}

impl BudgetStatus {
    /// The amount left to spend, negative once the budget is exceeded.
    pub fn remaining(&self) -> Money {
        self.limit - self.spent
    }

    /// The fraction of the limit spent, e.g. 0.5 for half.
    ///
    /// A zero limit counts as fully used once anything is spent.
    pub fn fraction_used(&self) -> f64 {
        if self.limit == Money::ZERO {
            return if self.spent.is_positive() { 1.0 } else { 0.0 };
        }

        self.spent.cents() as f64 / self.limit.cents() as f64
    }

    /// Whether spending strictly exceeds the limit.
    pub fn is_over(&self) -> bool {
        self.spent > self.limit
    }
}

/// A category where spending exceeded the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overrun {
    pub category: CategoryName,
    pub limit: Money,
    pub spent: Money,
    /// How much more than the limit was spent.
    pub overage: Money,
}

/// Create the budget table.
///
/// A user has at most one budget per category and month.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                category TEXT NOT NULL,
                month TEXT NOT NULL,
                amount INTEGER NOT NULL CHECK (amount >= 0),
                UNIQUE(user_id, category, month),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Set the budget for `category` in `month`, replacing any previous limit.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `limit` is negative,
/// - [Error::NotFound] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn set_budget(
    user_id: UserID,
    category: CategoryName,
    month: BudgetMonth,
    limit: Money,
    connection: &Connection,
) -> Result<Budget, Error> {
    if limit.is_negative() {
        return Err(Error::InvalidAmount(limit.to_string()));
    }

    connection
        .prepare(
            "INSERT INTO budget (user_id, category, month, amount) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, category, month) DO UPDATE SET amount = excluded.amount
             RETURNING user_id, category, month, amount",
        )?
        .query_row((user_id.as_i64(), category, month, limit), map_budget_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })
}

/// Get the budgets of `user_id` for `month`, sorted by category.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_budgets(
    user_id: UserID,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT user_id, category, month, amount FROM budget
             WHERE user_id = ?1 AND month = ?2
             ORDER BY category",
        )?
        .query_map((user_id.as_i64(), month), map_budget_row)?
        .map(|budget_result| budget_result.map_err(Error::from))
        .collect()
}

/// Compare each budget with what was spent in its category.
pub fn compare_budgets(budgets: &[Budget], summary: &Summary) -> Vec<BudgetStatus> {
    budgets
        .iter()
        .map(|budget| BudgetStatus {
            category: budget.category.clone(),
            limit: budget.limit,
            spent: summary.expense_for(&budget.category),
        })
        .collect()
}

/// The statuses whose spending strictly exceeds the limit.
pub fn find_overruns(statuses: &[BudgetStatus]) -> Vec<Overrun> {
    statuses
        .iter()
        .filter(|status| status.is_over())
        .map(|status| Overrun {
            category: status.category.clone(),
            limit: status.limit,
            spent: status.spent,
            overage: status.spent - status.limit,
        })
        .collect()
}

/// Every budget of `user_id` for `month` with how much has been spent.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn budget_status(
    user_id: UserID,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<Vec<BudgetStatus>, Error> {
    let budgets = get_budgets(user_id, month, connection)?;

    if budgets.is_empty() {
        return Ok(Vec::new());
    }

    let (start, end) = month.date_range();
    let summary = summarize(user_id, start, end, connection)?;

    Ok(compare_budgets(&budgets, &summary))
}

/// The categories where `user_id` spent more than their budget in `month`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn check_overruns(
    user_id: UserID,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<Vec<Overrun>, Error> {
    let statuses = budget_status(user_id, month, connection)?;

    Ok(find_overruns(&statuses))
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        user_id: UserID::new(row.get(0)?),
        category: row.get(1)?,
        month: row.get(2)?,
        limit: row.get(3)?,
    })
}
