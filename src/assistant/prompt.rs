//! Builds the prompt sent to the completion API from a snapshot of the user's finances.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, Duration};

use crate::{
    Error, UserID,
    budget::{BudgetStatus, budget_status},
    money::Money,
    month::BudgetMonth,
    transaction::{CategoryTotals, Summary, summarize},
};

/// Instructions sent as the system message with every question.
pub const SYSTEM_PROMPT: &str = "You are a personal finance assistant. \
    Answer the user's question using only the JSON snapshot of their finances \
    that comes before the question. Expenses are shown as positive amounts. \
    Keep answers short and avoid markdown formatting. \
    If the snapshot does not contain enough information to answer, say so.";

/// How many days, including today, the recent period covers.
const RECENT_DAYS: i64 = 30;

/// Income and expenses over a period.
#[derive(Debug, Serialize)]
pub struct PeriodSnapshot {
    pub first_day: String,
    pub last_day: String,
    pub income: String,
    pub expenses: String,
    pub net: String,
    pub expenses_by_category: BTreeMap<String, String>,
    pub income_by_category: BTreeMap<String, String>,
}

impl PeriodSnapshot {
    fn new(summary: &Summary, first_day: Date, end: Date) -> Self {
        let last_day = end.previous_day().unwrap_or(end);

        Self {
            first_day: first_day.to_string(),
            last_day: last_day.to_string(),
            income: summary.income.to_string(),
            expenses: summary.expense.to_string(),
            net: summary.net().to_string(),
            expenses_by_category: by_category(summary, |totals| totals.expense),
            income_by_category: by_category(summary, |totals| totals.income),
        }
    }
}

fn by_category(summary: &Summary, pick: fn(&CategoryTotals) -> Money) -> BTreeMap<String, String> {
    summary
        .by_category
        .iter()
        .filter(|(_, totals)| pick(totals).is_positive())
        .map(|(category, totals)| (category.to_string(), pick(totals).to_string()))
        .collect()
}

/// One budget for the current month.
#[derive(Debug, Serialize)]
pub struct BudgetSnapshot {
    pub category: String,
    pub limit: String,
    pub spent: String,
    pub remaining: String,
    pub over_budget: bool,
}

impl From<&BudgetStatus> for BudgetSnapshot {
    fn from(status: &BudgetStatus) -> Self {
        Self {
            category: status.category.to_string(),
            limit: status.limit.to_string(),
            spent: status.spent.to_string(),
            remaining: status.remaining().to_string(),
            over_budget: status.is_over(),
        }
    }
}

/// What the assistant is told about the user's finances.
#[derive(Debug, Serialize)]
pub struct FinanceSnapshot {
    pub today: String,
    pub current_month: PeriodSnapshot,
    pub last_30_days: PeriodSnapshot,
    pub budgets: Vec<BudgetSnapshot>,
}

/// Gather the current month's and the last 30 days' totals and the current
/// month's budgets for `user_id`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn build_snapshot(
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<FinanceSnapshot, Error> {
    let month = BudgetMonth::containing(today);
    let (month_start, month_end) = month.date_range();
    let current_month = summarize(user_id, month_start, month_end, connection)?;

    let recent_end = today.next_day().unwrap_or(today);
    let recent_start = today
        .checked_sub(Duration::days(RECENT_DAYS - 1))
        .unwrap_or(today);
    let last_30_days = summarize(user_id, recent_start, recent_end, connection)?;

    let budgets = budget_status(user_id, month, connection)?;

    Ok(FinanceSnapshot {
        today: today.to_string(),
        current_month: PeriodSnapshot::new(&current_month, month_start, month_end),
        last_30_days: PeriodSnapshot::new(&last_30_days, recent_start, recent_end),
        budgets: budgets.iter().map(BudgetSnapshot::from).collect(),
    })
}

/// The user message: the snapshot as JSON followed by the question.
///
/// # Errors
/// Returns [Error::ExternalService] if the snapshot cannot be serialized.
pub fn build_user_prompt(snapshot: &FinanceSnapshot, question: &str) -> Result<String, Error> {
    let snapshot_json = serde_json::to_string_pretty(snapshot)
        .map_err(|error| Error::ExternalService(format!("could not serialize snapshot: {error}")))?;

    Ok(format!(
        "Snapshot of my finances:\n{snapshot_json}\n\nQuestion: {question}"
    ))
}

#[cfg(test)]
mod tests {
    use time::{Month, macros::date};

    use crate::{
        budget::set_budget,
        money::Money,
        month::BudgetMonth,
        test_utils::{create_test_user, get_test_connection},
        transaction::{CategoryName, NewTransaction, create_transaction},
    };

    use super::{build_snapshot, build_user_prompt};

    #[test]
    fn snapshot_covers_month_recent_days_and_budgets() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        for (cents, category, date) in [
            (-4_500, "Food", date!(2025 - 10 - 02)),
            (-1_000, "Food", date!(2025 - 09 - 20)),
            (-9_999, "Travel", date!(2025 - 09 - 01)),
            (300_000, "Salary", date!(2025 - 10 - 01)),
            (-500, "Food", date!(2025 - 10 - 11)),
        ] {
            create_transaction(
                user.id,
                NewTransaction {
                    amount: Money::new(cents),
                    category: CategoryName::new_unchecked(category),
                    date,
                    note: None,
                },
                &conn,
            )
            .unwrap();
        }
        set_budget(
            user.id,
            CategoryName::new_unchecked("Food"),
            BudgetMonth::new(2025, Month::October),
            Money::new(4_000),
            &conn,
        )
        .unwrap();

        let snapshot = build_snapshot(user.id, date!(2025 - 10 - 10), &conn).unwrap();

        assert_eq!(snapshot.today, "2025-10-10");
        assert_eq!(snapshot.current_month.first_day, "2025-10-01");
        assert_eq!(snapshot.current_month.last_day, "2025-10-31");
        assert_eq!(snapshot.current_month.expenses, "$50.00");
        assert_eq!(snapshot.current_month.income, "$3000.00");
        assert_eq!(snapshot.last_30_days.first_day, "2025-09-11");
        assert_eq!(snapshot.last_30_days.last_day, "2025-10-10");
        assert_eq!(snapshot.last_30_days.expenses, "$55.00");
        assert_eq!(
            snapshot.last_30_days.expenses_by_category.get("Food"),
            Some(&"$55.00".to_owned())
        );
        assert_eq!(snapshot.budgets.len(), 1);
        assert!(snapshot.budgets[0].over_budget);
        assert_eq!(snapshot.budgets[0].remaining, "-$10.00");
    }

    #[test]
    fn prompt_contains_snapshot_and_question() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        let snapshot = build_snapshot(user.id, date!(2025 - 10 - 10), &conn).unwrap();

        let prompt = build_user_prompt(&snapshot, "What did I spend on food?").unwrap();

        assert!(prompt.contains("\"current_month\""));
        assert!(prompt.contains("\"last_30_days\""));
        assert!(prompt.ends_with("Question: What did I spend on food?"));
    }
}
