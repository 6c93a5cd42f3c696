//! Aggregates a user's transactions into income and expense totals.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{Error, UserID, money::Money, transaction::CategoryName};

/// Income and expenses for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    /// Sum of the positive amounts.
    pub income: Money,
    /// Sum of the negative amounts as a positive magnitude.
    pub expense: Money,
}

impl CategoryTotals {
    /// Income minus expenses.
    pub fn net(&self) -> Money {
        self.income - self.expense
    }
}

/// The totals of a user's transactions over a period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Inclusive start of the period.
    pub start: Option<Date>,
    /// Exclusive end of the period.
    pub end: Option<Date>,
    /// Total income.
    pub income: Money,
    /// Total expenses as a positive magnitude.
    pub expense: Money,
    /// The totals for each category that has a transaction in the period.
    pub by_category: BTreeMap<CategoryName, CategoryTotals>,
}

impl Summary {
    /// Income minus expenses.
    pub fn net(&self) -> Money {
        self.income - self.expense
    }

    /// The expense total for `category`, zero if nothing was spent.
    pub fn expense_for(&self, category: &CategoryName) -> Money {
        self.by_category
            .get(category)
            .map(|totals| totals.expense)
            .unwrap_or_default()
    }
}

/// Summarize the transactions of `user_id` with `start <= date < end`.
///
/// # Errors
/// This function will return a:
/// - [Error::AmountOverflow] if the totals do not fit in 64 bits of cents,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn summarize(
    user_id: UserID,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Summary, Error> {
    let mut statement = connection.prepare(
        "SELECT category,
            COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END), 0)
         FROM \"transaction\"
         WHERE user_id = ?1 AND date >= ?2 AND date < ?3
         GROUP BY category",
    )?;

    let rows = statement.query_map((user_id.as_i64(), start, end), |row| {
        Ok((
            row.get::<_, CategoryName>(0)?,
            CategoryTotals {
                income: row.get(1)?,
                expense: row.get(2)?,
            },
        ))
    })?;

    let mut summary = Summary {
        start: Some(start),
        end: Some(end),
        ..Default::default()
    };

    for row in rows {
        let (category, totals) = row?;
        summary.income = summary
            .income
            .checked_add(totals.income)
            .ok_or(Error::AmountOverflow)?;
        summary.expense = summary
            .expense
            .checked_add(totals.expense)
            .ok_or(Error::AmountOverflow)?;
        summary.by_category.insert(category, totals);
    }

    Ok(summary)
}

#[cfg(test)]
mod summarize_tests {
    use rusqlite::Connection;
    use time::{Date, macros::date};

    use crate::{
        Error, UserID,
        money::Money,
        test_utils::{create_test_user, get_test_connection},
        transaction::{CategoryName, NewTransaction, create_transaction},
    };

    use super::{CategoryTotals, summarize};

    fn record(user_id: UserID, cents: i64, category: &str, date: Date, conn: &Connection) {
        create_transaction(
            user_id,
            NewTransaction {
                amount: Money::new(cents),
                category: CategoryName::new_unchecked(category),
                date,
                note: None,
            },
            conn,
        )
        .expect("Could not create transaction");
    }

    #[test]
    fn totals_income_expense_and_categories() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        record(user.id, 500_000, "Salary", date!(2025 - 10 - 01), &conn);
        record(user.id, -12_050, "Food", date!(2025 - 10 - 02), &conn);
        record(user.id, -2_000, "Food", date!(2025 - 10 - 03), &conn);
        record(user.id, 1_000, "Food", date!(2025 - 10 - 04), &conn);

        let summary = summarize(user.id, date!(2025 - 10 - 01), date!(2025 - 11 - 01), &conn)
            .expect("Could not summarize");

        assert_eq!(summary.income, Money::new(501_000));
        assert_eq!(summary.expense, Money::new(14_050));
        assert_eq!(summary.net(), Money::new(486_950));
        let food = summary.by_category[&CategoryName::new_unchecked("Food")];
        assert_eq!(
            food,
            CategoryTotals {
                income: Money::new(1_000),
                expense: Money::new(14_050),
            }
        );
        assert_eq!(food.net(), Money::new(-13_050));
    }

    #[test]
    fn period_includes_start_and_excludes_end() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        record(user.id, -1, "Food", date!(2025 - 09 - 30), &conn);
        record(user.id, -10, "Food", date!(2025 - 10 - 01), &conn);
        record(user.id, -100, "Food", date!(2025 - 10 - 31), &conn);
        record(user.id, -1_000, "Food", date!(2025 - 11 - 01), &conn);

        let summary =
            summarize(user.id, date!(2025 - 10 - 01), date!(2025 - 11 - 01), &conn).unwrap();

        assert_eq!(summary.expense, Money::new(110));
    }

    #[test]
    fn ignores_other_users() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        record(bob.id, -999, "Food", date!(2025 - 10 - 02), &conn);

        let summary =
            summarize(alice.id, date!(2025 - 10 - 01), date!(2025 - 11 - 01), &conn).unwrap();

        assert_eq!(summary.expense, Money::ZERO);
        assert!(summary.by_category.is_empty());
    }

    #[test]
    fn expense_for_missing_category_is_zero() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);

        let summary =
            summarize(user.id, date!(2025 - 10 - 01), date!(2025 - 11 - 01), &conn).unwrap();

        assert_eq!(
            summary.expense_for(&CategoryName::new_unchecked("Food")),
            Money::ZERO
        );
    }

    #[test]
    fn reports_totals_too_large_to_add() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        record(user.id, i64::MAX, "A", date!(2025 - 10 - 02), &conn);
        record(user.id, i64::MAX, "B", date!(2025 - 10 - 03), &conn);

        let result = summarize(user.id, date!(2025 - 10 - 01), date!(2025 - 11 - 01), &conn);

        assert_eq!(result, Err(Error::AmountOverflow));
    }
}
