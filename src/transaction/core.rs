//! Defines the core data models and database queries for transactions.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, Value, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, UserID, database_id::TransactionId, money::Money};

// ============================================================================
// MODELS
// ============================================================================

/// A validated, non-empty category label, e.g. "Groceries".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategory] if `name` is empty or only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategory)
        } else {
            Ok(Self(name.to_owned()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for CategoryName {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for CategoryName {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(Self)
    }
}

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Apply the sign for this kind to a non-negative `amount`.
    pub fn signed(self, amount: Money) -> Money {
        match self {
            TransactionKind::Income => amount.abs(),
            TransactionKind::Expense => -amount.abs(),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    /// Positive for income, negative for expenses.
    pub amount: Money,
    /// What the money was spent on or where it came from.
    pub category: CategoryName,
    /// When the transaction happened.
    pub date: Date,
    /// An optional free text note.
    pub note: Option<String>,
}

/// The data needed to record a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Positive for income, negative for expenses.
    pub amount: Money,
    /// What the money was spent on or where it came from.
    pub category: CategoryName,
    /// When the transaction happened.
    pub date: Date,
    /// An optional free text note.
    pub note: Option<String>,
}

/// Restricts which transactions [get_transactions] returns.
///
/// The default filter matches every transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Inclusive start date.
    pub start: Option<Date>,
    /// Exclusive end date.
    pub end: Option<Date>,
    /// Only include these categories. Empty means all categories.
    pub categories: Vec<CategoryName>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Record a transaction for `user_id`.
///
/// Blank notes are stored as `NULL`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    user_id: UserID,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let note = new_transaction
        .note
        .map(|note| note.trim().to_owned())
        .filter(|note| !note.is_empty());

    connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, amount, category, date, note)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, user_id, amount, category, date, note",
        )?
        .query_row(
            (
                user_id.as_i64(),
                new_transaction.amount,
                new_transaction.category,
                new_transaction.date,
                note,
            ),
            map_transaction_row,
        )
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

/// Get the transactions of `user_id` that match `filter`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut query = String::from(
        "SELECT id, user_id, amount, category, date, note FROM \"transaction\" WHERE user_id = ?",
    );
    let mut params = vec![Value::Integer(user_id.as_i64())];

    if let Some(start) = filter.start {
        query.push_str(" AND date >= ?");
        params.push(Value::Text(start.to_string()));
    }

    if let Some(end) = filter.end {
        query.push_str(" AND date < ?");
        params.push(Value::Text(end.to_string()));
    }

    if !filter.categories.is_empty() {
        let placeholders = vec!["?"; filter.categories.len()].join(", ");
        query.push_str(&format!(" AND category IN ({placeholders})"));
        params.extend(
            filter
                .categories
                .iter()
                .map(|category| Value::Text(category.as_ref().to_owned())),
        );
    }

    query.push_str(" ORDER BY date DESC, id DESC");

    connection
        .prepare(&query)?
        .query_map(rusqlite::params_from_iter(params), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Get the distinct categories that `user_id` has used, sorted alphabetically.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<CategoryName>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT category FROM \"transaction\" WHERE user_id = ?1 ORDER BY category",
        )?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .map(|category_result| category_result.map_err(Error::from))
        .collect()
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                amount INTEGER NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                note TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Used by the summaries, budgets and the transactions page.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let amount = row.get(2)?;
    let category = row.get(3)?;
    let date = row.get(4)?;
    let note = row.get(5)?;

    Ok(Transaction {
        id,
        user_id,
        amount,
        category,
        date,
        note,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use time::macros::date;

    use crate::{
        Error, UserID,
        money::Money,
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{
        CategoryName, NewTransaction, TransactionFilter, TransactionKind, create_transaction,
        get_categories, get_transactions,
    };

    fn new_transaction(cents: i64, category: &str, date: time::Date) -> NewTransaction {
        NewTransaction {
            amount: Money::new(cents),
            category: CategoryName::new_unchecked(category),
            date,
            note: None,
        }
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);

        let transaction = create_transaction(
            user.id,
            NewTransaction {
                note: Some("  weekly shop ".to_owned()),
                ..new_transaction(-4599, "Groceries", date!(2025 - 10 - 05))
            },
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.id, 1);
        assert_eq!(transaction.user_id, user.id);
        assert_eq!(transaction.amount, Money::new(-4599));
        assert_eq!(transaction.category.as_ref(), "Groceries");
        assert_eq!(transaction.note.as_deref(), Some("weekly shop"));
    }

    #[test]
    fn create_stores_blank_note_as_none() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);

        let transaction = create_transaction(
            user.id,
            NewTransaction {
                note: Some("   ".to_owned()),
                ..new_transaction(100, "Salary", date!(2025 - 10 - 05))
            },
            &conn,
        )
        .unwrap();

        assert_eq!(transaction.note, None);
    }

    #[test]
    fn create_fails_on_unknown_user() {
        let conn = get_test_connection();

        let result = create_transaction(
            UserID::new(42),
            new_transaction(100, "Salary", date!(2025 - 10 - 05)),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn kind_sets_sign() {
        let amount = Money::new(1234);

        assert_eq!(TransactionKind::Income.signed(amount), Money::new(1234));
        assert_eq!(TransactionKind::Expense.signed(amount), Money::new(-1234));
        assert_eq!(TransactionKind::Income.signed(-amount), Money::new(1234));
    }

    #[test]
    fn get_transactions_returns_only_own_transactions_newest_first() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        create_transaction(alice.id, new_transaction(-100, "Food", date!(2025 - 10 - 01)), &conn)
            .unwrap();
        create_transaction(alice.id, new_transaction(-200, "Rent", date!(2025 - 10 - 03)), &conn)
            .unwrap();
        create_transaction(bob.id, new_transaction(-300, "Food", date!(2025 - 10 - 02)), &conn)
            .unwrap();

        let got = get_transactions(alice.id, &TransactionFilter::default(), &conn).unwrap();

        let got_amounts: Vec<_> = got.iter().map(|transaction| transaction.amount).collect();
        assert_eq!(got_amounts, [Money::new(-200), Money::new(-100)]);
    }

    #[test]
    fn get_transactions_applies_half_open_date_range_and_categories() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        for (cents, category, date) in [
            (-1, "Food", date!(2025 - 09 - 30)),
            (-2, "Food", date!(2025 - 10 - 01)),
            (-3, "Rent", date!(2025 - 10 - 15)),
            (-4, "Fuel", date!(2025 - 10 - 20)),
            (-5, "Food", date!(2025 - 11 - 01)),
        ] {
            create_transaction(user.id, new_transaction(cents, category, date), &conn).unwrap();
        }
        let filter = TransactionFilter {
            start: Some(date!(2025 - 10 - 01)),
            end: Some(date!(2025 - 11 - 01)),
            categories: vec![
                CategoryName::new_unchecked("Food"),
                CategoryName::new_unchecked("Rent"),
            ],
        };

        let got = get_transactions(user.id, &filter, &conn).unwrap();

        let got_amounts: Vec<_> = got.iter().map(|transaction| transaction.amount).collect();
        assert_eq!(got_amounts, [Money::new(-3), Money::new(-2)]);
    }

    #[test]
    fn get_categories_is_distinct_and_sorted() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        for category in ["Rent", "Food", "Rent", "Bills"] {
            create_transaction(
                user.id,
                new_transaction(-1, category, date!(2025 - 10 - 01)),
                &conn,
            )
            .unwrap();
        }

        let got = get_categories(user.id, &conn).unwrap();

        assert_eq!(
            got,
            ["Bills", "Food", "Rent"].map(CategoryName::new_unchecked)
        );
    }
}
