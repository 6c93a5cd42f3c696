//! Creates the application's tables in a SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, auth::create_user_table, budget::create_budget_table,
    friend::create_friendship_table, split::create_split_tables,
    transaction::create_transaction_table,
};

/// Create all tables if they do not exist and turn on foreign key checks.
///
/// The tables are created in one exclusive transaction so that a partially
/// initialized database is never left behind.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_friendship_table(&transaction)?;
    create_split_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}
