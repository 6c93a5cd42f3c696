//! Shared expenses, each participant's share of them, and the balances they create.

use std::collections::HashSet;

use rusqlite::{Connection, Row, Transaction as SqlTransaction, TransactionBehavior};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, UserID, database_id::SplitId, money::Money};

// ============================================================================
// MODELS
// ============================================================================

/// How much of a new split one participant owes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The user who owes this share.
    pub participant: UserID,
    /// How much they owe the payer. Never negative.
    pub amount: Money,
}

/// The data needed to create a split.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSplit {
    /// The user who paid the bill.
    pub payer: UserID,
    /// The full amount of the bill. Must equal the sum of the shares.
    pub total: Money,
    /// What the bill was for, e.g. "Dinner".
    pub description: String,
    /// Who owes what. The payer may be listed too, their share is never owed to anyone.
    pub shares: Vec<Allocation>,
}

/// One participant's share of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Share {
    /// The user who owes this share.
    pub participant: UserID,
    /// How much they owe the payer.
    pub amount: Money,
    /// Whether the participant has paid the payer back.
    pub settled: bool,
}

/// A bill paid by one user and shared between several.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    pub id: SplitId,
    pub payer: UserID,
    pub total: Money,
    pub description: String,
    pub created_at: OffsetDateTime,
    /// The shares in the order they were given when the split was created.
    pub shares: Vec<Share>,
}

// ============================================================================
// ARITHMETIC
// ============================================================================

/// Divide `total` into `count` shares that differ by at most one cent.
///
/// The leftover cents go one each to the first shares, so the shares always
/// add up to exactly `total`. Returns no shares when `count` is zero.
pub fn even_shares(total: Money, count: usize) -> Vec<Money> {
    let Ok(divisor) = i64::try_from(count) else {
        return Vec::new();
    };

    if divisor == 0 {
        return Vec::new();
    }

    let base = total.cents().div_euclid(divisor);
    let remainder = total.cents().rem_euclid(divisor);

    (0..divisor)
        .map(|index| Money::new(if index < remainder { base + 1 } else { base }))
        .collect()
}

/// Check that a split has a description, a positive total, distinct participants,
/// no negative shares, and shares that add up to exactly the total.
///
/// # Errors
/// Returns [Error::InvalidSplit] or [Error::SplitSharesMismatch] describing the first problem.
pub fn validate_split(split: &NewSplit) -> Result<(), Error> {
    if split.description.trim().is_empty() {
        return Err(Error::InvalidSplit(
            "the description cannot be empty".to_owned(),
        ));
    }

    if !split.total.is_positive() {
        return Err(Error::InvalidSplit(
            "the total must be greater than zero".to_owned(),
        ));
    }

    if split.shares.is_empty() {
        return Err(Error::InvalidSplit(
            "a split needs at least one participant".to_owned(),
        ));
    }

    if split.shares.iter().any(|share| share.amount.is_negative()) {
        return Err(Error::InvalidSplit("shares cannot be negative".to_owned()));
    }

    let mut participants = HashSet::with_capacity(split.shares.len());
    if !split
        .shares
        .iter()
        .all(|share| participants.insert(share.participant))
    {
        return Err(Error::InvalidSplit(
            "each participant can only appear once".to_owned(),
        ));
    }

    let shares_total = Money::checked_sum(split.shares.iter().map(|share| share.amount))
        .map_err(|_| Error::InvalidSplit("the shares are too large to add up".to_owned()))?;
    if shares_total != split.total {
        return Err(Error::SplitSharesMismatch {
            total: split.total,
            shares_total,
        });
    }

    Ok(())
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the split and split share tables.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_split_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS split (
                id INTEGER PRIMARY KEY,
                payer_id INTEGER NOT NULL,
                description TEXT NOT NULL,
                total INTEGER NOT NULL CHECK (total > 0),
                created_at TEXT NOT NULL,
                FOREIGN KEY(payer_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS split_share (
                split_id INTEGER NOT NULL,
                participant_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                amount INTEGER NOT NULL CHECK (amount >= 0),
                settled INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY(split_id, participant_id),
                FOREIGN KEY(split_id) REFERENCES split(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(participant_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_split_share_participant ON split_share(participant_id);",
        (),
    )?;

    Ok(())
}

/// Validate and store a split with all of its shares unsettled.
///
/// The split and its shares are written in one database transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidSplit] or [Error::SplitSharesMismatch] if the split is invalid,
/// - [Error::NotFound] if the payer or a participant is not a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_split(new_split: NewSplit, connection: &Connection) -> Result<Split, Error> {
    validate_split(&new_split)?;

    let map_foreign_key_error = |error: rusqlite::Error| match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::NotFound,
        error => error.into(),
    };

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;
    let created_at = OffsetDateTime::now_utc();
    let description = new_split.description.trim().to_owned();

    let id: SplitId = transaction
        .prepare(
            "INSERT INTO split (payer_id, description, total, created_at)
             VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )?
        .query_row(
            (
                new_split.payer.as_i64(),
                &description,
                new_split.total,
                created_at,
            ),
            |row| row.get(0),
        )
        .map_err(map_foreign_key_error)?;

    {
        let mut statement = transaction.prepare(
            "INSERT INTO split_share (split_id, participant_id, position, amount, settled)
             VALUES (?1, ?2, ?3, ?4, 0)",
        )?;

        for (position, share) in new_split.shares.iter().enumerate() {
            statement
                .execute((id, share.participant.as_i64(), position as i64, share.amount))
                .map_err(map_foreign_key_error)?;
        }
    }

    transaction.commit()?;

    Ok(Split {
        id,
        payer: new_split.payer,
        total: new_split.total,
        description,
        created_at,
        shares: new_split
            .shares
            .iter()
            .map(|allocation| Share {
                participant: allocation.participant,
                amount: allocation.amount,
                settled: false,
            })
            .collect(),
    })
}

/// Get a split and its shares.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the split does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_split(split_id: SplitId, connection: &Connection) -> Result<Split, Error> {
    let mut split = connection
        .prepare("SELECT id, payer_id, total, description, created_at FROM split WHERE id = ?1")?
        .query_row([split_id], map_split_row)?;

    split.shares = get_shares(split_id, connection)?;

    Ok(split)
}

/// Get the splits that `user_id` paid for or has a share in, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_splits(user_id: UserID, connection: &Connection) -> Result<Vec<Split>, Error> {
    let mut splits = connection
        .prepare(
            "SELECT id, payer_id, total, description, created_at FROM split
             WHERE payer_id = ?1
                OR id IN (SELECT split_id FROM split_share WHERE participant_id = ?1)
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map([user_id.as_i64()], map_split_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for split in &mut splits {
        split.shares = get_shares(split.id, connection)?;
    }

    Ok(splits)
}

fn get_shares(split_id: SplitId, connection: &Connection) -> Result<Vec<Share>, Error> {
    connection
        .prepare(
            "SELECT participant_id, amount, settled FROM split_share
             WHERE split_id = ?1 ORDER BY position",
        )?
        .query_map([split_id], |row| {
            Ok(Share {
                participant: UserID::new(row.get(0)?),
                amount: row.get(1)?,
                settled: row.get(2)?,
            })
        })?
        .map(|share_result| share_result.map_err(Error::from))
        .collect()
}

/// Mark the share of `participant` in `split_id` as settled.
///
/// Settling an already settled share does nothing.
///
/// # Errors
/// This function will return a:
/// - [Error::ShareNotFound] if `participant` has no share in the split,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn settle(split_id: SplitId, participant: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE split_share SET settled = 1 WHERE split_id = ?1 AND participant_id = ?2",
        (split_id, participant.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::ShareNotFound);
    }

    Ok(())
}

/// What `b` owes `a` across all unsettled shares, minus what `a` owes `b`.
///
/// A positive balance means `b` owes `a`. Swapping the users negates the balance.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn net_balance(a: UserID, b: UserID, connection: &Connection) -> Result<Money, Error> {
    if a == b {
        return Ok(Money::ZERO);
    }

    connection
        .query_row(
            "SELECT COALESCE(SUM(
                CASE WHEN s.payer_id = ?1 THEN sh.amount ELSE -sh.amount END
             ), 0)
             FROM split s
             INNER JOIN split_share sh ON sh.split_id = s.id
             WHERE sh.settled = 0
                AND ((s.payer_id = ?1 AND sh.participant_id = ?2)
                    OR (s.payer_id = ?2 AND sh.participant_id = ?1))",
            (a.as_i64(), b.as_i64()),
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// The net balance between `user_id` and everyone they share unsettled splits with.
///
/// A positive balance means the other user owes `user_id`. Users whose balance
/// is zero are left out.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_balances(user_id: UserID, connection: &Connection) -> Result<Vec<(UserID, Money)>, Error> {
    connection
        .prepare(
            "SELECT
                CASE WHEN s.payer_id = ?1 THEN sh.participant_id ELSE s.payer_id END AS other_id,
                SUM(CASE WHEN s.payer_id = ?1 THEN sh.amount ELSE -sh.amount END) AS balance
             FROM split s
             INNER JOIN split_share sh ON sh.split_id = s.id
             WHERE sh.settled = 0
                AND s.payer_id != sh.participant_id
                AND (s.payer_id = ?1 OR sh.participant_id = ?1)
             GROUP BY other_id
             HAVING balance != 0
             ORDER BY other_id",
        )?
        .query_map([user_id.as_i64()], |row| {
            Ok((UserID::new(row.get(0)?), row.get(1)?))
        })?
        .map(|balance_result| balance_result.map_err(Error::from))
        .collect()
}

fn map_split_row(row: &Row) -> Result<Split, rusqlite::Error> {
    Ok(Split {
        id: row.get(0)?,
        payer: UserID::new(row.get(1)?),
        total: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        shares: Vec::new(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
