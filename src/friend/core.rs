//! Friend requests and accepted friendships between users.

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error, UserID, Username,
    auth::get_user_by_id,
    database_id::FriendshipId,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a friend request has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
        }
    }
}

impl ToSql for FriendshipStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FriendshipStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(FriendshipStatus::Pending),
            "accepted" => Ok(FriendshipStatus::Accepted),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A friend request from `requester` to `recipient`.
///
/// The row is directed but the friendship, once accepted, applies both ways.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Friendship {
    pub id: FriendshipId,
    pub requester: UserID,
    pub recipient: UserID,
    pub status: FriendshipStatus,
    pub created_at: OffsetDateTime,
}

/// The other user in a friendship, from the point of view of the current user.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendEntry {
    /// The ID of the friendship row, used to accept incoming requests.
    pub friendship_id: FriendshipId,
    pub user_id: UserID,
    pub username: Username,
    pub created_at: OffsetDateTime,
}

/// A user's friends and pending requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Friendships {
    /// Accepted friendships in either direction.
    pub friends: Vec<FriendEntry>,
    /// Pending requests sent to the user.
    pub incoming: Vec<FriendEntry>,
    /// Pending requests the user sent.
    pub outgoing: Vec<FriendEntry>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the friendship table.
///
/// At most one row may exist for each pair of users, regardless of who sent the request.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_friendship_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS friendship (
                id INTEGER PRIMARY KEY,
                requester_id INTEGER NOT NULL,
                recipient_id INTEGER NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('pending', 'accepted')),
                created_at TEXT NOT NULL,
                CHECK (requester_id != recipient_id),
                FOREIGN KEY(requester_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(recipient_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_friendship_pair
            ON friendship(MIN(requester_id, recipient_id), MAX(requester_id, recipient_id))",
        (),
    )?;

    Ok(())
}

/// Send a friend request from `from` to `to`.
///
/// # Errors
/// This function will return a:
/// - [Error::SelfFriendRequest] if `from` and `to` are the same user,
/// - [Error::NotFound] if `to` is not a registered user,
/// - [Error::DuplicateFriendRequest] if a pending or accepted friendship already exists between
///   the two users, in either direction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn send_friend_request(
    from: UserID,
    to: UserID,
    connection: &Connection,
) -> Result<Friendship, Error> {
    if from == to {
        return Err(Error::SelfFriendRequest);
    }

    let recipient = get_user_by_id(to, connection)?;
    let duplicate_error = || Error::DuplicateFriendRequest(recipient.username.to_string());

    if get_friendship_between(from, to, connection)?.is_some() {
        return Err(duplicate_error());
    }

    connection
        .prepare(
            "INSERT INTO friendship (requester_id, recipient_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, requester_id, recipient_id, status, created_at",
        )?
        .query_row(
            (
                from.as_i64(),
                to.as_i64(),
                FriendshipStatus::Pending,
                OffsetDateTime::now_utc(),
            ),
            map_friendship_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                duplicate_error()
            }
            error => error.into(),
        })
}

/// Accept the pending friend request `request_id` sent to `caller`.
///
/// # Errors
/// This function will return a:
/// - [Error::FriendRequestNotFound] if the request does not exist, was not sent to `caller` or
///   has already been accepted,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn accept_friend_request(
    request_id: FriendshipId,
    caller: UserID,
    connection: &Connection,
) -> Result<Friendship, Error> {
    connection
        .prepare(
            "UPDATE friendship SET status = ?1
             WHERE id = ?2 AND recipient_id = ?3 AND status = ?4
             RETURNING id, requester_id, recipient_id, status, created_at",
        )?
        .query_row(
            (
                FriendshipStatus::Accepted,
                request_id,
                caller.as_i64(),
                FriendshipStatus::Pending,
            ),
            map_friendship_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::FriendRequestNotFound,
            error => error.into(),
        })
}

/// Get the friendship between two users, whoever sent the request.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_friendship_between(
    a: UserID,
    b: UserID,
    connection: &Connection,
) -> Result<Option<Friendship>, Error> {
    let result = connection
        .prepare(
            "SELECT id, requester_id, recipient_id, status, created_at FROM friendship
             WHERE (requester_id = ?1 AND recipient_id = ?2)
                OR (requester_id = ?2 AND recipient_id = ?1)",
        )?
        .query_row((a.as_i64(), b.as_i64()), map_friendship_row);

    match result {
        Ok(friendship) => Ok(Some(friendship)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Whether `a` and `b` have an accepted friendship.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn are_friends(a: UserID, b: UserID, connection: &Connection) -> Result<bool, Error> {
    Ok(get_friendship_between(a, b, connection)?
        .is_some_and(|friendship| friendship.status == FriendshipStatus::Accepted))
}

/// Get the friends and pending requests of `user_id`, each list sorted by username.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_friendships(user_id: UserID, connection: &Connection) -> Result<Friendships, Error> {
    let mut statement = connection.prepare(
        "SELECT f.id, f.requester_id, f.recipient_id, f.status, f.created_at, u.id, u.username
         FROM friendship f
         INNER JOIN user u
            ON u.id = CASE WHEN f.requester_id = ?1 THEN f.recipient_id ELSE f.requester_id END
         WHERE f.requester_id = ?1 OR f.recipient_id = ?1
         ORDER BY u.username COLLATE NOCASE",
    )?;

    let rows = statement.query_map([user_id.as_i64()], |row| {
        let friendship = map_friendship_row(row)?;
        let other_id = UserID::new(row.get(5)?);
        let other_username: String = row.get(6)?;

        Ok((
            friendship.status,
            friendship.requester == user_id,
            FriendEntry {
                friendship_id: friendship.id,
                user_id: other_id,
                username: Username::new_unchecked(&other_username),
                created_at: friendship.created_at,
            },
        ))
    })?;

    let mut friendships = Friendships::default();

    for row in rows {
        match row? {
            (FriendshipStatus::Accepted, _, entry) => friendships.friends.push(entry),
            (FriendshipStatus::Pending, true, entry) => friendships.outgoing.push(entry),
            (FriendshipStatus::Pending, false, entry) => friendships.incoming.push(entry),
        }
    }

    Ok(friendships)
}

fn map_friendship_row(row: &Row) -> Result<Friendship, rusqlite::Error> {
    Ok(Friendship {
        id: row.get(0)?,
        requester: UserID::new(row.get(1)?),
        recipient: UserID::new(row.get(2)?),
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
