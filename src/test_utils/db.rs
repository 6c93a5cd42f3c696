use rusqlite::Connection;

use crate::{
    PasswordHash, User, Username,
    auth::create_user,
    db::initialize,
};

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Insert a user whose password is not meant to be used for logging in.
#[track_caller]
pub(crate) fn create_test_user(username: &str, connection: &Connection) -> User {
    create_user(
        Username::new_unchecked(username),
        PasswordHash::new_unchecked("not-a-real-hash"),
        connection,
    )
    .expect("Could not create test user")
}
