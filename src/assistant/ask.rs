//! Answers a user's question about their finances.

use std::sync::Mutex;

use rusqlite::Connection;
use time::Date;

use crate::{
    Error, UserID,
    assistant::{
        CompletionService,
        prompt::{SYSTEM_PROMPT, build_snapshot, build_user_prompt},
    },
};

/// Ask the completion service `question` with a snapshot of the finances of `user_id`.
///
/// The database lock is released before the completion service is called.
/// The reply is returned as is.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyQuestion] if `question` is blank,
/// - [Error::DatabaseLockError] or [Error::SqlError] if the snapshot cannot be read,
/// - or [Error::ExternalService] if the completion service fails.
pub async fn ask(
    user_id: UserID,
    question: &str,
    today: Date,
    db_connection: &Mutex<Connection>,
    service: &dyn CompletionService,
) -> Result<String, Error> {
    let question = question.trim();

    if question.is_empty() {
        return Err(Error::EmptyQuestion);
    }

    let user_prompt = {
        let connection = db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let snapshot = build_snapshot(user_id, today, &connection)?;
        build_user_prompt(&snapshot, question)?
    };

    service.complete(SYSTEM_PROMPT, &user_prompt).await
}
