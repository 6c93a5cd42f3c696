//! A web app for tracking personal finances.
//!
//! Users record income and expenses, set monthly budgets per category, split
//! bills with friends and ask an assistant backed by an external completion
//! API about their spending.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod assistant;
mod auth;
mod budget;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod friend;
mod html;
mod internal_server_error;
mod logging;
mod money;
mod month;
mod navigation;
mod not_found;
mod routing;
mod split;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use assistant::{CompletionService, OpenAiClient};
pub use auth::{PasswordHash, User, UserID, Username, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use money::Money;
pub use routing::build_router;

/// Functions used by the command line tools that ship with the server.
pub mod cli {
    pub use crate::{
        auth::{create_user, get_user_by_username, update_password},
        budget::set_budget,
        friend::{accept_friend_request, send_friend_request},
        month::BudgetMonth,
        split::{Allocation, NewSplit, create_split},
        transaction::{CategoryName, NewTransaction, create_transaction},
    };
}

use crate::{alert::Alert, internal_server_error::InternalServerError};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The broad categories that every [Error] falls into.
///
/// Handlers use the kind to pick the HTTP status code of the alert shown to
/// the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, e.g. a non-numeric amount.
    Validation,
    /// The record already exists.
    Duplicate,
    /// A referenced user, request, split or share does not exist.
    NotFound,
    /// The completion API failed or timed out.
    ExternalService,
    /// The database or another internal resource failed.
    Persistence,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The amount could not be parsed as a number with at most two decimal places.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// Adding up amounts gave a total too large to represent.
    #[error("the total of the amounts is too large")]
    AmountOverflow,

    /// An empty string was used as a category.
    #[error("Category cannot be empty")]
    EmptyCategory,

    /// An empty string was used as a username.
    #[error("Username cannot be empty")]
    EmptyUsername,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The month string was not in the format "YYYY-MM".
    #[error("\"{0}\" is not a valid month, expected the format YYYY-MM")]
    InvalidMonth(String),

    /// The shares of a split do not add up to the split's total.
    #[error("the shares add up to {shares_total} but the total is {total}")]
    SplitSharesMismatch {
        /// The total amount of the split.
        total: money::Money,
        /// The sum of the shares.
        shares_total: money::Money,
    },

    /// The split is malformed in some other way, e.g. it has no participants.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// A user tried to send a friend request to themselves.
    #[error("you cannot send a friend request to yourself")]
    SelfFriendRequest,

    /// The assistant was asked an empty question.
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// A pending or accepted friendship already exists between the two users.
    #[error("a friend request between you and {0} already exists")]
    DuplicateFriendRequest(String),

    /// The username is already taken.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// No user is registered with the username.
    #[error("no user with the username \"{0}\" exists")]
    UserNotFound(String),

    /// The friend request does not exist, is not addressed to the caller or
    /// has already been accepted.
    #[error("the friend request could not be found")]
    FriendRequestNotFound,

    /// The participant has no share in the split.
    #[error("the share could not be found")]
    ShareNotFound,

    /// The completion API returned an error, an unexpected response or timed out.
    #[error("the assistant service failed: {0}")]
    ExternalService(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The auth cookie could not be created.
    #[error("could not create the auth cookie: {0}")]
    CookieError(String),
}

impl Error {
    /// The broad category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAmount(_)
            | Error::AmountOverflow
            | Error::EmptyCategory
            | Error::EmptyUsername
            | Error::TooWeak(_)
            | Error::InvalidMonth(_)
            | Error::SplitSharesMismatch { .. }
            | Error::InvalidSplit(_)
            | Error::SelfFriendRequest
            | Error::EmptyQuestion => ErrorKind::Validation,
            Error::DuplicateFriendRequest(_) | Error::DuplicateUsername(_) => {
                ErrorKind::Duplicate
            }
            Error::NotFound
            | Error::UserNotFound(_)
            | Error::FriendRequestNotFound
            | Error::ShareNotFound => ErrorKind::NotFound,
            Error::ExternalService(_) => ErrorKind::ExternalService,
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::HashingError(_)
            | Error::InvalidTimezoneError(_)
            | Error::CookieError(_) => ErrorKind::Persistence,
        }
    }

    /// Render the error as an alert fragment for htmx requests.
    ///
    /// Validation, duplicate and not-found errors show their message to the
    /// user. Internal errors are logged and replaced with a generic message.
    fn into_alert_response(self) -> Response {
        let (status_code, title) = match self.kind() {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "Invalid input"),
            ErrorKind::Duplicate => (StatusCode::CONFLICT, "Already exists"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            ErrorKind::ExternalService => {
                tracing::error!("{self}");
                return (
                    StatusCode::BAD_GATEWAY,
                    Alert::error(
                        "The assistant is unavailable",
                        "The assistant could not answer your question. Please try again later.",
                    )
                    .into_html(),
                )
                    .into_response();
            }
            ErrorKind::Persistence => {
                tracing::error!("An unexpected error occurred: {self}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::error(
                        "Something went wrong",
                        "An unexpected error occurred, check the server logs for more details.",
                    )
                    .into_html(),
                )
                    .into_response();
            }
        };

        (status_code, Alert::error(title, &self.to_string()).into_html()).into_response()
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => not_found::get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
