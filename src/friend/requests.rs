//! Endpoints for sending and accepting friend requests.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, UserID,
    auth::get_user_by_username,
    database_id::FriendshipId,
    endpoints,
    friend::core::{accept_friend_request, send_friend_request},
};

/// The state needed to send or accept friend requests.
#[derive(Debug, Clone)]
pub struct FriendRequestState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FriendRequestState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendRequestForm {
    /// The username of the user to befriend.
    pub username: String,
}

fn redirect_to_friends_page() -> Response {
    (
        HxRedirect(endpoints::FRIENDS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for sending a friend request by username.
pub async fn send_friend_request_endpoint(
    State(state): State<FriendRequestState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<FriendRequestForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let result = get_user_by_username(&form.username, &connection)
        .and_then(|recipient| send_friend_request(user_id, recipient.id, &connection));

    match result {
        Ok(request) => {
            tracing::info!(
                "User {user_id} sent friend request {} to user {}",
                request.id,
                request.recipient
            );
            redirect_to_friends_page()
        }
        Err(error) => error.into_alert_response(),
    }
}

/// A route handler for accepting a friend request sent to the current user.
pub async fn accept_friend_request_endpoint(
    State(state): State<FriendRequestState>,
    Extension(user_id): Extension<UserID>,
    Path(request_id): Path<FriendshipId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match accept_friend_request(request_id, user_id, &connection) {
        Ok(_) => redirect_to_friends_page(),
        Err(error) => error.into_alert_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;

    use crate::{
        friend::core::{are_friends, send_friend_request},
        test_utils::{
            assert_form_error_message, create_test_user, get_test_connection, parse_html_fragment,
        },
    };

    use super::{
        FriendRequestForm, FriendRequestState, accept_friend_request_endpoint,
        send_friend_request_endpoint,
    };

    fn form(username: &str) -> Form<FriendRequestForm> {
        Form(FriendRequestForm {
            username: username.to_owned(),
        })
    }

    #[tokio::test]
    async fn send_request_by_username() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        create_test_user("bob", &conn);
        let state = FriendRequestState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            send_friend_request_endpoint(State(state), Extension(alice.id), form(" Bob ")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(HX_REDIRECT).unwrap(), "/friends");
    }

    #[tokio::test]
    async fn send_request_to_unknown_user_shows_not_found() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let state = FriendRequestState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            send_friend_request_endpoint(State(state), Extension(alice.id), form("nobody")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = parse_html_fragment(response).await;
        assert_form_error_message(&html, "Not found");
    }

    #[tokio::test]
    async fn duplicate_request_in_reverse_direction_conflicts() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        send_friend_request(alice.id, bob.id, &conn).unwrap();
        let state = FriendRequestState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            send_friend_request_endpoint(State(state), Extension(bob.id), form("alice")).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn accept_request() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let request = send_friend_request(alice.id, bob.id, &conn).unwrap();
        let state = FriendRequestState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            accept_friend_request_endpoint(State(state.clone()), Extension(bob.id), Path(request.id))
                .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let connection = state.db_connection.lock().unwrap();
        assert!(are_friends(alice.id, bob.id, &connection).unwrap());
    }

    #[tokio::test]
    async fn requester_cannot_accept_own_request() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let request = send_friend_request(alice.id, bob.id, &conn).unwrap();
        let state = FriendRequestState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response =
            accept_friend_request_endpoint(State(state), Extension(alice.id), Path(request.id))
                .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
