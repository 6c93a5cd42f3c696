//! Defines the endpoint for splitting a bill with friends.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, UserID, endpoints,
    friend::are_friends,
    money::Money,
    split::core::{Allocation, NewSplit, create_split, even_shares},
};

/// The state needed to create a split.
#[derive(Debug, Clone)]
pub struct CreateSplitState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateSplitState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// How the total is divided between the participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Everyone ticked pays the same, give or take a cent.
    Even,
    /// Everyone with an amount entered pays that amount.
    Custom,
}

/// The form data for creating a split.
///
/// `share_participant` and `share` are submitted for every row of the form, so
/// the n-th share belongs to the n-th share participant.
#[derive(Debug, Serialize, Deserialize)]
pub struct SplitForm {
    pub description: String,
    /// The bill total in dollars, e.g. "100.00".
    pub total: String,
    pub mode: SplitMode,
    /// The users ticked for an even split.
    #[serde(default)]
    pub participant: Vec<i64>,
    #[serde(default)]
    pub share_participant: Vec<i64>,
    /// The custom share amounts in dollars, blank for users not taking part.
    #[serde(default)]
    pub share: Vec<String>,
}

impl SplitForm {
    fn into_new_split(self, payer: UserID) -> Result<NewSplit, Error> {
        let total: Money = self.total.parse()?;

        let shares = match self.mode {
            SplitMode::Even => self
                .participant
                .iter()
                .zip(even_shares(total, self.participant.len()))
                .map(|(&participant, amount)| Allocation {
                    participant: UserID::new(participant),
                    amount,
                })
                .collect(),
            SplitMode::Custom => {
                if self.share_participant.len() != self.share.len() {
                    return Err(Error::InvalidSplit(
                        "each share must belong to a participant".to_owned(),
                    ));
                }

                self.share_participant
                    .iter()
                    .zip(&self.share)
                    .filter(|(_, amount)| !amount.trim().is_empty())
                    .map(|(&participant, amount)| {
                        Ok(Allocation {
                            participant: UserID::new(participant),
                            amount: amount.trim().parse()?,
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?
            }
        };

        Ok(NewSplit {
            payer,
            total,
            description: self.description,
            shares,
        })
    }
}

/// A route handler for splitting a bill paid by the current user with their friends.
///
/// Redirects to the splits view on success.
pub async fn create_split_endpoint(
    State(state): State<CreateSplitState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<SplitForm>,
) -> Response {
    let new_split = match form.into_new_split(user_id) {
        Ok(new_split) => new_split,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    for allocation in &new_split.shares {
        if allocation.participant == user_id {
            continue;
        }

        match are_friends(user_id, allocation.participant, &connection) {
            Ok(true) => {}
            Ok(false) => {
                return Error::InvalidSplit("you can only split bills with friends".to_owned())
                    .into_alert_response();
            }
            Err(error) => {
                tracing::error!("could not check friendship: {error}");
                return error.into_alert_response();
            }
        }
    }

    if let Err(error) = create_split(new_split, &connection) {
        tracing::debug!("could not create split: {error}");

        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::SPLITS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;

    use crate::{
        User,
        friend::{accept_friend_request, send_friend_request},
        money::Money,
        split::core::get_splits,
        test_utils::{
            assert_form_error_message, create_test_user, get_test_connection, parse_html_fragment,
        },
    };

    use super::{CreateSplitState, SplitForm, SplitMode, create_split_endpoint};

    fn befriend(a: &User, b: &User, conn: &Connection) {
        let request = send_friend_request(a.id, b.id, conn).unwrap();
        accept_friend_request(request.id, b.id, conn).unwrap();
    }

    fn even_form(total: &str, participants: &[&User]) -> SplitForm {
        SplitForm {
            description: "Dinner".to_owned(),
            total: total.to_owned(),
            mode: SplitMode::Even,
            participant: participants.iter().map(|user| user.id.as_i64()).collect(),
            share_participant: Vec::new(),
            share: Vec::new(),
        }
    }

    fn custom_form(total: &str, shares: &[(&User, &str)]) -> SplitForm {
        SplitForm {
            description: "Dinner".to_owned(),
            total: total.to_owned(),
            mode: SplitMode::Custom,
            participant: Vec::new(),
            share_participant: shares.iter().map(|(user, _)| user.id.as_i64()).collect(),
            share: shares.iter().map(|(_, amount)| (*amount).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn splits_evenly_between_friends() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let carol = create_test_user("carol", &conn);
        befriend(&alice, &bob, &conn);
        befriend(&carol, &alice, &conn);
        let state = CreateSplitState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_split_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Form(even_form("100", &[&alice, &bob, &carol])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(HX_REDIRECT).unwrap(), "/splits");
        let connection = state.db_connection.lock().unwrap();
        let splits = get_splits(alice.id, &connection).unwrap();
        assert_eq!(splits.len(), 1);
        let amounts: Vec<_> = splits[0].shares.iter().map(|share| share.amount).collect();
        assert_eq!(
            amounts,
            [Money::new(3_334), Money::new(3_333), Money::new(3_333)]
        );
    }

    #[tokio::test]
    async fn custom_split_skips_blank_shares() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let carol = create_test_user("carol", &conn);
        befriend(&alice, &bob, &conn);
        befriend(&alice, &carol, &conn);
        let state = CreateSplitState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_split_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Form(custom_form(
                "60",
                &[(&alice, "20"), (&bob, "40.00"), (&carol, " ")],
            )),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let connection = state.db_connection.lock().unwrap();
        let splits = get_splits(alice.id, &connection).unwrap();
        let participants: Vec<_> = splits[0]
            .shares
            .iter()
            .map(|share| share.participant)
            .collect();
        assert_eq!(participants, [alice.id, bob.id]);
    }

    #[tokio::test]
    async fn rejects_shares_that_do_not_add_up() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let carol = create_test_user("carol", &conn);
        befriend(&alice, &bob, &conn);
        befriend(&alice, &carol, &conn);
        let state = CreateSplitState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_split_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Form(custom_form(
                "100",
                &[(&alice, "33.33"), (&bob, "33.33"), (&carol, "33.33")],
            )),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        assert_form_error_message(&html, "Invalid input");
        let connection = state.db_connection.lock().unwrap();
        assert!(get_splits(alice.id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_huge_shares_and_keeps_database_usable() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        befriend(&alice, &bob, &conn);
        let state = CreateSplitState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_split_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Form(custom_form(
                "1",
                &[
                    (&alice, "92233720368547758.07"),
                    (&bob, "92233720368547758.07"),
                ],
            )),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!state.db_connection.is_poisoned());

        let response = create_split_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Form(even_form("10", &[&alice, &bob])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn rejects_participants_who_are_not_friends() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        send_friend_request(alice.id, bob.id, &conn).unwrap();
        let state = CreateSplitState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_split_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Form(even_form("10", &[&alice, &bob])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let connection = state.db_connection.lock().unwrap();
        assert!(get_splits(alice.id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_split_without_participants() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let state = CreateSplitState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = create_split_endpoint(
            State(state),
            Extension(alice.id),
            Form(even_form("10", &[])),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parses_repeated_fields_from_form_body() {
        let form_data = "description=Dinner&total=60&mode=custom\
            &share_participant=1&share=20&share_participant=2&share=40&share_participant=3&share=";

        let form: SplitForm = serde_html_form::from_str(form_data).unwrap();

        assert_eq!(form.mode, SplitMode::Custom);
        assert!(form.participant.is_empty());
        assert_eq!(form.share_participant, [1, 2, 3]);
        assert_eq!(form.share, ["20", "40", ""]);
    }

    #[test]
    fn parses_even_form_with_no_ticked_participants() {
        let form: SplitForm =
            serde_html_form::from_str("description=Taxi&total=12.50&mode=even").unwrap();

        assert_eq!(form.mode, SplitMode::Even);
        assert!(form.participant.is_empty());
        assert!(form.share.is_empty());
    }
}
