//! Defines the endpoint for marking a share of a split as paid back.
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
    database_id::SplitId,
    endpoints,
    split::core::{get_split, settle},
};

/// The state needed to settle a share.
#[derive(Debug, Clone)]
pub struct SettleShareState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SettleShareState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Whose share to settle.
#[derive(Debug, Serialize, Deserialize)]
pub struct SettleForm {
    pub participant: i64,
}

/// A route handler for settling a participant's share of a split.
///
/// Only the payer of the split and the participant themselves may settle a share.
/// Anyone else gets the same response as for a share that does not exist.
pub async fn settle_share_endpoint(
    State(state): State<SettleShareState>,
    Extension(user_id): Extension<UserID>,
    Path(split_id): Path<SplitId>,
    Form(form): Form<SettleForm>,
) -> Response {
    let participant = UserID::new(form.participant);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let split = match get_split(split_id, &connection) {
        Ok(split) => split,
        Err(Error::NotFound) => return Error::ShareNotFound.into_alert_response(),
        Err(error) => {
            tracing::error!("could not get split {split_id}: {error}");
            return error.into_alert_response();
        }
    };

    if user_id != split.payer && user_id != participant {
        return Error::ShareNotFound.into_alert_response();
    }

    if let Err(error) = settle(split_id, participant, &connection) {
        tracing::debug!("could not settle share of split {split_id}: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::SPLITS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
