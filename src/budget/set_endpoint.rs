//! Defines the endpoint for setting a monthly budget.
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
    AppState, Error, UserID, budget::core::set_budget, endpoints, money::Money,
    month::BudgetMonth, transaction::CategoryName,
};

/// The state needed to set a budget.
#[derive(Debug, Clone)]
pub struct SetBudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SetBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for setting a budget.
#[derive(Debug, Serialize, Deserialize)]
pub struct BudgetForm {
    pub category: String,
    /// The month as "YYYY-MM".
    pub month: String,
    /// The limit in dollars.
    pub limit: String,
}

/// A route handler for creating or replacing a budget, redirects to the budgets page for the
/// budget's month on success.
pub async fn set_budget_endpoint(
    State(state): State<SetBudgetState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let parsed = CategoryName::new(&form.category).and_then(|category| {
        let month: BudgetMonth = form.month.parse()?;
        let limit: Money = form.limit.parse()?;
        Ok((category, month, limit))
    });

    let (category, month, limit) = match parsed {
        Ok(parsed) => parsed,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = set_budget(user_id, category, month, limit, &connection) {
        tracing::error!("could not set budget: {error}");
        return error.into_alert_response();
    }

    (
        HxRedirect(format!("{}?month={month}", endpoints::BUDGETS_VIEW)),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
