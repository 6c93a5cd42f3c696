//! Defines the endpoint that answers questions from the assistant page.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, UserID,
    assistant::{CompletionService, ask::ask},
    timezone::today,
};

/// The state needed to answer questions.
#[derive(Clone)]
pub struct AskState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub assistant: Arc<dyn CompletionService>,
}

impl FromRef<AppState> for AskState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            assistant: state.assistant.clone(),
        }
    }
}

/// The form data for asking a question.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionForm {
    pub question: String,
}

/// A route handler that asks the assistant a question and returns the answer
/// as an HTML fragment.
pub async fn ask_endpoint(
    State(state): State<AskState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<QuestionForm>,
) -> Response {
    let today = match today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    match ask(
        user_id,
        &form.question,
        today,
        &state.db_connection,
        state.assistant.as_ref(),
    )
    .await
    {
        Ok(answer) => answer_view(form.question.trim(), &answer).into_response(),
        Err(error) => error.into_alert_response(),
    }
}

fn answer_view(question: &str, answer: &str) -> Markup {
    html! {
        h2 class="text-lg font-semibold mb-2" { (question) }
        p class="whitespace-pre-wrap" data-answer { (answer) }
    }
}
