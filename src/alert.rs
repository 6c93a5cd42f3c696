//! Error alerts shown to users when a form submission fails.
//!
//! Alerts are rendered into the `#alert-container` element at the bottom of
//! every page as the target of a failed htmx request.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// A dismissible message explaining why an action failed and how to fix it.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    message: String,
    details: String,
}

impl Alert {
    /// An alert with a short `message` as the title and optional `details` below it.
    pub fn error(message: &str, details: &str) -> Self {
        Self {
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    pub fn into_html(self) -> Html<String> {
        Html(self.into_markup().into_string())
    }

    fn into_markup(self) -> Markup {
        html! {
            div
                role="alert"
                class="flex items-start p-4 mb-4 border rounded-lg text-red-800 bg-red-50
                    border-red-300 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
            {
                div class="flex-1 text-sm"
                {
                    p class="font-semibold" { (self.message) }

                    @if !self.details.is_empty() {
                        p class="mt-1" { (self.details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="ms-3 -my-1.5 p-1.5 rounded-lg"
                    onclick="this.parentElement.remove()"
                {
                    "✕"
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
