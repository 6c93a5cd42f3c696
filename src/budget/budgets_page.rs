//! The page for setting monthly budgets and tracking them.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID,
    budget::core::{BudgetStatus, budget_status},
    endpoints,
    html::{
        CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, amount_input, base,
        format_currency, submit_button,
    },
    money::Money,
    month::BudgetMonth,
    navigation::NavBar,
    timezone::today,
};

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The month to show, defaults to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetsQuery {
    pub month: Option<BudgetMonth>,
}

/// Render the budget form and the status of each budget for the selected month.
pub async fn get_budgets_page(
    State(state): State<BudgetsPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<BudgetsQuery>,
) -> Result<Response, Error> {
    let month = match query.month {
        Some(month) => month,
        None => BudgetMonth::containing(
            today(&state.local_timezone)
                .inspect_err(|error| tracing::error!("could not get today's date: {error}"))?,
        ),
    };

    let statuses = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        budget_status(user_id, month, &connection)
            .inspect_err(|error| tracing::error!("could not get budget status: {error}"))?
    };

    Ok(budgets_view(month, &statuses).into_response())
}

fn set_budget_form(month: BudgetMonth) -> Markup {
    html! {
        form
            hx-post=(endpoints::BUDGETS_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Set Budget" }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                input
                    name="category"
                    id="category"
                    type="text"
                    placeholder="Groceries"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                input
                    name="month"
                    id="month"
                    type="month"
                    value=(month)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (amount_input("limit", "Monthly limit", None))

            (submit_button("Save Budget"))
        }
    }
}

fn progress_bar(status: &BudgetStatus) -> Markup {
    let percent = (status.fraction_used() * 100.0).clamp(0.0, 100.0);
    let bar_colour = if status.is_over() {
        "bg-red-600"
    } else if percent >= 80.0 {
        "bg-yellow-400"
    } else {
        "bg-green-600"
    };

    html! {
        div class="w-full bg-gray-200 rounded-full h-2.5 dark:bg-gray-700"
        {
            div
                class={ "h-2.5 rounded-full " (bar_colour) }
                style={ "width: " (format!("{percent:.0}")) "%" }
            {}
        }
    }
}

fn budgets_table(statuses: &[BudgetStatus]) -> Markup {
    html! {
        div class="overflow-x-auto rounded-lg shadow"
        {
            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Limit" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Remaining" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Progress" }
                    }
                }

                tbody
                {
                    @for status in statuses {
                        @let remaining_style = if status.remaining() < Money::ZERO {
                            format!("{TABLE_CELL_STYLE} text-red-600")
                        } else {
                            TABLE_CELL_STYLE.to_owned()
                        };

                        tr class=(TABLE_ROW_STYLE) data-over-budget=(status.is_over())
                        {
                            td class=(TABLE_CELL_STYLE) { (status.category) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(status.limit)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(status.spent)) }
                            td class=(remaining_style)
                            {
                                (format_currency(status.remaining()))
                            }
                            td class={ (TABLE_CELL_STYLE) " min-w-32" } { (progress_bar(status)) }
                        }
                    }

                    @if statuses.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="5" class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "No budgets set for this month."
                            }
                        }
                    }
                }
            }
        }
    }
}

fn budgets_view(month: BudgetMonth, statuses: &[BudgetStatus]) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();
    let month_url = |month: BudgetMonth| format!("{}?month={month}", endpoints::BUDGETS_VIEW);

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl grid gap-6 lg:grid-cols-3"
            {
                div class=(CARD_STYLE) { (set_budget_form(month)) }

                div class="lg:col-span-2"
                {
                    div class="flex items-center justify-between mb-4"
                    {
                        a href=(month_url(month.previous())) class=(LINK_STYLE) { "Previous" }
                        h1 class="text-2xl font-bold" { "Budgets for " (month) }
                        a href=(month_url(month.next())) class=(LINK_STYLE) { "Next" }
                    }

                    (budgets_table(statuses))
                }
            }
        }
    };

    base("Budgets", &[], &content)
}
