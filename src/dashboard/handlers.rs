//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID,
    auth::get_usernames,
    budget::{Overrun, check_overruns},
    dashboard::{
        cards::{FriendBalance, balances_view, overruns_view, totals_view},
        charts::{
            DashboardChart, ECHARTS_URL, charts_script, charts_view, expenses_by_category_chart,
            income_and_expenses_chart,
        },
    },
    endpoints,
    html::{HeadElement, base, link},
    month::BudgetMonth,
    navigation::NavBar,
    split::get_balances,
    timezone::today,
    transaction::{Summary, summarize},
};

/// How many months, including the current one, the trend chart covers.
const TREND_MONTHS: usize = 6;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions, budgets and splits.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    month: BudgetMonth,
    summary: Summary,
    overruns: Vec<Overrun>,
    balances: Vec<FriendBalance>,
    /// Oldest month first, ending with the current month.
    monthly: Vec<(BudgetMonth, Summary)>,
}

impl DashboardData {
    fn has_transactions(&self) -> bool {
        self.monthly
            .iter()
            .any(|(_, summary)| !summary.by_category.is_empty())
    }
}

/// Display a page with an overview of the user's finances for the current month.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let month = BudgetMonth::containing(
        today(&state.local_timezone)
            .inspect_err(|error| tracing::error!("could not get today's date: {error}"))?,
    );

    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        build_dashboard_data(user_id, month, &connection)?
    };

    Ok(dashboard_view(&data).into_response())
}

/// Fetches everything the dashboard shows for `month`.
///
/// # Errors
/// Returns an error if a database query fails.
fn build_dashboard_data(
    user_id: UserID,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<DashboardData, Error> {
    let mut monthly = Vec::with_capacity(TREND_MONTHS);
    let mut trend_month = month;
    for _ in 0..TREND_MONTHS {
        let (start, end) = trend_month.date_range();
        let summary = summarize(user_id, start, end, connection)
            .inspect_err(|error| tracing::error!("could not summarize {trend_month}: {error}"))?;
        monthly.push((trend_month, summary));
        trend_month = trend_month.previous();
    }
    monthly.reverse();

    let summary = monthly
        .last()
        .map(|(_, summary)| summary.clone())
        .unwrap_or_default();

    let overruns = check_overruns(user_id, month, connection)
        .inspect_err(|error| tracing::error!("could not check budgets: {error}"))?;

    let raw_balances = get_balances(user_id, connection)
        .inspect_err(|error| tracing::error!("could not get balances: {error}"))?;
    let other_users: Vec<UserID> = raw_balances.iter().map(|(other, _)| *other).collect();
    let usernames = get_usernames(&other_users, connection)
        .inspect_err(|error| tracing::error!("could not get usernames: {error}"))?;
    let balances = raw_balances
        .into_iter()
        .map(|(other, balance)| FriendBalance {
            username: usernames
                .get(&other)
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("User {other}")),
            balance,
        })
        .collect();

    Ok(DashboardData {
        month,
        summary,
        overruns,
        balances,
        monthly,
    })
}

fn build_dashboard_charts(data: &DashboardData) -> Vec<DashboardChart> {
    let mut charts = Vec::with_capacity(2);

    if data.summary.expense.is_positive() {
        charts.push(DashboardChart {
            id: "expenses-by-category-chart",
            options: expenses_by_category_chart(data.month, &data.summary).to_string(),
        });
    }

    charts.push(DashboardChart {
        id: "income-expenses-chart",
        options: income_and_expenses_chart(&data.monthly).to_string(),
    });

    charts
}

fn no_transactions_view() -> Markup {
    let transactions_link = link(endpoints::TRANSACTIONS_VIEW, "transactions page");

    html!(
        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you add some transactions on the "
                (transactions_link) "."
            }
        }
    )
}

fn dashboard_view(data: &DashboardData) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let charts = if data.has_transactions() {
        build_dashboard_charts(data)
    } else {
        Vec::new()
    };

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (overruns_view(&data.overruns))
            (totals_view(data.month, &data.summary))

            @if charts.is_empty() {
                (no_transactions_view())
            } @else {
                (charts_view(&charts))
            }

            (balances_view(&data.balances))
        }
    );

    let scripts = if charts.is_empty() {
        Vec::new()
    } else {
        vec![
            HeadElement::ScriptLink(ECHARTS_URL.to_owned()),
            charts_script(&charts),
        ]
    };

    base("Dashboard", &scripts, &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use rusqlite::Connection;
    use scraper::{Html, Selector};
    use time::OffsetDateTime;

    use crate::{
        User,
        budget::set_budget,
        friend::{accept_friend_request, send_friend_request},
        money::Money,
        month::BudgetMonth,
        split::{Allocation, NewSplit, create_split},
        test_utils::{
            assert_status_ok, assert_valid_html, create_test_user, get_test_connection,
            parse_html_document,
        },
        transaction::{CategoryName, NewTransaction, create_transaction},
    };

    use super::{DashboardState, get_dashboard_page};

    fn add_transaction(user: &User, cents: i64, category: &str, conn: &Connection) {
        create_transaction(
            user.id,
            NewTransaction {
                amount: Money::new(cents),
                category: CategoryName::new_unchecked(category),
                date: OffsetDateTime::now_utc().date(),
                note: None,
            },
            conn,
        )
        .unwrap();
    }

    fn attribute_values(html: &Html, selector: &str, attribute: &str) -> Vec<String> {
        html.select(&Selector::parse(selector).unwrap())
            .map(|element| element.value().attr(attribute).unwrap().to_owned())
            .collect()
    }

    #[track_caller]
    fn assert_chart_exists(html: &Html, chart_id: &str) {
        let selector = Selector::parse(&format!("#{chart_id}")).unwrap();
        assert!(
            html.select(&selector).next().is_some(),
            "Chart with id '{chart_id}' not found"
        );
    }

    #[tokio::test]
    async fn shows_totals_overruns_balances_and_charts() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        add_transaction(&alice, 250_000, "Salary", &conn);
        add_transaction(&alice, -50_001, "Food", &conn);
        add_transaction(&alice, -10_000, "Rent", &conn);
        let month = BudgetMonth::containing(OffsetDateTime::now_utc().date());
        for (category, limit) in [("Food", 50_000), ("Rent", 10_000)] {
            set_budget(
                alice.id,
                CategoryName::new_unchecked(category),
                month,
                Money::new(limit),
                &conn,
            )
            .unwrap();
        }
        let request = send_friend_request(alice.id, bob.id, &conn).unwrap();
        accept_friend_request(request.id, bob.id, &conn).unwrap();
        create_split(
            NewSplit {
                payer: bob.id,
                total: Money::new(4_000),
                description: "Tickets".to_owned(),
                shares: vec![
                    Allocation {
                        participant: alice.id,
                        amount: Money::new(2_000),
                    },
                    Allocation {
                        participant: bob.id,
                        amount: Money::new(2_000),
                    },
                ],
            },
            &conn,
        )
        .unwrap();
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(alice.id))
            .await
            .unwrap();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(
            attribute_values(&html, "[data-overrun]", "data-overrun"),
            ["Food"]
        );
        assert_eq!(
            attribute_values(&html, "[data-balance]", "data-balance"),
            ["-2000"]
        );
        assert_chart_exists(&html, "expenses-by-category-chart");
        assert_chart_exists(&html, "income-expenses-chart");
        let net = html
            .select(&Selector::parse("[data-total=Net] p.text-2xl").unwrap())
            .next()
            .unwrap()
            .text()
            .collect::<String>();
        assert_eq!(net, "$1,899.99");
    }

    #[tokio::test]
    async fn displays_prompt_text_on_no_data() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_dashboard_page(State(state), Extension(alice.id))
            .await
            .unwrap();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert!(
            html.select(&Selector::parse("#charts").unwrap())
                .next()
                .is_none()
        );
        assert!(html.html().contains("Nothing here yet..."));
    }
}
