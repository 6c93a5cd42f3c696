//! Defines the route handler for the page that records and lists transactions.
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
use time::Date;

use crate::{
    AppState, Error, UserID, endpoints,
    html::{
        BUTTON_SECONDARY_STYLE, CARD_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE,
        FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, amount_input, base, format_currency, link, submit_button,
    },
    money::Money,
    navigation::NavBar,
    timezone::today,
    transaction::{
        CategoryName, Transaction, TransactionFilter,
        core::{get_categories, get_transactions},
    },
};

/// Categories offered before the user has recorded any of their own.
const PRESET_CATEGORIES: [&str; 7] = [
    "Food & Drinks",
    "Travel",
    "Subscriptions",
    "Shopping",
    "Rent/Mortgage",
    "Salary",
    "Other",
];

/// How many transactions are listed until the user asks to see all of them.
const PREVIEW_LENGTH: usize = 5;

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The filters selected in the sidebar of the transactions page.
///
/// Empty dates are parsed as `None`.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    /// Inclusive start date.
    pub start: Option<Date>,
    /// Inclusive end date, as picked in the date input.
    pub end: Option<Date>,
    #[serde(default)]
    pub category: Vec<String>,
    /// List every matching transaction instead of the most recent few.
    #[serde(default)]
    pub all: bool,
}

impl TransactionsQuery {
    fn to_filter(&self) -> TransactionFilter {
        TransactionFilter {
            start: self.start,
            // The stored range is half-open.
            end: self.end.and_then(|end| end.next_day()),
            categories: self
                .category
                .iter()
                .filter_map(|category| CategoryName::new(category).ok())
                .collect(),
        }
    }
}

/// Render the form for recording a transaction, the filters and the filtered transactions.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let today = today(&state.local_timezone)
        .inspect_err(|error| tracing::error!("could not get today's date: {error}"))?;
    let filter = query.to_filter();

    let (transactions, categories) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let transactions = get_transactions(user_id, &filter, &connection)
            .inspect_err(|error| tracing::error!("could not get transactions: {error}"))?;
        let categories = get_categories(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get categories: {error}"))?;

        (transactions, with_presets(categories))
    };

    Ok(transactions_view(today, &query, &filter, &categories, &transactions).into_response())
}

/// The preset categories followed by the user's own categories that are not presets.
fn with_presets(user_categories: Vec<CategoryName>) -> Vec<CategoryName> {
    let mut categories: Vec<CategoryName> = PRESET_CATEGORIES
        .iter()
        .map(|name| CategoryName::new_unchecked(name))
        .collect();

    for category in user_categories {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    categories
}

fn create_transaction_form(today: Date, categories: &[CategoryName]) -> Markup {
    html! {
        form
            hx-post=(endpoints::TRANSACTIONS_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Add Transaction" }

            fieldset class="space-y-2"
            {
                legend class=(FORM_LABEL_STYLE) { "Type" }

                div class=(FORM_RADIO_GROUP_STYLE)
                {
                    div class="flex-1 flex"
                    {
                        input
                            name="kind"
                            id="kind-expense"
                            type="radio"
                            value="expense"
                            checked
                            required
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for="kind-expense" class=(FORM_RADIO_LABEL_STYLE) { "Expense" }
                    }

                    div class="flex-1 flex"
                    {
                        input
                            name="kind"
                            id="kind-income"
                            type="radio"
                            value="income"
                            required
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for="kind-income" class=(FORM_RADIO_LABEL_STYLE) { "Income" }
                    }
                }
            }

            (amount_input("amount", "Amount", None))

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                input
                    name="category"
                    id="category"
                    type="text"
                    list="category-options"
                    placeholder="Groceries"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                datalist id="category-options"
                {
                    @for category in categories {
                        option value=(category) {}
                    }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    name="date"
                    id="date"
                    type="date"
                    value=(today)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Note" }

                input
                    name="note"
                    id="note"
                    type="text"
                    placeholder="Optional"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (submit_button("Add Transaction"))
        }
    }
}

fn filter_form(query: &TransactionsQuery, categories: &[CategoryName]) -> Markup {
    html! {
        form method="get" action=(endpoints::TRANSACTIONS_VIEW) class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Filters" }

            div class="grid grid-cols-2 gap-2"
            {
                div
                {
                    label for="start" class=(FORM_LABEL_STYLE) { "From" }
                    input
                        name="start"
                        id="start"
                        type="date"
                        value=[query.start]
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="end" class=(FORM_LABEL_STYLE) { "To" }
                    input
                        name="end"
                        id="end"
                        type="date"
                        value=[query.end]
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            @if !categories.is_empty() {
                fieldset class="flex flex-wrap gap-3"
                {
                    legend class=(FORM_LABEL_STYLE) { "Categories" }

                    @for category in categories {
                        label class="inline-flex items-center gap-1 text-sm"
                        {
                            input
                                type="checkbox"
                                name="category"
                                value=(category)
                                checked[query.category.iter().any(|selected| selected.trim() == category.as_ref())];
                            (category)
                        }
                    }
                }
            }

            div class="flex gap-2"
            {
                button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Apply" }
                (link(endpoints::TRANSACTIONS_VIEW, "Clear"))
            }
        }
    }
}

/// A GET form that reloads the page with the same filters, listing either every
/// transaction or only the preview.
fn toggle_all_form(query: &TransactionsQuery, all: bool, label: &str) -> Markup {
    html! {
        form method="get" action=(endpoints::TRANSACTIONS_VIEW) class="mt-3"
        {
            @if let Some(start) = query.start {
                input type="hidden" name="start" value=(start);
            }
            @if let Some(end) = query.end {
                input type="hidden" name="end" value=(end);
            }
            @for category in &query.category {
                input type="hidden" name="category" value=(category);
            }
            @if all {
                input type="hidden" name="all" value="true";
            }

            button type="submit" class=(BUTTON_SECONDARY_STYLE) { (label) }
        }
    }
}

fn transactions_table(transactions: &[Transaction], query: &TransactionsQuery) -> Markup {
    let shown = if query.all {
        transactions
    } else {
        &transactions[..transactions.len().min(PREVIEW_LENGTH)]
    };

    let income: Money = transactions
        .iter()
        .map(|transaction| transaction.amount)
        .filter(|amount| amount.is_positive())
        .sum();
    let expense: Money = transactions
        .iter()
        .map(|transaction| transaction.amount)
        .filter(|amount| amount.is_negative())
        .sum();

    html! {
        div class="flex gap-6 mb-4 text-sm"
        {
            span { "Income: " span class="text-green-600 dark:text-green-400 font-semibold" { (format_currency(income)) } }
            span { "Expenses: " span class="text-red-600 dark:text-red-400 font-semibold" { (format_currency(-expense)) } }
            span { "Net: " span class="font-semibold" { (format_currency(income + expense)) } }
        }

        div class="overflow-x-auto rounded-lg shadow"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Note" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                    }
                }

                tbody
                {
                    @for transaction in shown {
                        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
                        {
                            td class=(TABLE_CELL_STYLE) { (transaction.date) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                span class=(CATEGORY_BADGE_STYLE) { (transaction.category) }
                            }
                            td class=(TABLE_CELL_STYLE) { (transaction.note.as_deref().unwrap_or_default()) }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_currency(transaction.amount))
                            }
                        }
                    }

                    @if transactions.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="4" class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "No transactions found."
                            }
                        }
                    }
                }
            }
        }

        @if query.all && transactions.len() > PREVIEW_LENGTH {
            (toggle_all_form(query, false, "Show less"))
        } @else if transactions.len() > PREVIEW_LENGTH {
            (toggle_all_form(query, true, "View all"))
        }
    }
}

fn transactions_view(
    today: Date,
    query: &TransactionsQuery,
    filter: &TransactionFilter,
    categories: &[CategoryName],
    transactions: &[Transaction],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let is_filtered = filter != &TransactionFilter::default();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl grid gap-6 lg:grid-cols-3"
            {
                div class="space-y-6"
                {
                    div class=(CARD_STYLE) { (create_transaction_form(today, categories)) }
                    div class=(CARD_STYLE) { (filter_form(query, categories)) }
                }

                div class="lg:col-span-2"
                {
                    h1 class="text-2xl font-bold mb-4"
                    {
                        @if is_filtered { "Filtered Transactions" } @else { "Transactions" }
                    }

                    (transactions_table(transactions, query))
                }
            }
        }
    };

    base("Transactions", &[], &content)
}

#[cfg(test)]
mod transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use axum_extra::extract::Query;
    use scraper::Selector;
    use time::macros::date;

    use crate::{
        endpoints,
        money::Money,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_status_ok,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
        transaction::{CategoryName, NewTransaction, create_transaction},
    };

    use super::{TransactionsPageState, TransactionsQuery, get_transactions_page};

    #[tokio::test]
    async fn renders_create_form() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        let state = TransactionsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_transactions_page(
            State(state),
            Extension(user.id),
            Query(TransactionsQuery::default()),
        )
        .await
        .expect("Could not render transactions page");

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "kind", "radio");
        assert_form_input(&form, "amount", "number");
        assert_form_input(&form, "category", "text");
        assert_form_input(&form, "date", "date");
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn lists_filtered_transactions() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        for (cents, category, date) in [
            (-1_000, "Food", date!(2025 - 10 - 01)),
            (-2_000, "Rent", date!(2025 - 10 - 02)),
            (-3_000, "Food", date!(2025 - 10 - 31)),
            (-4_000, "Food", date!(2025 - 11 - 01)),
        ] {
            create_transaction(
                user.id,
                NewTransaction {
                    amount: Money::new(cents),
                    category: CategoryName::new_unchecked(category),
                    date,
                    note: None,
                },
                &conn,
            )
            .unwrap();
        }
        let state = TransactionsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };
        let query = TransactionsQuery {
            start: Some(date!(2025 - 10 - 01)),
            end: Some(date!(2025 - 10 - 31)),
            category: vec!["Food".to_owned()],
            all: false,
        };

        let response = get_transactions_page(State(state), Extension(user.id), Query(query))
            .await
            .unwrap();

        let document = parse_html_document(response).await;
        let rows = document
            .select(&Selector::parse("tr[data-transaction-id]").unwrap())
            .map(|row| row.value().attr("data-transaction-id").unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(rows, ["3", "1"]);
    }

    fn datalist_options(document: &scraper::Html) -> Vec<String> {
        document
            .select(&Selector::parse("datalist#category-options option").unwrap())
            .map(|option| option.value().attr("value").unwrap().to_owned())
            .collect()
    }

    #[tokio::test]
    async fn offers_preset_categories_before_own_categories() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        for category in ["Travel", "Pets"] {
            create_transaction(
                user.id,
                NewTransaction {
                    amount: Money::new(-500),
                    category: CategoryName::new_unchecked(category),
                    date: date!(2025 - 10 - 01),
                    note: None,
                },
                &conn,
            )
            .unwrap();
        }
        let state = TransactionsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_transactions_page(
            State(state),
            Extension(user.id),
            Query(TransactionsQuery::default()),
        )
        .await
        .unwrap();

        let document = parse_html_document(response).await;
        assert_eq!(
            datalist_options(&document),
            [
                "Food & Drinks",
                "Travel",
                "Subscriptions",
                "Shopping",
                "Rent/Mortgage",
                "Salary",
                "Other",
                "Pets",
            ]
        );
    }

    #[tokio::test]
    async fn new_user_gets_preset_categories() {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        let state = TransactionsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_transactions_page(
            State(state),
            Extension(user.id),
            Query(TransactionsQuery::default()),
        )
        .await
        .unwrap();

        let document = parse_html_document(response).await;
        let options = datalist_options(&document);
        assert_eq!(options.len(), 7);
        assert!(options.contains(&"Food & Drinks".to_owned()));
    }

    async fn render_rows(all: bool) -> (Vec<String>, Vec<String>) {
        let conn = get_test_connection();
        let user = create_test_user("alice", &conn);
        for day in 1..=7 {
            create_transaction(
                user.id,
                NewTransaction {
                    amount: Money::new(-100),
                    category: CategoryName::new_unchecked("Food & Drinks"),
                    date: date!(2025 - 10 - 01).replace_day(day).unwrap(),
                    note: None,
                },
                &conn,
            )
            .unwrap();
        }
        let state = TransactionsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };
        let query = TransactionsQuery {
            all,
            ..Default::default()
        };

        let response = get_transactions_page(State(state), Extension(user.id), Query(query))
            .await
            .unwrap();

        let document = parse_html_document(response).await;
        let rows = document
            .select(&Selector::parse("tr[data-transaction-id]").unwrap())
            .map(|row| row.value().attr("data-transaction-id").unwrap().to_owned())
            .collect();
        let buttons = document
            .select(&Selector::parse("form[method=get] button").unwrap())
            .map(|button| button.text().collect::<String>())
            .filter(|text| text != "Apply")
            .collect();

        (rows, buttons)
    }

    #[tokio::test]
    async fn previews_most_recent_five_transactions() {
        let (rows, buttons) = render_rows(false).await;

        assert_eq!(rows, ["7", "6", "5", "4", "3"]);
        assert_eq!(buttons, ["View all"]);
    }

    #[tokio::test]
    async fn view_all_lists_every_transaction() {
        let (rows, buttons) = render_rows(true).await;

        assert_eq!(rows, ["7", "6", "5", "4", "3", "2", "1"]);
        assert_eq!(buttons, ["Show less"]);
    }
}
