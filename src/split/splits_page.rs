//! The page for splitting bills with friends and settling up.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID, Username,
    auth::get_usernames,
    endpoints,
    friend::get_friendships,
    html::{
        BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE,
        FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        amount_input, base, format_currency, submit_button,
    },
    money::Money,
    navigation::NavBar,
    split::core::{Split, get_balances, get_splits},
};

/// The state needed for the splits page.
#[derive(Debug, Clone)]
pub struct SplitsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SplitsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

struct SplitsPageData {
    user_id: UserID,
    /// The current user first, then their friends.
    candidates: Vec<UserID>,
    balances: Vec<(UserID, Money)>,
    splits: Vec<Split>,
    usernames: HashMap<UserID, Username>,
}

impl SplitsPageData {
    fn username(&self, user_id: UserID) -> String {
        if user_id == self.user_id {
            return "You".to_owned();
        }

        self.usernames
            .get(&user_id)
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("User {user_id}"))
    }
}

/// Render the split form, the balances with friends and the user's splits.
pub async fn get_splits_page(
    State(state): State<SplitsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let friendships = get_friendships(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get friendships: {error}"))?;
        let balances = get_balances(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get balances: {error}"))?;
        let splits = get_splits(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get splits: {error}"))?;

        let candidates: Vec<UserID> = std::iter::once(user_id)
            .chain(friendships.friends.iter().map(|friend| friend.user_id))
            .collect();

        let mut user_ids = candidates.clone();
        user_ids.extend(balances.iter().map(|(other, _)| *other));
        for split in &splits {
            user_ids.push(split.payer);
            user_ids.extend(split.shares.iter().map(|share| share.participant));
        }

        let usernames = get_usernames(&user_ids, &connection)
            .inspect_err(|error| tracing::error!("could not get usernames: {error}"))?;

        SplitsPageData {
            user_id,
            candidates,
            balances,
            splits,
            usernames,
        }
    };

    Ok(splits_view(&data).into_response())
}

fn split_form(data: &SplitsPageData) -> Markup {
    html! {
        form
            hx-post=(endpoints::SPLITS_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Split a Bill" }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    name="description"
                    id="description"
                    type="text"
                    placeholder="Dinner at Luigi's"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (amount_input("total", "Total paid", None))

            div
            {
                span class=(FORM_LABEL_STYLE) { "Split" }

                div class=(FORM_RADIO_GROUP_STYLE)
                {
                    div class="flex-1 flex"
                    {
                        input
                            name="mode"
                            id="mode-even"
                            type="radio"
                            value="even"
                            checked
                            required
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for="mode-even" class=(FORM_RADIO_LABEL_STYLE) { "Evenly" }
                    }

                    div class="flex-1 flex"
                    {
                        input
                            name="mode"
                            id="mode-custom"
                            type="radio"
                            value="custom"
                            required
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for="mode-custom" class=(FORM_RADIO_LABEL_STYLE) { "By amount" }
                    }
                }
            }

            fieldset class="space-y-2"
            {
                legend class=(FORM_LABEL_STYLE) { "Participants" }

                @for &candidate in &data.candidates {
                    @let checkbox_id = format!("participant-{candidate}");

                    div class="flex items-center gap-3" data-participant=(candidate)
                    {
                        input
                            type="checkbox"
                            name="participant"
                            id=(checkbox_id)
                            value=(candidate)
                            checked[candidate == data.user_id]
                            class="w-4 h-4 rounded";

                        label for=(checkbox_id) class="flex-1 text-sm"
                        {
                            (data.username(candidate))
                        }

                        input type="hidden" name="share_participant" value=(candidate);

                        input
                            type="number"
                            name="share"
                            step="0.01"
                            min="0"
                            placeholder="0.00"
                            aria-label={ "Share for " (data.username(candidate)) }
                            class="w-28 p-1.5 rounded text-sm bg-gray-50 border border-gray-300
                                dark:bg-gray-700 dark:border-gray-600";
                    }
                }

                @if data.candidates.len() == 1 {
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Add friends to split bills with them."
                    }
                }
            }

            (submit_button("Split Bill"))
        }
    }
}

fn balances_card(data: &SplitsPageData) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-3" { "Balances" }

            @if data.balances.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400" { "You are all settled up." }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for &(other, balance) in &data.balances {
                        li class="flex justify-between py-2" data-balance=(balance.cents())
                        {
                            @if balance.is_positive() {
                                span { (data.username(other)) " owes you" }
                                span class="text-green-600" { (format_currency(balance)) }
                            } @else {
                                span { "You owe " (data.username(other)) }
                                span class="text-red-600" { (format_currency(-balance)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn split_card(split: &Split, data: &SplitsPageData) -> Markup {
    let settle_url = endpoints::format_endpoint(endpoints::SETTLE_SHARE, split.id);

    html! {
        section class=(CARD_STYLE) data-split-id=(split.id)
        {
            div class="flex justify-between items-baseline mb-2"
            {
                h3 class="text-lg font-semibold" { (split.description) }
                span class="font-semibold" { (format_currency(split.total)) }
            }

            p class="text-sm text-gray-500 dark:text-gray-400 mb-3"
            {
                "Paid by " (data.username(split.payer)) " on " (split.created_at.date())
            }

            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Participant" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Share" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                    }
                }

                tbody
                {
                    @for share in &split.shares {
                        @let can_settle = !share.settled
                            && share.participant != split.payer
                            && (data.user_id == split.payer || data.user_id == share.participant);

                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (data.username(share.participant)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(share.amount)) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                @if share.participant == split.payer {
                                    "Paid"
                                } @else if share.settled {
                                    "Settled"
                                } @else if can_settle {
                                    button
                                        type="button"
                                        class=(BUTTON_SECONDARY_STYLE)
                                        hx-post=(settle_url)
                                        hx-vals=(format!(r#"{{"participant": {}}}"#, share.participant))
                                        hx-target-error="#alert-container"
                                    {
                                        "Settle"
                                    }
                                } @else {
                                    "Unsettled"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn splits_view(data: &SplitsPageData) -> Markup {
    let nav_bar = NavBar::new(endpoints::SPLITS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl grid gap-6 lg:grid-cols-3"
            {
                div class="space-y-6"
                {
                    div class=(CARD_STYLE) { (split_form(data)) }
                    (balances_card(data))
                }

                div class="lg:col-span-2 space-y-4"
                {
                    h1 class="text-2xl font-bold" { "Splits" }

                    @for split in &data.splits {
                        (split_card(split, data))
                    }

                    @if data.splits.is_empty() {
                        p class="text-sm text-gray-500 dark:text-gray-400"
                        {
                            "Bills you split with friends will show up here."
                        }
                    }
                }
            }
        }
    };

    base("Splits", &[], &content)
}
