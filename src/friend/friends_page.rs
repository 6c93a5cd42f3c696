//! The page for sending, accepting and listing friend requests.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, UserID, endpoints,
    friend::core::{FriendEntry, Friendships, get_friendships},
    html::{
        BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base, format_currency, submit_button,
    },
    money::Money,
    navigation::NavBar,
    split::net_balance,
};

/// The state needed for the friends page.
#[derive(Debug, Clone)]
pub struct FriendsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FriendsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the friend request form and the user's friends and pending requests.
pub async fn get_friends_page(
    State(state): State<FriendsPageState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let (friendships, balances) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let friendships = get_friendships(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not get friendships: {error}"))?;
        let balances = friendships
            .friends
            .iter()
            .map(|friend| net_balance(user_id, friend.user_id, &connection))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|error| tracing::error!("could not get friend balances: {error}"))?;

        (friendships, balances)
    };

    Ok(friends_view(&friendships, &balances).into_response())
}

fn friend_request_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::FRIENDS_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4"
        {
            h2 class="text-xl font-bold" { "Add Friend" }

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    name="username"
                    id="username"
                    type="text"
                    placeholder="Their username"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (submit_button("Send Request"))
        }
    }
}

fn friend_list(title: &str, entries: &[FriendEntry], empty_message: &str, accept: bool) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-3" { (title) }

            @if entries.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400" { (empty_message) }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for entry in entries {
                        li class="flex items-center justify-between py-2"
                        {
                            span { (entry.username) }

                            @if accept {
                                button
                                    type="button"
                                    class=(BUTTON_SECONDARY_STYLE)
                                    hx-post=(endpoints::format_endpoint(
                                        endpoints::ACCEPT_FRIEND_REQUEST,
                                        entry.friendship_id,
                                    ))
                                    hx-target-error="#alert-container"
                                {
                                    "Accept"
                                }
                            } @else {
                                span class="text-xs text-gray-500 dark:text-gray-400"
                                {
                                    (entry.created_at.date())
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The accepted friends, each with what they owe the user (positive) or what
/// the user owes them (negative).
fn friends_card(friends: &[FriendEntry], balances: &[Money]) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-3" { "Friends" }

            @if friends.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Add a friend to start splitting bills."
                }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for (friend, &balance) in friends.iter().zip(balances) {
                        li class="flex items-center justify-between py-2"
                            data-balance=(balance.cents())
                        {
                            span { (friend.username) }

                            @if balance.is_positive() {
                                span class="text-sm text-green-600"
                                {
                                    "Owes you " (format_currency(balance))
                                }
                            } @else if balance.is_negative() {
                                span class="text-sm text-red-600"
                                {
                                    "You owe " (format_currency(-balance))
                                }
                            } @else {
                                span class="text-xs text-gray-500 dark:text-gray-400"
                                {
                                    "Settled up"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn friends_view(friendships: &Friendships, balances: &[Money]) -> Markup {
    let nav_bar = NavBar::new(endpoints::FRIENDS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-3xl space-y-6"
            {
                div class=(CARD_STYLE) { (friend_request_form()) }

                (friend_list(
                    "Incoming Requests",
                    &friendships.incoming,
                    "No one has sent you a friend request.",
                    true,
                ))
                (friend_list(
                    "Sent Requests",
                    &friendships.outgoing,
                    "You have no pending requests.",
                    false,
                ))
                (friends_card(&friendships.friends, balances))
            }
        }
    };

    base("Friends", &[], &content)
}

#[cfg(test)]
mod friends_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use scraper::Selector;

    use crate::{
        endpoints,
        friend::core::{accept_friend_request, send_friend_request},
        money::Money,
        split::{Allocation, NewSplit, create_split},
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_status_ok,
            assert_valid_html, create_test_user, get_test_connection, must_get_form,
            parse_html_document,
        },
    };

    use super::{FriendsPageState, get_friends_page};

    #[tokio::test]
    async fn renders_form_and_accept_buttons() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let request = send_friend_request(bob.id, alice.id, &conn).unwrap();
        let state = FriendsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = get_friends_page(State(state), Extension(alice.id))
            .await
            .expect("Could not render friends page");

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::FRIENDS_API, "hx-post");
        assert_form_input(&form, "username", "text");
        assert_form_submit_button(&form);

        let accept_urls = document
            .select(&Selector::parse("button[hx-post]").unwrap())
            .map(|button| button.value().attr("hx-post").unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            accept_urls,
            [endpoints::format_endpoint(
                endpoints::ACCEPT_FRIEND_REQUEST,
                request.id
            )]
        );
    }

    #[tokio::test]
    async fn shows_net_balance_for_each_friend() {
        let conn = get_test_connection();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let carol = create_test_user("carol", &conn);
        for friend in [bob.id, carol.id] {
            let request = send_friend_request(alice.id, friend, &conn).unwrap();
            accept_friend_request(request.id, friend, &conn).unwrap();
        }
        let split = |payer, participant, cents| NewSplit {
            payer,
            total: Money::new(cents),
            description: "Lunch".to_owned(),
            shares: vec![Allocation {
                participant,
                amount: Money::new(cents),
            }],
        };
        create_split(split(alice.id, bob.id, 2_000), &conn).unwrap();
        create_split(split(bob.id, alice.id, 500), &conn).unwrap();
        let state = FriendsPageState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = get_friends_page(State(state), Extension(alice.id))
            .await
            .expect("Could not render friends page");

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        let balances = document
            .select(&Selector::parse("li[data-balance]").unwrap())
            .map(|item| {
                (
                    item.value().attr("data-balance").unwrap().to_owned(),
                    item.text().collect::<String>(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].0, "1500");
        assert!(balances[0].1.contains("Owes you $15.00"));
        assert_eq!(balances[1].0, "0");
        assert!(balances[1].1.contains("Settled up"));
    }
}
