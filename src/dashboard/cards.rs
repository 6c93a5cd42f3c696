//! Card components for the dashboard: this month's totals, budget overruns and
//! balances with friends.

use maud::{Markup, html};

use crate::{
    budget::Overrun,
    endpoints,
    html::{CARD_STYLE, LINK_STYLE, format_currency},
    money::Money,
    month::BudgetMonth,
    transaction::Summary,
};

/// A friend and how much they owe the user, negative if the user owes them.
pub(super) struct FriendBalance {
    pub username: String,
    pub balance: Money,
}

fn total_card(label: &str, amount: Money, colour: &str) -> Markup {
    html! {
        div class=(CARD_STYLE) data-total=(label)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class={ "text-2xl font-bold " (colour) } { (format_currency(amount)) }
        }
    }
}

/// Income, expenses and net for the month.
pub(super) fn totals_view(month: BudgetMonth, summary: &Summary) -> Markup {
    let net = summary.net();
    let net_colour = if net.is_negative() {
        "text-red-600"
    } else {
        "text-green-600"
    };

    html! {
        section class="w-full mb-6"
        {
            h2 class="text-xl font-semibold mb-3" { "This month (" (month) ")" }

            div class="grid grid-cols-1 sm:grid-cols-3 gap-4"
            {
                (total_card("Income", summary.income, "text-green-600"))
                (total_card("Expenses", summary.expense, "text-red-600"))
                (total_card("Net", net, net_colour))
            }
        }
    }
}

/// One alert per category over budget, or nothing when every budget is on track.
pub(super) fn overruns_view(overruns: &[Overrun]) -> Markup {
    if overruns.is_empty() {
        return html! {};
    }

    html! {
        section class="w-full mb-6 space-y-2"
        {
            @for overrun in overruns {
                div
                    role="alert"
                    data-overrun=(overrun.category)
                    class="p-4 text-sm text-red-800 border border-red-300 rounded-lg
                        bg-red-50 dark:bg-gray-800 dark:text-red-400 dark:border-red-800"
                {
                    span class="font-semibold" { (overrun.category) " is over budget. " }
                    "You have spent " (format_currency(overrun.spent))
                    " of " (format_currency(overrun.limit))
                    ", " (format_currency(overrun.overage)) " over."
                }
            }

            a href=(endpoints::BUDGETS_VIEW) class=(LINK_STYLE) { "Review budgets" }
        }
    }
}

/// Who owes the user money and who the user owes.
pub(super) fn balances_view(balances: &[FriendBalance]) -> Markup {
    html! {
        section class={ (CARD_STYLE) " mb-6" }
        {
            div class="flex justify-between items-baseline mb-3"
            {
                h2 class="text-xl font-semibold" { "Balances with friends" }
                a href=(endpoints::SPLITS_VIEW) class=(LINK_STYLE) { "Splits" }
            }

            @if balances.is_empty() {
                p class="text-sm text-gray-500 dark:text-gray-400" { "You are all settled up." }
            } @else {
                ul class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for friend in balances {
                        li class="flex justify-between py-2" data-balance=(friend.balance.cents())
                        {
                            @if friend.balance.is_positive() {
                                span { (friend.username) " owes you" }
                                span class="text-green-600" { (format_currency(friend.balance)) }
                            } @else {
                                span { "You owe " (friend.username) }
                                span class="text-red-600" { (format_currency(-friend.balance)) }
                            }
                        }
                    }
                }
            }
        }
    }
}
