//! The page for asking the assistant questions about your finances.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

use crate::{
    endpoints,
    html::{
        BUTTON_SECONDARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, base, submit_button,
    },
    navigation::NavBar,
};

/// One-click questions shown above the question box.
pub const QUICK_QUESTIONS: [&str; 9] = [
    "How much did I spend on food this month?",
    "What's my biggest expense category this month?",
    "How much did I spend in the last 30 days?",
    "What's my total spending by category?",
    "Which budgets am I over this month?",
    "What's my total income this month?",
    "Compare my income vs expenses this month.",
    "What's my net savings this month?",
    "How much budget do I have left this month?",
];

/// Render the question form with the quick questions.
pub async fn get_assistant_page() -> Response {
    assistant_view().into_response()
}

fn quick_questions() -> Markup {
    html! {
        div class="flex flex-wrap gap-2"
        {
            @for question in QUICK_QUESTIONS {
                button
                    type="button"
                    class=(BUTTON_SECONDARY_STYLE)
                    data-question=(question)
                    onclick="document.getElementById('question').value = this.dataset.question"
                {
                    (question)
                }
            }
        }
    }
}

fn question_form() -> Markup {
    html! {
        form
            hx-post=(endpoints::ASSISTANT_API)
            hx-target="#answer"
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="w-full space-y-4"
        {
            div
            {
                label for="question" class=(FORM_LABEL_STYLE) { "Your question" }

                textarea
                    name="question"
                    id="question"
                    rows="3"
                    placeholder="How much did I spend on groceries this month?"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {}
            }

            (submit_button("Ask"))
        }
    }
}

fn assistant_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::ASSISTANT_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-3xl space-y-6"
            {
                section class=(CARD_STYLE)
                {
                    h1 class="text-2xl font-bold mb-2" { "Assistant" }
                    p class="text-sm text-gray-500 dark:text-gray-400 mb-4"
                    {
                        "Ask about your spending, income and budgets. "
                        "The assistant sees this month's totals, the last 30 days and your budgets."
                    }

                    h2 class="text-lg font-semibold mb-2" { "Quick questions" }
                    (quick_questions())
                }

                section class=(CARD_STYLE) { (question_form()) }

                section id="answer" class=(CARD_STYLE) aria-live="polite"
                {
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        "Answers will show up here."
                    }
                }
            }
        }
    };

    base("Assistant", &[], &content)
}
