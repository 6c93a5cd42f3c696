use scraper::{ElementRef, Html, Selector};

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&Selector::parse("form").unwrap())
        .next()
        .expect("No form found")
}

#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let got = form
        .value()
        .attr(attribute)
        .unwrap_or_else(|| panic!("{attribute} attribute missing"));

    assert_eq!(
        got, endpoint,
        "want form with attribute {attribute}=\"{endpoint}\", got {got:?}"
    );
}

/// Assert that `form` has a required input or select named `name`.
///
/// `type_` is ignored for select elements.
#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    let selector = Selector::parse(&format!("input[name={name}], select[name={name}]")).unwrap();
    let input = form
        .select(&selector)
        .next()
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));

    if input.value().name() == "input" {
        let input_type = input.value().attr("type").unwrap_or_default();
        assert_eq!(
            input_type, type_,
            "want input {name} with type \"{type_}\", got {input_type:?}"
        );
    }

    assert!(
        input.value().attr("required").is_some(),
        "want input with name {name} to have the required attribute but got none"
    );
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    let submit_button = form
        .select(&Selector::parse("button").unwrap())
        .next()
        .expect("No button found");

    assert_eq!(
        submit_button.value().attr("type").unwrap_or_default(),
        "submit",
        "want submit button with type=\"submit\""
    );
}

/// Assert that the first alert paragraph in `html` has the text `want_message`.
#[track_caller]
pub(crate) fn assert_form_error_message(html: &Html, want_message: &str) {
    let selector = Selector::parse("div[role=alert] p").unwrap();
    let got_message = html
        .select(&selector)
        .next()
        .expect("No alert message found")
        .text()
        .collect::<String>();

    assert_eq!(want_message, got_message.trim());
}
