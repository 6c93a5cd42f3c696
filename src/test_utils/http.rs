use axum::{body::Body, http::StatusCode, response::Response};
use axum_test::TestResponse;

#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}

/// Assert that the htmx request was answered with a 303 and an `HX-Redirect` to `endpoint`.
#[track_caller]
pub(crate) fn assert_hx_redirect(response: &TestResponse, endpoint: &str) {
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("hx-redirect"), endpoint);
}
