//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/splits/{split_id}/settle', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for recording and listing a user's transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for setting monthly budgets and seeing overruns.
pub const BUDGETS_VIEW: &str = "/budgets";
/// The page for sending and accepting friend requests.
pub const FRIENDS_VIEW: &str = "/friends";
/// The page for splitting bills with friends.
pub const SPLITS_VIEW: &str = "/splits";
/// The page for asking the assistant questions about your finances.
pub const ASSISTANT_VIEW: &str = "/assistant";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route to record transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to set a budget.
pub const BUDGETS_API: &str = "/api/budgets";
/// The route to send a friend request.
pub const FRIENDS_API: &str = "/api/friends";
/// The route to accept a friend request.
pub const ACCEPT_FRIEND_REQUEST: &str = "/api/friends/{request_id}/accept";
/// The route to create a split.
pub const SPLITS_API: &str = "/api/splits";
/// The route for a participant to settle their share of a split.
pub const SETTLE_SHARE: &str = "/api/splits/{split_id}/settle";
/// The route to ask the assistant a question.
pub const ASSISTANT_API: &str = "/api/assistant";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/friends/{request_id}/accept', '{request_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
