//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/loans/{loan_id}/pay', use [format_endpoint].

/// The root route which redirects to the transaction report or log in page.
pub const ROOT: &str = "/";
/// The page listing the user's transactions.
pub const REPORT_VIEW: &str = "/report";
/// The page for depositing money.
pub const DEPOSIT_VIEW: &str = "/deposit";
/// The page for withdrawing money.
pub const WITHDRAW_VIEW: &str = "/withdraw";
/// The page for transferring money to another account.
pub const TRANSFER_VIEW: &str = "/transfer";
/// The page listing the user's loans.
pub const LOANS_VIEW: &str = "/loans";
/// The page for requesting a loan.
pub const NEW_LOAN_VIEW: &str = "/loans/new";
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
/// The route to deposit money.
pub const DEPOSIT_API: &str = "/api/deposit";
/// The route to withdraw money.
pub const WITHDRAW_API: &str = "/api/withdraw";
/// The route to transfer money.
pub const TRANSFER_API: &str = "/api/transfer";
/// The route to request a loan.
pub const LOANS_API: &str = "/api/loans";
/// The route to pay back a loan.
pub const PAY_LOAN: &str = "/api/loans/{loan_id}/pay";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::REPORT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::DEPOSIT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::WITHDRAW_VIEW);
        assert_endpoint_is_valid_uri(endpoints::TRANSFER_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOANS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::NEW_LOAN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::REGISTER_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);

        assert_endpoint_is_valid_uri(endpoints::LOG_IN_API);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT);
        assert_endpoint_is_valid_uri(endpoints::USERS);
        assert_endpoint_is_valid_uri(endpoints::DEPOSIT_API);
        assert_endpoint_is_valid_uri(endpoints::WITHDRAW_API);
        assert_endpoint_is_valid_uri(endpoints::TRANSFER_API);
        assert_endpoint_is_valid_uri(endpoints::LOANS_API);
        assert_endpoint_is_valid_uri(endpoints::PAY_LOAN);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint(endpoints::PAY_LOAN, 1);

        assert_eq!(formatted_path, "/api/loans/1/pay");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
