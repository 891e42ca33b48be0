//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    transaction::{
        deposit_endpoint, get_deposit_page, get_loans_page, get_new_loan_page, get_report_page,
        get_transfer_page, get_withdraw_page, pay_loan_endpoint, request_loan_endpoint,
        transfer_endpoint, withdraw_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::REPORT_VIEW, get(get_report_page))
        .route(endpoints::DEPOSIT_VIEW, get(get_deposit_page))
        .route(endpoints::WITHDRAW_VIEW, get(get_withdraw_page))
        .route(endpoints::TRANSFER_VIEW, get(get_transfer_page))
        .route(endpoints::LOANS_VIEW, get(get_loans_page))
        .route(endpoints::NEW_LOAN_VIEW, get(get_new_loan_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // Form posts come from HTMX, so auth redirects must use the HX-Redirect header.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::DEPOSIT_API, post(deposit_endpoint))
            .route(endpoints::WITHDRAW_API, post(withdraw_endpoint))
            .route(endpoints::TRANSFER_API, post(transfer_endpoint))
            .route(endpoints::LOANS_API, post(request_loan_endpoint))
            .route(endpoints::PAY_LOAN, post(pay_loan_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the transaction report.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::REPORT_VIEW)
}

#[cfg(test)]
mod root_route_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{endpoints, routing::get_index_page};

    #[tokio::test]
    async fn root_redirects_to_report() {
        let response = get_index_page().await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response.headers().get("location").unwrap();
        assert_eq!(location, endpoints::REPORT_VIEW);
    }
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::{AppState, endpoints, test_utils::insert_test_user};

    use super::build_router;

    fn get_test_server() -> (TestServer, AppState) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        let state = AppState::new(connection, "42", "Etc/UTC").expect("Could not create state");
        let mut server =
            TestServer::try_new(build_router(state.clone())).expect("Could not create test server.");
        server.save_cookies();

        (server, state)
    }

    async fn log_in(server: &TestServer, username: &str) {
        server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", username), ("password", "test")])
            .await
            .assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (server, _) = get_test_server();

        server
            .get("/no/such/page")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn public_pages_do_not_need_log_in() {
        let (server, _) = get_test_server();

        server.get(endpoints::LOG_IN_VIEW).await.assert_status_ok();
        server.get(endpoints::REGISTER_VIEW).await.assert_status_ok();
    }

    #[tokio::test]
    async fn pages_redirect_to_log_in_without_cookie() {
        let (server, _) = get_test_server();

        for page in [
            endpoints::REPORT_VIEW,
            endpoints::DEPOSIT_VIEW,
            endpoints::WITHDRAW_VIEW,
            endpoints::TRANSFER_VIEW,
            endpoints::LOANS_VIEW,
            endpoints::NEW_LOAN_VIEW,
        ] {
            let response = server.get(page).await;

            response.assert_status(StatusCode::SEE_OTHER);
            let location = response.header("location");
            assert!(
                location
                    .to_str()
                    .unwrap()
                    .starts_with(endpoints::LOG_IN_VIEW),
                "{page} redirected to {location:?}"
            );
        }
    }

    #[tokio::test]
    async fn api_routes_use_hx_redirect_without_cookie() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::DEPOSIT_API)
            .form(&[("amount", "10")])
            .await;

        assert!(
            response.maybe_header("hx-redirect").is_some(),
            "want hx-redirect header"
        );
    }

    #[tokio::test]
    async fn logged_in_user_can_deposit_and_see_report() {
        let (server, state) = get_test_server();
        {
            let connection = state.db_connection.lock().unwrap();
            insert_test_user("alice", dec!(0), &connection);
        }
        log_in(&server, "alice").await;

        server
            .post(endpoints::DEPOSIT_API)
            .form(&[("amount", "12.50")])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let report = server.get(endpoints::REPORT_VIEW).await;
        report.assert_status_ok();
        assert!(report.text().contains("$12.50"));
    }
}
