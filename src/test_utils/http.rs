use axum::{body::Body, http::StatusCode, response::Response};
use scraper::Selector;

use super::parse_html_fragment;

#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}

#[track_caller]
pub(crate) fn get_header(response: &Response<Body>, header_name: &str) -> String {
    let header_error_message = format!("Headers missing {header_name}");

    response
        .headers()
        .get(header_name)
        .expect(&header_error_message)
        .to_str()
        .expect("Could not convert to str")
        .to_string()
}

#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    assert_eq!(get_header(response, "hx-redirect"), endpoint);
}

/// The headline of the alert in an alert response, e.g. "Insufficient balance".
pub(crate) async fn get_alert_text(response: Response<Body>) -> String {
    let fragment = parse_html_fragment(response).await;

    fragment
        .select(&Selector::parse("[role=alert] p.font-semibold").unwrap())
        .next()
        .expect("No alert found")
        .text()
        .collect::<String>()
}
