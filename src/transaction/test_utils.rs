use std::sync::{Arc, Mutex};

use axum::{body::Body, http::StatusCode, response::Response};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    account::{AccountId, get_account_by_user_id},
    auth::UserID,
    transaction::{Transaction, core::get_account_transactions},
};

use super::core::TransactionState;

pub(crate) fn get_test_state(connection: Connection) -> TransactionState {
    TransactionState {
        db_connection: Arc::new(Mutex::new(connection)),
        local_timezone: "Etc/UTC".to_owned(),
    }
}

#[track_caller]
pub(crate) fn balance_of(user_id: UserID, state: &TransactionState) -> Decimal {
    let connection = state.db_connection.lock().unwrap();

    get_account_by_user_id(user_id, &connection)
        .expect("Could not get account")
        .balance
}

#[track_caller]
pub(crate) fn transactions_of(account_id: AccountId, state: &TransactionState) -> Vec<Transaction> {
    let connection = state.db_connection.lock().unwrap();

    get_account_transactions(account_id, &connection).expect("Could not get transactions")
}

#[track_caller]
pub(crate) fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(
        response.status(),
        status,
        "got status {}, want {status}",
        response.status()
    );
}
