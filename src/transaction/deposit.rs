//! Paying money into the user's own account.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    Error,
    account::{get_account_by_user_id, update_balance},
    auth::UserID,
    endpoints,
    transaction::{
        Transaction, TransactionType,
        amount::Amount,
        core::{TransactionState, create_transaction, load_account},
        form::{AmountForm, AmountFormData, amount_form_page},
    },
};

/// Add `amount` to the balance of the account of `user_id` and record a deposit.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no account, or an [Error::SqlError].
pub fn deposit(
    user_id: UserID,
    amount: Amount,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection.unchecked_transaction()?;

    let account = get_account_by_user_id(user_id, &transaction)?;
    let new_balance = account.balance + amount.as_decimal();

    update_balance(account.id, new_balance, &transaction)?;
    let deposit = create_transaction(
        Transaction::build(account.id, amount.into(), TransactionType::Deposit)
            .balance_after(new_balance),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(deposit)
}

/// Display the deposit form.
pub async fn get_deposit_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let account = match load_account(&state.db_connection, user_id) {
        Ok(account) => account,
        Err(error) => return error.into_response(),
    };

    amount_form_page(AmountForm {
        title: "Deposit",
        view: endpoints::DEPOSIT_VIEW,
        endpoint: endpoints::DEPOSIT_API,
        submit_label: "Deposit",
        balance: account.balance,
        extra_fields: None,
    })
    .into_response()
}

/// A route handler for depositing money, redirects to the report on success.
pub async fn deposit_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<AmountFormData>,
) -> Response {
    let amount = match form.amount.parse::<Amount>() {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match deposit(user_id, amount, &connection) {
        Ok(transaction) => {
            tracing::info!(
                "Deposited {} into account {}, new balance {}",
                transaction.amount,
                transaction.account_id,
                transaction.balance_after_transaction
            );

            (
                HxRedirect(endpoints::REPORT_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("could not deposit: {error}");
            error.into_alert_response()
        }
    }
}
