//! Taking money out of the user's own account.

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

/// Take `amount` out of the account of `user_id` and record a withdrawal.
///
/// Nothing is changed if an error is returned.
///
/// # Errors
/// Returns a:
/// - [Error::AccountBankrupt] if the account is flagged as bankrupt,
/// - [Error::InsufficientBalance] if `amount` is more than the balance,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn withdraw(
    user_id: UserID,
    amount: Amount,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection.unchecked_transaction()?;

    let account = get_account_by_user_id(user_id, &transaction)?;

    if account.is_bankrupt {
        return Err(Error::AccountBankrupt);
    }

    if amount.as_decimal() > account.balance {
        return Err(Error::InsufficientBalance {
            balance: account.balance,
        });
    }

    let new_balance = account.balance - amount.as_decimal();

    update_balance(account.id, new_balance, &transaction)?;
    let withdrawal = create_transaction(
        Transaction::build(account.id, amount.into(), TransactionType::Withdrawal)
            .balance_after(new_balance),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(withdrawal)
}

/// Display the withdraw form.
pub async fn get_withdraw_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let account = match load_account(&state.db_connection, user_id) {
        Ok(account) => account,
        Err(error) => return error.into_response(),
    };

    amount_form_page(AmountForm {
        title: "Withdraw Money",
        view: endpoints::WITHDRAW_VIEW,
        endpoint: endpoints::WITHDRAW_API,
        submit_label: "Withdraw",
        balance: account.balance,
        extra_fields: None,
    })
    .into_response()
}

/// A route handler for withdrawing money, redirects to the report on success.
pub async fn withdraw_endpoint(
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

    match withdraw(user_id, amount, &connection) {
        Ok(transaction) => {
            tracing::info!(
                "Withdrew {} from account {}, new balance {}",
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
            tracing::warn!("withdrawal by user {user_id} rejected: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod withdraw_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        account::{get_account_by_user_id, set_bankrupt},
        test_utils::{get_test_connection, insert_test_user},
        transaction::{TransactionType, core::get_account_transactions},
    };

    use super::withdraw;

    #[test]
    fn withdraw_more_than_balance_is_rejected_then_smaller_amount_succeeds() {
        let connection = get_test_connection();
        let (user, account) = insert_test_user("alice", dec!(100.00), &connection);

        let result = withdraw(user.id, "150.00".parse().unwrap(), &connection);

        assert_eq!(
            result,
            Err(Error::InsufficientBalance {
                balance: dec!(100.00)
            })
        );
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(100.00)
        );
        assert!(get_account_transactions(account.id, &connection).unwrap().is_empty());

        let transaction = withdraw(user.id, "50.00".parse().unwrap(), &connection).unwrap();

        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(50.00)
        );
        assert_eq!(transaction.transaction_type, TransactionType::Withdrawal);
        assert_eq!(transaction.balance_after_transaction, dec!(50.00));
    }

    #[test]
    fn can_withdraw_entire_balance() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(100.00), &connection);

        withdraw(user.id, "100.00".parse().unwrap(), &connection).unwrap();

        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(0)
        );
    }

    #[test]
    fn bankrupt_account_cannot_withdraw() {
        let connection = get_test_connection();
        let (user, account) = insert_test_user("alice", dec!(100.00), &connection);
        set_bankrupt(account.account_no, true, &connection).unwrap();

        let result = withdraw(user.id, "1.00".parse().unwrap(), &connection);

        assert_eq!(result, Err(Error::AccountBankrupt));
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(100.00)
        );
        assert!(get_account_transactions(account.id, &connection).unwrap().is_empty());
    }
}
