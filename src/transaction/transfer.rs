//! Sending money from the user's account to another account.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{AccountNumber, get_account_by_number, get_account_by_user_id, update_balance},
    auth::UserID,
    endpoints,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    transaction::{
        Transaction, TransactionType,
        amount::Amount,
        core::{TransactionState, create_transaction, load_account},
        form::{AmountForm, amount_form_page},
    },
};

/// The two rows written by a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// The row on the sender's account.
    pub outgoing: Transaction,
    /// The row on the recipient's account.
    pub incoming: Transaction,
}

/// Move `amount` from the account of `user_id` to the account numbered `recipient_no`.
///
/// Both balances change and both rows are written, or nothing is.
///
/// # Errors
/// Returns a:
/// - [Error::RecipientNotFound] if no account has the number `recipient_no`,
/// - [Error::SelfTransfer] if `recipient_no` is the sender's own account,
/// - [Error::InsufficientBalance] if `amount` is more than the sender's balance,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn transfer(
    user_id: UserID,
    recipient_no: AccountNumber,
    amount: Amount,
    connection: &Connection,
) -> Result<Transfer, Error> {
    let transaction = connection.unchecked_transaction()?;

    let sender = get_account_by_user_id(user_id, &transaction)?;
    let recipient = match get_account_by_number(recipient_no, &transaction) {
        Ok(account) => account,
        Err(Error::NotFound) => return Err(Error::RecipientNotFound(recipient_no)),
        Err(error) => return Err(error),
    };

    if sender.id == recipient.id {
        return Err(Error::SelfTransfer);
    }

    if amount.as_decimal() > sender.balance {
        return Err(Error::InsufficientBalance {
            balance: sender.balance,
        });
    }

    let sender_balance = sender.balance - amount.as_decimal();
    let recipient_balance = recipient.balance + amount.as_decimal();

    update_balance(sender.id, sender_balance, &transaction)?;
    update_balance(recipient.id, recipient_balance, &transaction)?;

    let outgoing = create_transaction(
        Transaction::build(sender.id, amount.as_decimal(), TransactionType::Transfer)
            .balance_after(sender_balance)
            .recipient(recipient.account_no),
        &transaction,
    )?;
    let incoming = create_transaction(
        Transaction::build(recipient.id, amount.as_decimal(), TransactionType::Transfer)
            .balance_after(recipient_balance)
            .recipient(recipient.account_no)
            .timestamp(outgoing.timestamp),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(Transfer { outgoing, incoming })
}

fn recipient_input(own_account_no: AccountNumber) -> Markup {
    html! {
        div
        {
            label for="recipient_account_no" class=(FORM_LABEL_STYLE) { "Recipient account number" }

            input
                name="recipient_account_no"
                id="recipient_account_no"
                type="number"
                step="1"
                min="1"
                placeholder="10001"
                required
                class=(FORM_TEXT_INPUT_STYLE);

            p class="mt-1 text-xs text-gray-500 dark:text-gray-400"
            {
                "Your account number is " (own_account_no) "."
            }
        }
    }
}

/// Display the transfer form.
pub async fn get_transfer_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let account = match load_account(&state.db_connection, user_id) {
        Ok(account) => account,
        Err(error) => return error.into_response(),
    };

    amount_form_page(AmountForm {
        title: "Transfer Money",
        view: endpoints::TRANSFER_VIEW,
        endpoint: endpoints::TRANSFER_API,
        submit_label: "Send",
        balance: account.balance,
        extra_fields: Some(recipient_input(account.account_no)),
    })
    .into_response()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferFormData {
    pub recipient_account_no: String,
    pub amount: String,
}

fn parse_account_number(text: &str) -> Result<AccountNumber, Error> {
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidAccountNumber(text.to_owned()))
}

/// A route handler for transferring money, redirects to the report on success.
pub async fn transfer_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransferFormData>,
) -> Response {
    let recipient_no = match parse_account_number(&form.recipient_account_no) {
        Ok(account_no) => account_no,
        Err(error) => return error.into_alert_response(),
    };

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

    match transfer(user_id, recipient_no, amount, &connection) {
        Ok(Transfer { outgoing, incoming }) => {
            tracing::info!(
                "Transferred {} from account {} to account {}",
                outgoing.amount,
                outgoing.account_id,
                incoming.account_id
            );

            (
                HxRedirect(endpoints::REPORT_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!("transfer by user {user_id} to {recipient_no} rejected: {error}");
            error.into_alert_response()
        }
    }
}
