//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    account::{AccountNumber, MAX_BALANCE_WHOLE_DIGITS},
    alert::Alert,
    html::format_currency,
    internal_server_error::InternalServerError,
    not_found::NotFoundError,
    transaction::MAX_APPROVED_LOANS,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is empty or contains characters that are not allowed.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// The username is already registered.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The auth token could not be serialized or deserialized.
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// The amount entered in a form is not a valid amount of money.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The account does not hold enough money for the operation.
    #[error("insufficient balance, the available balance is {balance}")]
    InsufficientBalance {
        /// The balance at the time of the operation.
        balance: Decimal,
    },

    /// The operation would take the balance past the largest balance an account can hold.
    #[error("the new balance would exceed the account balance limit")]
    BalanceLimitExceeded,

    /// Withdrawals are disabled for accounts flagged as bankrupt.
    #[error("the account is bankrupt")]
    AccountBankrupt,

    /// The account already has the maximum number of approved loans.
    #[error("the account already has the maximum number of approved loans")]
    LoanLimitReached,

    /// Tried to pay back a loan that has not been approved.
    #[error("the loan has not been approved")]
    LoanNotApproved,

    /// Tried to pay back a loan that has already been paid.
    #[error("the loan has already been paid")]
    LoanAlreadyPaid,

    /// Tried to approve a transaction that is not a pending loan request.
    #[error("transaction {0} is not a pending loan request")]
    NotPendingLoan(i64),

    /// The recipient of a transfer is not a whole number.
    #[error("\"{0}\" is not a valid account number")]
    InvalidAccountNumber(String),

    /// No account has the account number given as the recipient of a transfer.
    #[error("the account {0} does not exist")]
    RecipientNotFound(AccountNumber),

    /// The recipient of a transfer is the sender's own account.
    #[error("cannot transfer money to the same account")]
    SelfTransfer,

    /// The start of a date range is after its end.
    #[error("the start date {start} is after the end date {end}")]
    InvalidDateRange {
        /// The first day of the range.
        start: Date,
        /// The last day of the range.
        end: Date,
    },

    /// A query parameter or form field could not be parsed as a date.
    #[error("could not parse \"{0}\" as a date")]
    InvalidDate(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidAmount(reason) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details: reason,
                },
            ),
            Error::InsufficientBalance { balance } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Insufficient balance".to_owned(),
                    details: format!(
                        "You cannot use more than your available balance of {}.",
                        format_currency(balance)
                    ),
                },
            ),
            Error::BalanceLimitExceeded => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Balance limit reached".to_owned(),
                    details: format!(
                        "An account balance cannot have more than {MAX_BALANCE_WHOLE_DIGITS} \
                        digits before the decimal point."
                    ),
                },
            ),
            Error::AccountBankrupt => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Account is bankrupt".to_owned(),
                    details: "Your account has been bankrupted. You cannot withdraw money."
                        .to_owned(),
                },
            ),
            Error::LoanLimitReached => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Loan limit reached".to_owned(),
                    details: format!(
                        "You already have {MAX_APPROVED_LOANS} approved loans. \
                        Pay back a loan before requesting another one."
                    ),
                },
            ),
            Error::LoanNotApproved => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Loan not approved".to_owned(),
                    details: "Only approved loans can be paid back.".to_owned(),
                },
            ),
            Error::LoanAlreadyPaid => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Loan already paid".to_owned(),
                    details: "This loan has already been paid back.".to_owned(),
                },
            ),
            Error::InvalidAccountNumber(text) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid account number".to_owned(),
                    details: format!("\"{text}\" is not an account number."),
                },
            ),
            Error::RecipientNotFound(account_no) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Unknown account".to_owned(),
                    details: format!(
                        "The account with account number {account_no} doesn't exist."
                    ),
                },
            ),
            Error::SelfTransfer => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid recipient".to_owned(),
                    details: "You cannot transfer money to your own account.".to_owned(),
                },
            ),
            Error::InvalidDateRange { start, end } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date range".to_owned(),
                    details: format!("The start date {start} is after the end date {end}."),
                },
            ),
            Error::InvalidDate(text) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid date".to_owned(),
                    details: format!("Could not read \"{text}\" as a date, use YYYY-MM-DD."),
                },
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Not found".to_owned(),
                    details: "The requested item could not be found. \
                    Try refreshing the page."
                        .to_owned(),
                },
            ),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
