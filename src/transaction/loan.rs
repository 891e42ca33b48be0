//! Loan requests, their approval, the loan list and paying loans back.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use rust_decimal::Decimal;
use time_tz::Tz;

use crate::{
    Error,
    account::{get_account_by_id, get_account_by_user_id, update_balance},
    alert::Alert,
    auth::UserID,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_SMALL_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, format_timestamp,
    },
    navigation::NavBar,
    timezone::get_timezone,
    transaction::{
        MAX_APPROVED_LOANS, Transaction, TransactionId, TransactionType,
        amount::Amount,
        core::{
            TransactionState, count_approved_loans, create_transaction, get_account_loans,
            get_transaction, load_account,
        },
        form::{AmountForm, AmountFormData, amount_form_page},
    },
};

/// Record a request for a loan of `amount` on the account of `user_id`.
///
/// The balance does not change until the loan is approved.
///
/// # Errors
/// Returns [Error::LoanLimitReached] if the account already has [MAX_APPROVED_LOANS]
/// approved loans, or an [Error::SqlError].
pub fn request_loan(
    user_id: UserID,
    amount: Amount,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection.unchecked_transaction()?;

    let account = get_account_by_user_id(user_id, &transaction)?;

    if count_approved_loans(account.id, &transaction)? >= MAX_APPROVED_LOANS {
        return Err(Error::LoanLimitReached);
    }

    let loan = create_transaction(
        Transaction::build(account.id, amount.into(), TransactionType::Loan)
            .balance_after(account.balance),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(loan)
}

fn update_loan(
    loan_id: TransactionId,
    transaction_type: TransactionType,
    balance_after: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE \"transaction\"
        SET transaction_type = ?1, balance_after_transaction = ?2, loan_approve = 1
        WHERE id = ?3",
        (transaction_type, balance_after.to_string(), loan_id),
    )?;

    Ok(())
}

/// Approve the pending loan request `loan_id` and credit the loan to its account.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if there is no transaction `loan_id`,
/// - [Error::NotPendingLoan] if it is not a loan waiting for approval,
/// - [Error::LoanLimitReached] if the account already has [MAX_APPROVED_LOANS] approved loans,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn approve_loan(loan_id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection.unchecked_transaction()?;

    let loan = get_transaction(loan_id, &transaction)?;

    if loan.transaction_type != TransactionType::Loan || loan.loan_approve {
        return Err(Error::NotPendingLoan(loan_id));
    }

    if count_approved_loans(loan.account_id, &transaction)? >= MAX_APPROVED_LOANS {
        return Err(Error::LoanLimitReached);
    }

    let account = get_account_by_id(loan.account_id, &transaction)?;
    let new_balance = account.balance + loan.amount;

    update_balance(account.id, new_balance, &transaction)?;
    update_loan(loan_id, TransactionType::Loan, new_balance, &transaction)?;
    let approved = get_transaction(loan_id, &transaction)?;

    transaction.commit()?;

    Ok(approved)
}

/// Pay back the loan `loan_id` from the account of `user_id`.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the loan does not exist or belongs to another account,
/// - [Error::LoanAlreadyPaid] if the loan was already paid back,
/// - [Error::LoanNotApproved] if the loan has not been approved,
/// - [Error::InsufficientBalance] if the loan amount is more than the balance,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn pay_loan(
    user_id: UserID,
    loan_id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection.unchecked_transaction()?;

    let account = get_account_by_user_id(user_id, &transaction)?;
    let loan = get_transaction(loan_id, &transaction)?;

    if loan.account_id != account.id {
        return Err(Error::NotFound);
    }

    match loan.transaction_type {
        TransactionType::LoanPaid => return Err(Error::LoanAlreadyPaid),
        TransactionType::Loan if !loan.loan_approve => return Err(Error::LoanNotApproved),
        TransactionType::Loan => {}
        _ => return Err(Error::NotFound),
    }

    if loan.amount > account.balance {
        return Err(Error::InsufficientBalance {
            balance: account.balance,
        });
    }

    let new_balance = account.balance - loan.amount;

    update_balance(account.id, new_balance, &transaction)?;
    update_loan(loan_id, TransactionType::LoanPaid, new_balance, &transaction)?;
    let paid = get_transaction(loan_id, &transaction)?;

    transaction.commit()?;

    Ok(paid)
}

/// Display the loan request form.
pub async fn get_new_loan_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let account = match load_account(&state.db_connection, user_id) {
        Ok(account) => account,
        Err(error) => return error.into_response(),
    };

    amount_form_page(AmountForm {
        title: "Request a Loan",
        view: endpoints::LOANS_VIEW,
        endpoint: endpoints::LOANS_API,
        submit_label: "Request loan",
        balance: account.balance,
        extra_fields: None,
    })
    .into_response()
}

/// A route handler for requesting a loan.
///
/// The request is confirmed with an alert since nothing changes until the loan is approved.
pub async fn request_loan_endpoint(
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

    match request_loan(user_id, amount, &connection) {
        Ok(loan) => {
            tracing::info!(
                "Loan {} of {} requested for account {}",
                loan.id,
                loan.amount,
                loan.account_id
            );

            (
                StatusCode::OK,
                Alert::Success {
                    message: "Loan requested".to_owned(),
                    details: format!(
                        "Your request for {} is waiting for approval.",
                        format_currency(loan.amount)
                    ),
                }
                .into_html(),
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!("loan request by user {user_id} rejected: {error}");
            error.into_alert_response()
        }
    }
}

fn loan_status(loan: &Transaction) -> &'static str {
    match (loan.transaction_type, loan.loan_approve) {
        (TransactionType::LoanPaid, _) => "Paid",
        (_, true) => "Approved",
        (_, false) => "Pending approval",
    }
}

fn loan_row(loan: &Transaction, local_timezone: &Tz) -> Markup {
    let can_pay = loan.transaction_type == TransactionType::Loan && loan.loan_approve;

    html! {
        tr class=(TABLE_ROW_STYLE) data-loan-id=(loan.id)
        {
            td class=(TABLE_CELL_STYLE) { (format_timestamp(loan.timestamp, local_timezone)) }
            td class=(TABLE_CELL_STYLE) { (format_currency(loan.amount)) }
            td class=(TABLE_CELL_STYLE) data-loan-status { (loan_status(loan)) }
            td class=(TABLE_CELL_STYLE)
            {
                @if can_pay {
                    button
                        type="button"
                        hx-post=(format_endpoint(endpoints::PAY_LOAN, loan.id))
                        hx-target="#alert-container"
                        hx-target-error="#alert-container"
                        hx-confirm="Pay back this loan?"
                        class=(BUTTON_SMALL_STYLE)
                    {
                        "Pay"
                    }
                }
            }
        }
    }
}

/// Display the loans of the current user with a button to pay back approved loans.
pub async fn get_loans_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_timezone = get_timezone(&state.local_timezone).ok_or_else(|| {
        tracing::error!(
            "could not find timezone {}",
            &state.local_timezone
        );
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let (account, loans) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let account = get_account_by_user_id(user_id, &connection)?;
        let loans = get_account_loans(account.id, &connection)?;

        (account, loans)
    };

    let nav_bar = NavBar::new(endpoints::LOANS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-3xl space-y-4"
            {
                div class="flex justify-between items-center"
                {
                    h2 class="text-xl font-bold" { "Loans" }

                    a href=(endpoints::NEW_LOAN_VIEW) class=(LINK_STYLE) { "Request a loan" }
                }

                p class="text-sm text-gray-500 dark:text-gray-400"
                {
                    "Balance: "
                    span data-balance { (format_currency(account.balance)) }
                }

                @if loans.is_empty() {
                    p { "You have no loans." }
                } @else {
                    div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                    {
                        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Requested" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                                }
                            }

                            tbody
                            {
                                @for loan in &loans {
                                    (loan_row(loan, local_timezone))
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    Ok(base("Loans", &[], &content).into_response())
}

/// A route handler for paying back a loan, redirects to the loan list on success.
pub async fn pay_loan_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(loan_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match pay_loan(user_id, loan_id, &connection) {
        Ok(loan) => {
            tracing::info!(
                "Loan {} of {} paid by account {}",
                loan.id,
                loan.amount,
                loan.account_id
            );

            (
                HxRedirect(endpoints::LOANS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!("payment of loan {loan_id} by user {user_id} rejected: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod loan_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        account::{get_account_by_id, get_account_by_user_id},
        test_utils::{get_test_connection, insert_test_user},
        transaction::{
            MAX_APPROVED_LOANS, Transaction, TransactionType,
            core::{create_transaction, get_transaction},
        },
    };

    use super::{approve_loan, pay_loan, request_loan};

    #[test]
    fn request_records_pending_loan_without_changing_balance() {
        let connection = get_test_connection();
        let (user, account) = insert_test_user("alice", dec!(20.00), &connection);

        let loan = request_loan(user.id, "500".parse().unwrap(), &connection).unwrap();

        assert_eq!(loan.account_id, account.id);
        assert_eq!(loan.transaction_type, TransactionType::Loan);
        assert_eq!(loan.amount, dec!(500));
        assert!(!loan.loan_approve);
        assert_eq!(loan.balance_after_transaction, dec!(20.00));
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(20.00)
        );
    }

    #[test]
    fn request_is_rejected_at_approved_loan_limit() {
        let connection = get_test_connection();
        let (user, account) = insert_test_user("alice", dec!(0), &connection);
        for _ in 0..MAX_APPROVED_LOANS {
            create_transaction(
                Transaction::build(account.id, dec!(100), TransactionType::Loan).approved(),
                &connection,
            )
            .unwrap();
        }

        let result = request_loan(user.id, "100".parse().unwrap(), &connection);

        assert_eq!(result, Err(Error::LoanLimitReached));
    }

    #[test]
    fn pending_requests_do_not_count_towards_limit() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(0), &connection);

        for _ in 0..=MAX_APPROVED_LOANS {
            request_loan(user.id, "100".parse().unwrap(), &connection).unwrap();
        }
    }

    #[test]
    fn approve_credits_loan_and_sets_flag() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(20.00), &connection);
        let loan = request_loan(user.id, "500".parse().unwrap(), &connection).unwrap();

        let approved = approve_loan(loan.id, &connection).unwrap();

        assert!(approved.loan_approve);
        assert_eq!(approved.transaction_type, TransactionType::Loan);
        assert_eq!(approved.balance_after_transaction, dec!(520.00));
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(520.00)
        );
    }

    #[test]
    fn cannot_approve_twice() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(0), &connection);
        let loan = request_loan(user.id, "500".parse().unwrap(), &connection).unwrap();
        approve_loan(loan.id, &connection).unwrap();

        let result = approve_loan(loan.id, &connection);

        assert_eq!(result, Err(Error::NotPendingLoan(loan.id)));
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(500)
        );
    }

    #[test]
    fn cannot_approve_other_transaction_types() {
        let connection = get_test_connection();
        let (_, account) = insert_test_user("alice", dec!(0), &connection);
        let deposit = create_transaction(
            Transaction::build(account.id, dec!(5), TransactionType::Deposit),
            &connection,
        )
        .unwrap();

        assert_eq!(
            approve_loan(deposit.id, &connection),
            Err(Error::NotPendingLoan(deposit.id))
        );
    }

    #[test]
    fn approval_is_rejected_at_approved_loan_limit() {
        let connection = get_test_connection();
        let (user, account) = insert_test_user("alice", dec!(0), &connection);
        let requests: Vec<Transaction> = (0..=MAX_APPROVED_LOANS)
            .map(|_| request_loan(user.id, "10".parse().unwrap(), &connection).unwrap())
            .collect();
        let (last, allowed) = requests.split_last().unwrap();
        for loan in allowed {
            approve_loan(loan.id, &connection).unwrap();
        }

        let result = approve_loan(last.id, &connection);

        assert_eq!(result, Err(Error::LoanLimitReached));
        assert!(!get_transaction(last.id, &connection).unwrap().loan_approve);
        assert_eq!(
            get_account_by_id(account.id, &connection).unwrap().balance,
            dec!(10) * rust_decimal::Decimal::from(MAX_APPROVED_LOANS)
        );
    }

    #[test]
    fn approve_missing_loan_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(approve_loan(7, &connection), Err(Error::NotFound));
    }

    #[test]
    fn pay_deducts_amount_and_marks_paid() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(100.00), &connection);
        let loan = request_loan(user.id, "50".parse().unwrap(), &connection).unwrap();
        approve_loan(loan.id, &connection).unwrap();

        let paid = pay_loan(user.id, loan.id, &connection).unwrap();

        assert_eq!(paid.transaction_type, TransactionType::LoanPaid);
        assert!(paid.loan_approve);
        assert_eq!(paid.balance_after_transaction, dec!(100.00));
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(100.00)
        );
        assert_eq!(get_transaction(loan.id, &connection), Ok(paid));
    }

    #[test]
    fn paid_loans_free_up_the_limit() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(0), &connection);
        let mut loans = Vec::new();
        for _ in 0..MAX_APPROVED_LOANS {
            let loan = request_loan(user.id, "10".parse().unwrap(), &connection).unwrap();
            approve_loan(loan.id, &connection).unwrap();
            loans.push(loan);
        }
        assert_eq!(
            request_loan(user.id, "10".parse().unwrap(), &connection),
            Err(Error::LoanLimitReached)
        );

        pay_loan(user.id, loans[0].id, &connection).unwrap();

        assert!(request_loan(user.id, "10".parse().unwrap(), &connection).is_ok());
    }

    #[test]
    fn cannot_pay_unapproved_loan() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(100), &connection);
        let loan = request_loan(user.id, "50".parse().unwrap(), &connection).unwrap();

        assert_eq!(
            pay_loan(user.id, loan.id, &connection),
            Err(Error::LoanNotApproved)
        );
    }

    #[test]
    fn cannot_pay_loan_twice() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(100), &connection);
        let loan = request_loan(user.id, "50".parse().unwrap(), &connection).unwrap();
        approve_loan(loan.id, &connection).unwrap();
        pay_loan(user.id, loan.id, &connection).unwrap();

        assert_eq!(
            pay_loan(user.id, loan.id, &connection),
            Err(Error::LoanAlreadyPaid)
        );
        assert_eq!(
            get_account_by_user_id(user.id, &connection).unwrap().balance,
            dec!(100)
        );
    }

    #[test]
    fn cannot_pay_more_than_balance() {
        let connection = get_test_connection();
        let (user, account) = insert_test_user("alice", dec!(0), &connection);
        let loan = create_transaction(
            Transaction::build(account.id, dec!(50), TransactionType::Loan).approved(),
            &connection,
        )
        .unwrap();

        assert_eq!(
            pay_loan(user.id, loan.id, &connection),
            Err(Error::InsufficientBalance { balance: dec!(0) })
        );
        assert_eq!(
            get_transaction(loan.id, &connection).unwrap().transaction_type,
            TransactionType::Loan
        );
    }

    #[test]
    fn cannot_pay_another_users_loan() {
        let connection = get_test_connection();
        let (alice, _) = insert_test_user("alice", dec!(100), &connection);
        let (bob, _) = insert_test_user("bob", dec!(100), &connection);
        let loan = request_loan(bob.id, "50".parse().unwrap(), &connection).unwrap();
        approve_loan(loan.id, &connection).unwrap();

        assert_eq!(pay_loan(alice.id, loan.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn cannot_pay_missing_loan() {
        let connection = get_test_connection();
        let (user, _) = insert_test_user("alice", dec!(100), &connection);

        assert_eq!(pay_loan(user.id, 1234, &connection), Err(Error::NotFound));
    }
}
