//! The transaction history of the current user, optionally limited to a date range.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rust_decimal::Decimal;
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use time_tz::Tz;

use crate::{
    Error,
    account::{Account, get_account_by_user_id},
    alert::Alert,
    auth::{UserID, get_user_by_id},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
        format_timestamp,
    },
    navigation::NavBar,
    timezone::{get_timezone, to_local_time},
    transaction::{
        Transaction, TransactionType,
        core::{TransactionState, get_account_transactions},
    },
};

/// The query parameters of the report page.
///
/// Dates are kept as text so that a malformed date gets an alert instead of a rejected request.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// An inclusive range of local dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(text.to_owned()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.trim().is_empty())
}

/// Read the date range from the report query.
///
/// Returns `Ok(None)` unless both dates are given.
///
/// # Errors
/// Returns [Error::InvalidDate] if a date is not formatted as YYYY-MM-DD, or
/// [Error::InvalidDateRange] if the start date is after the end date.
pub fn parse_date_range(query: &ReportQuery) -> Result<Option<DateRange>, Error> {
    let start = non_empty(&query.start_date).map(parse_date).transpose()?;
    let end = non_empty(&query.end_date).map(parse_date).transpose()?;

    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(Error::InvalidDateRange { start, end }),
        (Some(start), Some(end)) => Ok(Some(DateRange { start, end })),
        _ => Ok(None),
    }
}

/// Keep the transactions whose timestamp falls in `range` in the local timezone.
pub fn filter_by_local_date(
    transactions: Vec<Transaction>,
    range: DateRange,
    local_timezone: &Tz,
) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|transaction| {
            range.contains(to_local_time(transaction.timestamp, local_timezone).date())
        })
        .collect()
}

/// The total of the amounts of `transactions`.
pub fn sum_amounts(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .map(|transaction| transaction.amount)
        .sum()
}

fn describe(transaction: &Transaction, account: &Account) -> String {
    match (transaction.transaction_type, transaction.recipient_account_no) {
        (TransactionType::Transfer, Some(recipient)) if recipient == account.account_no => {
            "Transfer in".to_owned()
        }
        (TransactionType::Transfer, Some(recipient)) => format!("Transfer to {recipient}"),
        (TransactionType::Loan, _) if !transaction.loan_approve => "Loan (pending)".to_owned(),
        (transaction_type, _) => transaction_type.label().to_owned(),
    }
}

struct ReportView<'a> {
    username: &'a str,
    account: &'a Account,
    transactions: &'a [Transaction],
    range: Option<DateRange>,
    query: &'a ReportQuery,
    local_timezone: &'a Tz,
    alert: Option<Alert>,
}

fn date_filter_form(query: &ReportQuery) -> Markup {
    let start_date = query.start_date.as_deref().unwrap_or_default();
    let end_date = query.end_date.as_deref().unwrap_or_default();

    html! {
        form method="get" action=(endpoints::REPORT_VIEW) class="flex flex-wrap items-end gap-4"
        {
            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=(start_date)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                input
                    type="date"
                    name="end_date"
                    id="end_date"
                    value=(end_date)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
            }
        }
    }
}

fn report_view(view: ReportView<'_>) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORT_VIEW).into_html();

    let (summary_label, summary_amount) = match view.range {
        Some(range) => (
            format!("Total from {} to {}", range.start, range.end),
            sum_amounts(view.transactions),
        ),
        None => ("Current balance".to_owned(), view.account.balance),
    };

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-6"
            {
                div
                {
                    h2 class="text-xl font-bold" { "Transaction Report" }
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        (view.username) ", account " span data-account-no { (view.account.account_no) }
                    }
                }

                (date_filter_form(view.query))

                @if let Some(alert) = view.alert {
                    (alert.into_markup())
                }

                p class="text-lg"
                {
                    (summary_label) ": "
                    span data-summary class="font-semibold" { (format_currency(summary_amount)) }
                }

                @if view.transactions.is_empty() {
                    p { "No transactions to show." }
                } @else {
                    div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                    {
                        table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                        {
                            thead class=(TABLE_HEADER_STYLE)
                            {
                                tr
                                {
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Balance after" }
                                }
                            }

                            tbody
                            {
                                @for transaction in view.transactions {
                                    tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
                                    {
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            (format_timestamp(transaction.timestamp, view.local_timezone))
                                        }
                                        td class=(TABLE_CELL_STYLE) { (describe(transaction, view.account)) }
                                        td class=(TABLE_CELL_STYLE) { (format_currency(transaction.amount)) }
                                        td class=(TABLE_CELL_STYLE)
                                        {
                                            (format_currency(transaction.balance_after_transaction))
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Report", &[], &content)
}

/// Render the transactions of the current user, newest first.
///
/// If the query holds a valid date range, only the transactions in that range
/// are shown along with the sum of their amounts. Otherwise the current
/// balance is shown.
pub async fn get_report_page(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let local_timezone = get_timezone(&state.local_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let (user, account, transactions) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let user = get_user_by_id(user_id, &connection)?;
        let account = get_account_by_user_id(user_id, &connection)?;
        let transactions = get_account_transactions(account.id, &connection)?;

        (user, account, transactions)
    };

    let (range, alert) = match parse_date_range(&query) {
        Ok(range) => (range, None),
        Err(error) => {
            tracing::debug!("ignoring report date filter: {error}");
            (None, date_error_alert(error))
        }
    };

    let transactions = match range {
        Some(range) => filter_by_local_date(transactions, range, local_timezone),
        None => transactions,
    };

    Ok(report_view(ReportView {
        username: &user.username,
        account: &account,
        transactions: &transactions,
        range,
        query: &query,
        local_timezone,
        alert,
    })
    .into_response())
}

fn date_error_alert(error: Error) -> Option<Alert> {
    match error {
        Error::InvalidDate(text) => Some(Alert::Error {
            message: "Invalid date".to_owned(),
            details: format!("Could not read \"{text}\" as a date, use YYYY-MM-DD."),
        }),
        Error::InvalidDateRange { start, end } => Some(Alert::Error {
            message: "Invalid date range".to_owned(),
            details: format!("The start date {start} is after the end date {end}."),
        }),
        _ => None,
    }
}
