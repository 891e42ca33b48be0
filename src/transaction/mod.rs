//! Deposits, withdrawals, loans, transfers and the transaction report.
//!
//! Every operation that changes a balance reads the account, checks it, writes
//! the new balance and records a [Transaction] inside one SQLite transaction.

mod amount;
mod core;
mod deposit;
mod form;
mod loan;
mod report;
mod transfer;
mod withdraw;

#[cfg(test)]
mod test_utils;

pub use core::{
    MAX_APPROVED_LOANS, Transaction, TransactionId, TransactionType, create_transaction_table,
    get_pending_loans,
};
pub use deposit::{deposit_endpoint, get_deposit_page};
pub use loan::{
    approve_loan, get_loans_page, get_new_loan_page, pay_loan_endpoint, request_loan_endpoint,
};
pub use report::get_report_page;
pub use transfer::{get_transfer_page, transfer_endpoint};
pub use withdraw::{get_withdraw_page, withdraw_endpoint};
