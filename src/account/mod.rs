//! Bank accounts: one per user, holding the current balance.

mod core;

pub use core::{
    ACCOUNT_NUMBER_START, Account, AccountId, AccountNumber, MAX_BALANCE_WHOLE_DIGITS, create_account,
    create_account_table, get_account_by_id, get_account_by_number, get_account_by_user_id,
    set_bankrupt, update_balance,
};
