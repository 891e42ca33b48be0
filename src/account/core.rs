use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{Error, auth::UserID, db::get_decimal};

pub type AccountId = i64;

/// The public number other users type in to send money to an account.
pub type AccountNumber = i64;

/// Account numbers are offset from the owner's user ID so that they are
/// always five digits or more.
pub const ACCOUNT_NUMBER_START: AccountNumber = 10000;

/// Balances must stay below 10^10, the same limit as a single entered amount.
pub const MAX_BALANCE_WHOLE_DIGITS: u32 = 10;

fn balance_limit() -> Decimal {
    Decimal::from(10_i64.pow(MAX_BALANCE_WHOLE_DIGITS))
}

/// A user's bank account.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The account number shown to the user and used as a transfer recipient.
    pub account_no: AccountNumber,
    /// The amount of money currently held in the account.
    pub balance: Decimal,
    /// Bankrupt accounts cannot withdraw money.
    pub is_bankrupt: bool,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE,
            account_no INTEGER NOT NULL UNIQUE,
            balance TEXT NOT NULL DEFAULT '0.00',
            is_bankrupt INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &rusqlite::Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let account_no = row.get(2)?;
    let balance = get_decimal(row, 3)?;
    let is_bankrupt = row.get(4)?;

    Ok(Account {
        id,
        user_id,
        account_no,
        balance,
        is_bankrupt,
    })
}

/// Open an account with a zero balance for `user_id`.
///
/// # Errors
/// Returns an [Error::SqlError] if the user already has an account or does not exist.
pub fn create_account(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    let account_no = ACCOUNT_NUMBER_START + user_id.as_i64();

    connection.execute(
        "INSERT INTO account (user_id, account_no, balance, is_bankrupt) VALUES (?1, ?2, ?3, 0)",
        (user_id.as_i64(), account_no, Decimal::ZERO.to_string()),
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id,
        account_no,
        balance: Decimal::ZERO,
        is_bankrupt: false,
    })
}

/// Get the account owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no account.
pub fn get_account_by_user_id(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, user_id, account_no, balance, is_bankrupt FROM account WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_account)
        .map_err(|error| error.into())
}

/// Get the account with the database ID `account_id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such account.
pub fn get_account_by_id(account_id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, user_id, account_no, balance, is_bankrupt FROM account WHERE id = :id")?
        .query_row(&[(":id", &account_id)], map_row_to_account)
        .map_err(|error| error.into())
}

/// Get the account with the account number `account_no`.
///
/// # Errors
/// Returns [Error::NotFound] if no account has that number.
pub fn get_account_by_number(
    account_no: AccountNumber,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, user_id, account_no, balance, is_bankrupt FROM account WHERE account_no = :account_no",
        )?
        .query_row(&[(":account_no", &account_no)], map_row_to_account)
        .map_err(|error| error.into())
}

/// Overwrite the balance of the account `account_id`.
///
/// Callers are expected to run this inside the same transaction as the
/// insert of the transaction row that explains the change.
///
/// # Errors
/// Returns [Error::BalanceLimitExceeded] if `balance` has more than
/// [MAX_BALANCE_WHOLE_DIGITS] whole digits, or [Error::NotFound] if the account
/// does not exist.
pub fn update_balance(
    account_id: AccountId,
    balance: Decimal,
    connection: &Connection,
) -> Result<(), Error> {
    if balance >= balance_limit() {
        return Err(Error::BalanceLimitExceeded);
    }

    let rows_affected = connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        (balance.to_string(), account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Set or clear the bankrupt flag of the account with the number `account_no`.
///
/// # Errors
/// Returns [Error::NotFound] if no account has that number.
pub fn set_bankrupt(
    account_no: AccountNumber,
    is_bankrupt: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET is_bankrupt = ?1 WHERE account_no = ?2",
        (is_bankrupt, account_no),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
