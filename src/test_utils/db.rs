use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    account::{Account, get_account_by_user_id, update_balance},
    auth::{PasswordHash, User, ValidatedPassword, create_user_with_account},
    db::initialize,
};

/// An in-memory database with every table created.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Register `username` with the password "test" and set the balance of their new account.
///
/// The hash uses the minimum bcrypt cost so that tests stay fast.
pub(crate) fn insert_test_user(
    username: &str,
    balance: Decimal,
    connection: &Connection,
) -> (User, Account) {
    let password_hash = PasswordHash::new(ValidatedPassword::new_unchecked("test"), 4)
        .expect("Could not hash password");
    let (user, account) = create_user_with_account(username, password_hash, connection)
        .expect("Could not create test user");

    update_balance(account.id, balance, connection).expect("Could not set test balance");
    let account = get_account_by_user_id(user.id, connection).expect("Could not get account");

    (user, account)
}
