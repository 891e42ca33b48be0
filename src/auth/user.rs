//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, ErrorCode};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, create_account},
    auth::PasswordHash,
};

/// The most characters a username may have.
pub const USERNAME_MAX_LENGTH: usize = 150;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Trim `raw_username` and check that it is a valid username.
///
/// Usernames are 1 to 150 characters made of letters, digits and `@ . + - _`.
///
/// # Errors
///
/// Returns [Error::InvalidUsername] explaining what is wrong with the username.
pub fn validate_username(raw_username: &str) -> Result<String, Error> {
    let username = raw_username.trim();

    if username.is_empty() {
        return Err(Error::InvalidUsername("username cannot be empty".to_owned()));
    }

    if username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(Error::InvalidUsername(format!(
            "username cannot be longer than {USERNAME_MAX_LENGTH} characters"
        )));
    }

    let is_allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(is_allowed) {
        return Err(Error::InvalidUsername(
            "username may only contain letters, digits and @/./+/-/_".to_owned(),
        ));
    }

    Ok(username.to_owned())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateUsername] if `username` is already registered.
/// - [Error::SqlError] if another SQL related error occurred.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .execute(
            "INSERT INTO user (username, password) VALUES (?1, ?2)",
            (username, password_hash.as_ref()),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == ErrorCode::ConstraintViolation =>
            {
                Error::DuplicateUsername(username.to_owned())
            }
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        password_hash,
    })
}

/// Register a user and open their bank account in a single transaction.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateUsername] if `username` is already registered.
/// - [Error::SqlError] if another SQL related error occurred.
pub fn create_user_with_account(
    username: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(User, Account), Error> {
    let transaction = connection.unchecked_transaction()?;

    let user = create_user(username, password_hash, &transaction)?;
    let account = create_account(user.id, &transaction)?;

    transaction.commit()?;

    Ok((user, account))
}

fn map_row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let username = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id,
        username,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user registered with `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if nobody has registered `username`.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password FROM user WHERE username = :username")?
        .query_row(&[(":username", username)], map_row_to_user)
        .map_err(|error| error.into())
}

/// Replace the password hash of `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}


#[cfg(test)]
mod validate_username_tests {
    use crate::Error;

    use super::{USERNAME_MAX_LENGTH, validate_username};

    #[test]
    fn trims_whitespace() {
        assert_eq!(validate_username("  alice "), Ok("alice".to_owned()));
    }

    #[test]
    fn accepts_email_like_names() {
        assert!(validate_username("alice.smith+bank@example.com").is_ok());
    }

    #[test]
    fn rejects_empty_username() {
        assert!(matches!(
            validate_username("   "),
            Err(Error::InvalidUsername(_))
        ));
    }

    #[test]
    fn rejects_spaces_and_symbols() {
        assert!(matches!(
            validate_username("alice smith"),
            Err(Error::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username("alice!"),
            Err(Error::InvalidUsername(_))
        ));
    }

    #[test]
    fn rejects_long_username() {
        let username = "a".repeat(USERNAME_MAX_LENGTH + 1);

        assert!(matches!(
            validate_username(&username),
            Err(Error::InvalidUsername(_))
        ));
    }
}
