//! Defines the transaction model, its table and the queries shared by the operations.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    account::{Account, AccountId, AccountNumber, get_account_by_user_id},
    auth::UserID,
    db::get_decimal,
};

pub type TransactionId = i64;

/// An account may hold at most this many approved loans that have not been paid back.
pub const MAX_APPROVED_LOANS: i64 = 3;

/// What kind of event a [Transaction] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    /// Money paid into the account.
    Deposit,
    /// Money taken out of the account.
    Withdrawal,
    /// A loan request. The money is only credited once the loan is approved.
    Loan,
    /// A loan that has been paid back.
    LoanPaid,
    /// Money sent to or received from another account.
    Transfer,
}

impl TransactionType {
    /// The value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Loan => "loan",
            TransactionType::LoanPaid => "loan_paid",
            TransactionType::Transfer => "transfer",
        }
    }

    /// The name shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Loan => "Loan",
            TransactionType::LoanPaid => "Loan Paid",
            TransactionType::Transfer => "Transfer",
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "loan" => Ok(TransactionType::Loan),
            "loan_paid" => Ok(TransactionType::LoanPaid),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(FromSqlError::Other(
                format!("unknown transaction type {other:?}").into(),
            )),
        }
    }
}

/// A change to the balance of an account, or a request for one in the case of an unapproved loan.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account whose balance changed.
    pub account_id: AccountId,
    /// How much money moved. Always positive, the type gives the direction.
    pub amount: Decimal,
    /// What kind of event this is.
    pub transaction_type: TransactionType,
    /// When the transaction happened, in UTC.
    pub timestamp: OffsetDateTime,
    /// The balance of the account right after this transaction.
    pub balance_after_transaction: Decimal,
    /// Whether a loan has been approved. Stays set once the loan is paid.
    pub loan_approve: bool,
    /// The account that received the money of a transfer.
    ///
    /// Both rows of a transfer carry it, so the row is incoming when it equals
    /// the account number of the row's own account.
    pub recipient_account_no: Option<AccountNumber>,
}

impl Transaction {
    /// Start building a new transaction for `account_id`.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            amount,
            transaction_type,
            timestamp: OffsetDateTime::now_utc(),
            balance_after_transaction: Decimal::ZERO,
            loan_approve: false,
            recipient_account_no: None,
        }
    }
}

/// The fields of a [Transaction] that has not been inserted yet.
///
/// The timestamp defaults to now.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub timestamp: OffsetDateTime,
    pub balance_after_transaction: Decimal,
    pub loan_approve: bool,
    pub recipient_account_no: Option<AccountNumber>,
}

impl TransactionBuilder {
    /// Set the balance snapshot.
    pub fn balance_after(mut self, balance: Decimal) -> Self {
        self.balance_after_transaction = balance;
        self
    }

    /// Set the transfer recipient.
    pub fn recipient(mut self, account_no: AccountNumber) -> Self {
        self.recipient_account_no = Some(account_no);
        self
    }

    /// Override when the transaction happened.
    pub fn timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Mark a loan as approved.
    #[cfg(test)]
    pub fn approved(mut self) -> Self {
        self.loan_approve = true;
        self
    }
}

/// The state needed by the pages and endpoints that read or change an account.
#[derive(Debug, Clone)]
pub struct TransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Get the account of `user_id`, taking the database lock for the duration of the query.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned or [Error::NotFound] if the user has no account.
pub fn load_account(db_connection: &Mutex<Connection>, user_id: UserID) -> Result<Account, Error> {
    let connection = db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_account_by_user_id(user_id, &connection)
}

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            balance_after_transaction TEXT NOT NULL,
            loan_approve INTEGER NOT NULL DEFAULT 0,
            recipient_account_no INTEGER,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_timestamp
            ON \"transaction\"(account_id, timestamp)",
        (),
    )?;

    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT id, account_id, amount, transaction_type, timestamp, \
    balance_after_transaction, loan_approve, recipient_account_no FROM \"transaction\"";

pub fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: get_decimal(row, 2)?,
        transaction_type: row.get(3)?,
        timestamp: row.get(4)?,
        balance_after_transaction: get_decimal(row, 5)?,
        loan_approve: row.get(6)?,
        recipient_account_no: row.get(7)?,
    })
}

/// Insert a new transaction.
///
/// # Errors
/// Returns an [Error::SqlError] if the account does not exist or there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection.execute(
        "INSERT INTO \"transaction\" (account_id, amount, transaction_type, timestamp, \
            balance_after_transaction, loan_approve, recipient_account_no)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            builder.account_id,
            builder.amount.to_string(),
            builder.transaction_type,
            builder.timestamp,
            builder.balance_after_transaction.to_string(),
            builder.loan_approve,
            builder.recipient_account_no,
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        account_id: builder.account_id,
        amount: builder.amount,
        transaction_type: builder.transaction_type,
        timestamp: builder.timestamp,
        balance_after_transaction: builder.balance_after_transaction,
        loan_approve: builder.loan_approve,
        recipient_account_no: builder.recipient_account_no,
    })
}

/// Get a transaction by its ID.
///
/// # Errors
/// Returns [Error::NotFound] if there is no transaction with `id`.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(&format!("{SELECT_COLUMNS} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_row_to_transaction)
        .map_err(|error| error.into())
}

/// Get every transaction of `account_id`, newest first.
pub fn get_account_transactions(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE account_id = :account_id ORDER BY timestamp DESC, id DESC"
        ))?
        .query_map(&[(":account_id", &account_id)], map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the loan requests and paid loans of `account_id`, newest first.
pub fn get_account_loans(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE account_id = ?1 AND transaction_type IN (?2, ?3) \
            ORDER BY timestamp DESC, id DESC"
        ))?
        .query_map(
            (account_id, TransactionType::Loan, TransactionType::LoanPaid),
            map_row_to_transaction,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the loan requests of every account that are waiting for approval, oldest first.
pub fn get_pending_loans(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE transaction_type = ?1 AND loan_approve = 0 \
            ORDER BY timestamp ASC, id ASC"
        ))?
        .query_map((TransactionType::Loan,), map_row_to_transaction)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Count the approved loans of `account_id` that have not been paid back.
pub fn count_approved_loans(account_id: AccountId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\"
            WHERE account_id = ?1 AND transaction_type = ?2 AND loan_approve = 1",
            (account_id, TransactionType::Loan),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}


#[cfg(test)]
mod transaction_query_tests {
    use rust_decimal_macros::dec;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        test_utils::{get_test_connection, insert_test_user},
    };

    use super::{
        Transaction, TransactionType, count_approved_loans, create_transaction,
        get_account_loans, get_account_transactions, get_pending_loans, get_transaction,
    };

    #[test]
    fn create_and_get_transaction() {
        let connection = get_test_connection();
        let (_, account) = insert_test_user("alice", dec!(0), &connection);

        let created = create_transaction(
            Transaction::build(account.id, dec!(12.30), TransactionType::Transfer)
                .balance_after(dec!(87.70))
                .recipient(10042),
            &connection,
        )
        .unwrap();

        let got = get_transaction(created.id, &connection).unwrap();
        assert_eq!(got, created);
        assert_eq!(got.amount, dec!(12.30));
        assert_eq!(got.recipient_account_no, Some(10042));
    }

    #[test]
    fn get_missing_transaction_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_transaction(1, &connection), Err(Error::NotFound));
    }

    #[test]
    fn transaction_for_missing_account_is_rejected() {
        let connection = get_test_connection();

        let result = create_transaction(
            Transaction::build(42, dec!(1.00), TransactionType::Deposit),
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn account_transactions_are_newest_first_and_scoped() {
        let connection = get_test_connection();
        let (_, alice) = insert_test_user("alice", dec!(0), &connection);
        let (_, bob) = insert_test_user("bob", dec!(0), &connection);
        let now = OffsetDateTime::now_utc();
        let older = create_transaction(
            Transaction::build(alice.id, dec!(1), TransactionType::Deposit)
                .timestamp(now - Duration::days(1)),
            &connection,
        )
        .unwrap();
        let newer = create_transaction(
            Transaction::build(alice.id, dec!(2), TransactionType::Deposit).timestamp(now),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(bob.id, dec!(3), TransactionType::Deposit),
            &connection,
        )
        .unwrap();

        let got = get_account_transactions(alice.id, &connection).unwrap();

        assert_eq!(got, vec![newer, older]);
    }

    #[test]
    fn loans_exclude_other_types() {
        let connection = get_test_connection();
        let (_, account) = insert_test_user("alice", dec!(0), &connection);
        create_transaction(
            Transaction::build(account.id, dec!(5), TransactionType::Deposit),
            &connection,
        )
        .unwrap();
        let loan = create_transaction(
            Transaction::build(account.id, dec!(100), TransactionType::Loan),
            &connection,
        )
        .unwrap();

        let got = get_account_loans(account.id, &connection).unwrap();

        assert_eq!(got, vec![loan]);
    }

    #[test]
    fn counts_only_approved_outstanding_loans() {
        let connection = get_test_connection();
        let (_, account) = insert_test_user("alice", dec!(0), &connection);
        for builder in [
            Transaction::build(account.id, dec!(100), TransactionType::Loan).approved(),
            Transaction::build(account.id, dec!(100), TransactionType::Loan).approved(),
            Transaction::build(account.id, dec!(100), TransactionType::Loan),
            Transaction::build(account.id, dec!(100), TransactionType::LoanPaid).approved(),
        ] {
            create_transaction(builder, &connection).unwrap();
        }

        assert_eq!(count_approved_loans(account.id, &connection), Ok(2));
    }

    #[test]
    fn pending_loans_span_accounts_and_skip_approved() {
        let connection = get_test_connection();
        let (_, alice) = insert_test_user("alice", dec!(0), &connection);
        let (_, bob) = insert_test_user("bob", dec!(0), &connection);
        let now = OffsetDateTime::now_utc();
        let first = create_transaction(
            Transaction::build(bob.id, dec!(50), TransactionType::Loan)
                .timestamp(now - Duration::hours(1)),
            &connection,
        )
        .unwrap();
        create_transaction(
            Transaction::build(alice.id, dec!(60), TransactionType::Loan).approved(),
            &connection,
        )
        .unwrap();
        let second = create_transaction(
            Transaction::build(alice.id, dec!(70), TransactionType::Loan).timestamp(now),
            &connection,
        )
        .unwrap();

        assert_eq!(get_pending_loans(&connection), Ok(vec![first, second]));
    }
}
