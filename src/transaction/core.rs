//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, account::AccountId};

// ============================================================================
// MODELS
// ============================================================================

/// A newtype wrapper for integer transaction IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct TransactionId(i64);

impl TransactionId {
    /// Create a new transaction ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the transaction ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a transaction adds money to or takes money from an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money paid into the account, increases the balance.
    Credit,
    /// Money paid out of the account, decreases the balance.
    Debit,
}

impl TransactionKind {
    /// The integer code stored in the database, 1 for credit and 0 for debit.
    pub fn code(&self) -> i64 {
        match self {
            TransactionKind::Credit => 1,
            TransactionKind::Debit => 0,
        }
    }

    /// Get the kind for a stored integer code.
    ///
    /// # Errors
    /// Returns [Error::InvalidTransactionKind] for codes other than 0 or 1.
    pub fn from_code(code: i64) -> Result<Self, Error> {
        match code {
            1 => Ok(TransactionKind::Credit),
            0 => Ok(TransactionKind::Debit),
            other => Err(Error::InvalidTransactionKind(other.to_string())),
        }
    }

    /// The change to an account balance caused by a transaction of `amount`.
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            TransactionKind::Credit => amount,
            TransactionKind::Debit => -amount,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    /// Accepts "credit"/"debit" in any case, or the stored codes "1"/"0".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.eq_ignore_ascii_case("credit") || trimmed == "1" {
            Ok(TransactionKind::Credit)
        } else if trimmed.eq_ignore_ascii_case("debit") || trimmed == "0" {
            Ok(TransactionKind::Debit)
        } else {
            Err(Error::InvalidTransactionKind(s.to_owned()))
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Credit => write!(f, "credit"),
            TransactionKind::Debit => write!(f, "debit"),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        TransactionKind::from_code(code).map_err(|_| FromSqlError::OutOfRange(code))
    }
}

/// A credit or debit recorded against an account.
///
/// Transactions are never edited once created, corrections are recorded as
/// new, offsetting transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The display name, see [format_transaction_name].
    pub name: String,
    /// The amount of money moved, always greater than zero.
    pub amount: f64,
    /// Whether the amount was paid in or out.
    pub kind: TransactionKind,
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

/// Build the display name stored for a transaction.
///
/// The name is the kind code prefixed with `T`, a dash, and the upper-cased
/// raw name, e.g. a credit named "salary" becomes `T1-SALARY`.
pub fn format_transaction_name(kind: TransactionKind, name: &str) -> String {
    format!("T{}-{}", kind.code(), name.trim().to_uppercase())
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                kind INTEGER NOT NULL CHECK (kind IN (0, 1)),
                account_id INTEGER NOT NULL,
                creation_ts TEXT NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id)
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_creation_ts
         ON \"transaction\"(account_id, creation_ts)",
        (),
    )?;

    Ok(())
}

pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: TransactionId::new(row.get(0)?),
        name: row.get(1)?,
        amount: row.get(2)?,
        kind: row.get(3)?,
        account_id: AccountId::new(row.get(4)?),
        created_at: row.get(5)?,
    })
}

/// Retrieve the ledger of `account_id`: its transactions ordered by creation
/// time, oldest first, with ties broken by ID.
///
/// # Errors
/// Returns [Error::AccountNotFound] if the account does not exist, or
/// [Error::SqlError] if there is some other SQL error.
pub fn get_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    ensure_account_exists(account_id, connection)?;

    connection
        .prepare(
            "SELECT id, name, amount, kind, account_id, creation_ts FROM \"transaction\"
             WHERE account_id = :account_id
             ORDER BY creation_ts ASC, id ASC",
        )?
        .query_map(
            &[(":account_id", &account_id.as_i64())],
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Retrieve every transaction across all accounts, ordered by ID.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, kind, account_id, creation_ts FROM \"transaction\"
             ORDER BY id ASC",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Return [Error::AccountNotFound] unless `account_id` refers to an account.
pub(crate) fn ensure_account_exists(
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    let exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM account WHERE id = ?1)",
        [account_id.as_i64()],
        |row| row.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        Err(Error::AccountNotFound(account_id))
    }
}

#[cfg(test)]
mod transaction_kind_tests {
    use std::str::FromStr;

    use crate::Error;

    use super::TransactionKind;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!(TransactionKind::from_str("credit"), Ok(TransactionKind::Credit));
        assert_eq!(TransactionKind::from_str("DEBIT"), Ok(TransactionKind::Debit));
        assert_eq!(TransactionKind::from_str(" Credit "), Ok(TransactionKind::Credit));
    }

    #[test]
    fn parses_stored_codes() {
        assert_eq!(TransactionKind::from_str("1"), Ok(TransactionKind::Credit));
        assert_eq!(TransactionKind::from_str("0"), Ok(TransactionKind::Debit));
    }

    #[test]
    fn rejects_unknown_kinds() {
        assert_eq!(
            TransactionKind::from_str("refund"),
            Err(Error::InvalidTransactionKind("refund".to_owned()))
        );
        assert_eq!(
            TransactionKind::from_code(2),
            Err(Error::InvalidTransactionKind("2".to_owned()))
        );
    }

    #[test]
    fn code_round_trips() {
        for kind in [TransactionKind::Credit, TransactionKind::Debit] {
            assert_eq!(TransactionKind::from_code(kind.code()), Ok(kind));
        }
    }

    #[test]
    fn signed_amount_follows_kind() {
        assert_eq!(TransactionKind::Credit.signed(12.5), 12.5);
        assert_eq!(TransactionKind::Debit.signed(12.5), -12.5);
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&TransactionKind::Debit).unwrap();

        assert_eq!(json, "\"debit\"");
    }
}



#[cfg(test)]
mod get_transactions_tests {
    use rusqlite::Connection;

    use crate::{
        account::create_account,
        db::initialize,
        transaction::{TransactionKind, record_transaction},
        user::create_user,
    };

    use super::get_transactions;

    #[test]
    fn returns_transactions_of_every_account() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Alice", "alice@example.com", &conn).unwrap();
        let checking = create_account("Checking", 0.0, user.id, &conn).unwrap();
        let savings = create_account("Savings", 0.0, user.id, &conn).unwrap();
        let first =
            record_transaction("salary", 10.0, checking.id, TransactionKind::Credit, &conn)
                .unwrap();
        let second =
            record_transaction("transfer", 4.0, savings.id, TransactionKind::Credit, &conn)
                .unwrap();
        let third =
            record_transaction("fuel", 3.0, checking.id, TransactionKind::Debit, &conn).unwrap();

        let transactions = get_transactions(&conn).unwrap();

        assert_eq!(transactions, vec![first, second, third]);
    }

    #[test]
    fn is_empty_without_transactions() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        assert_eq!(get_transactions(&conn), Ok(vec![]));
    }
}
