//! Minibank is a small banking ledger: users own accounts, accounts accumulate
//! transactions, and each account's cached balance always agrees with its
//! transaction history.
//!
//! The library exposes the ledger operations through [Ledger], which owns the
//! SQLite connection. The free functions in each module operate on a borrowed
//! [rusqlite::Connection] and are what [Ledger] calls under its lock.

#![warn(missing_docs)]

mod account;
mod budget;
mod config;
mod db;
mod ledger;
mod logging;
mod snapshot;
mod transaction;
mod user;

pub use account::{
    Account, AccountId, BalanceAudit, create_account, get_account, get_accounts,
    get_accounts_for_user, verify_account_balance,
};
pub use budget::{compute_budget_cutoff, find_budget_cutoff};
pub use config::LedgerConfig;
pub use db::{initialize as initialize_db, open_connection};
pub use ledger::Ledger;
pub use logging::setup_logging;
pub use snapshot::{
    SNAPSHOT_HEADER, SnapshotRow, export_account_ledger, import_ledger_snapshot,
    parse_ledger_snapshot, write_snapshot_file,
};
pub use transaction::{
    Transaction, TransactionId, TransactionKind, format_transaction_name, get_transactions,
    get_transactions_for_account, record_transaction,
};
pub use user::{Email, User, UserId, count_users, create_user, get_user_by_id, get_users};

/// The broad category of an [Error].
///
/// Callers that need to translate failures into their own responses (e.g. an
/// HTTP status) should match on this rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input was malformed or out of range.
    Validation,
    /// A referenced user, account or snapshot does not exist.
    NotFound,
    /// The underlying store failed.
    Store,
    /// Reading or writing a snapshot failed.
    Io,
}

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A user was created with an empty name.
    #[error("user name cannot be empty")]
    EmptyUserName,

    /// The email address is not in a recognisable format.
    #[error("{0} is not a valid email address")]
    InvalidEmail(String),

    /// An account was created with an empty name.
    #[error("account name cannot be empty")]
    EmptyAccountName,

    /// A transaction was recorded with an empty name.
    #[error("transaction name cannot be empty")]
    EmptyTransactionName,

    /// The initial amount of an account must be a finite number.
    #[error("{0} is not a valid initial amount")]
    InvalidInitialAmount(f64),

    /// Transaction amounts must be finite and greater than zero.
    ///
    /// Debits are expressed through [TransactionKind::Debit], never through a
    /// negative amount.
    #[error("{0} is not a valid transaction amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// The transaction kind was neither credit nor debit.
    #[error("\"{0}\" is not a transaction kind, expected \"credit\" or \"debit\"")]
    InvalidTransactionKind(String),

    /// The budget ceiling must be a finite number.
    #[error("{0} is not a valid budget")]
    InvalidBudget(f64),

    /// Snapshot names must be plain file names.
    #[error("\"{0}\" is not a valid snapshot name")]
    InvalidSnapshotName(String),

    /// The user ID does not refer to a registered user.
    #[error("could not find a user with the ID {0}")]
    UserNotFound(UserId),

    /// The account ID does not refer to an existing account.
    #[error("could not find an account with the ID {0}")]
    AccountNotFound(AccountId),

    /// There is no snapshot at the given location.
    #[error("could not find a snapshot at {0}")]
    SnapshotNotFound(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Writing a snapshot failed part way through.
    ///
    /// The sink has been closed by the time this error is returned.
    #[error("could not write snapshot: {0}")]
    SnapshotWriteError(String),

    /// Reading a snapshot failed.
    #[error("could not read snapshot: {0}")]
    SnapshotReadError(String),

    /// The snapshot text is not in the exported format.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyUserName
            | Error::InvalidEmail(_)
            | Error::EmptyAccountName
            | Error::EmptyTransactionName
            | Error::InvalidInitialAmount(_)
            | Error::InvalidAmount(_)
            | Error::InvalidTransactionKind(_)
            | Error::InvalidBudget(_)
            | Error::InvalidSnapshotName(_) => ErrorKind::Validation,
            Error::UserNotFound(_)
            | Error::AccountNotFound(_)
            | Error::SnapshotNotFound(_)
            | Error::NotFound => ErrorKind::NotFound,
            Error::SqlError(_) | Error::DatabaseLockError => ErrorKind::Store,
            Error::SnapshotWriteError(_)
            | Error::SnapshotReadError(_)
            | Error::InvalidSnapshot(_) => ErrorKind::Io,
        }
    }
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

/// Whether `error` is SQLite reporting a failed FOREIGN KEY constraint.
pub(crate) fn is_foreign_key_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        )
    )
}
