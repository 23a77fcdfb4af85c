//! Exporting an account's ledger to a CSV snapshot and reading snapshots back.
//!
//! A snapshot is a header row `ID,NAME,AMOUNT` followed by one row per
//! transaction, in ledger order.

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::AccountId,
    transaction::{TransactionId, ensure_account_exists, get_transactions_for_account},
};

/// The header row of every snapshot.
pub const SNAPSHOT_HEADER: [&str; 3] = ["ID", "NAME", "AMOUNT"];

/// One transaction as it appears in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// The transaction ID.
    #[serde(rename = "ID")]
    pub id: TransactionId,
    /// The formatted transaction name.
    #[serde(rename = "NAME")]
    pub name: String,
    /// The transaction amount.
    #[serde(rename = "AMOUNT")]
    pub amount: f64,
}

/// Write the ledger of `account_id` as CSV to `writer`.
///
/// `writer` is consumed and dropped before this function returns, on success
/// and on failure alike.
///
/// Returns the number of transaction rows written.
///
/// # Errors
/// Returns a:
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
/// - [Error::SnapshotWriteError] if writing to `writer` fails,
/// - or [Error::SqlError] if the transactions could not be read.
pub fn export_account_ledger<W: Write>(
    account_id: AccountId,
    writer: W,
    connection: &Connection,
) -> Result<usize, Error> {
    let transactions = get_transactions_for_account(account_id, connection)?;

    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(SNAPSHOT_HEADER)
        .map_err(write_error)?;

    for transaction in &transactions {
        csv_writer
            .write_record([
                transaction.id.to_string(),
                transaction.name.clone(),
                transaction.amount.to_string(),
            ])
            .map_err(write_error)?;
    }

    csv_writer.flush().map_err(write_error)?;

    tracing::debug!(
        "exported {} transactions for account {account_id}",
        transactions.len()
    );

    Ok(transactions.len())
}

/// Export the ledger of `account_id` to a new file at `path`, replacing any
/// existing file.
///
/// The file is closed on every exit path. If writing fails part way through,
/// the partial file is removed before the error is returned so that it cannot
/// be mistaken for a complete snapshot.
///
/// # Errors
/// Returns a:
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
///   in which case no file is created,
/// - [Error::SnapshotWriteError] if the file cannot be created or written,
/// - or [Error::SqlError] if the transactions could not be read.
pub fn write_snapshot_file(
    account_id: AccountId,
    path: &Path,
    connection: &Connection,
) -> Result<usize, Error> {
    ensure_account_exists(account_id, connection)?;

    let file = File::create(path).map_err(|error| {
        tracing::error!("could not create snapshot file {}: {error}", path.display());
        Error::SnapshotWriteError(format!("{}: {error}", path.display()))
    })?;

    match export_account_ledger(account_id, file, connection) {
        Ok(row_count) => {
            tracing::info!(
                "wrote snapshot of account {account_id} ({row_count} transactions) to {}",
                path.display()
            );
            Ok(row_count)
        }
        Err(error) => {
            tracing::error!("could not write snapshot {}: {error}", path.display());

            if let Err(remove_error) = fs::remove_file(path) {
                tracing::warn!(
                    "could not remove partial snapshot {}: {remove_error}",
                    path.display()
                );
            }

            Err(error)
        }
    }
}

/// Read the snapshot at `path` line by line and return its content with each
/// line terminated by `\n`.
///
/// # Errors
/// Returns a:
/// - [Error::SnapshotNotFound] if there is no file at `path`,
/// - or [Error::SnapshotReadError] if the file cannot be opened or read.
pub fn import_ledger_snapshot(path: &Path) -> Result<String, Error> {
    let file = File::open(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => Error::SnapshotNotFound(path.display().to_string()),
        _ => {
            tracing::error!("could not open snapshot {}: {error}", path.display());
            Error::SnapshotReadError(format!("{}: {error}", path.display()))
        }
    })?;

    let mut content = String::new();

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|error| {
            tracing::error!("could not read snapshot {}: {error}", path.display());
            Error::SnapshotReadError(format!("{}: {error}", path.display()))
        })?;

        content.push_str(&line);
        content.push('\n');
    }

    Ok(content)
}

/// Parse snapshot text, as returned by [import_ledger_snapshot], into rows.
///
/// # Errors
/// Returns [Error::InvalidSnapshot] if the header is not `ID,NAME,AMOUNT` or a
/// row cannot be parsed.
pub fn parse_ledger_snapshot(text: &str) -> Result<Vec<SnapshotRow>, Error> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| Error::InvalidSnapshot(error.to_string()))?;

    if headers.iter().ne(SNAPSHOT_HEADER) {
        return Err(Error::InvalidSnapshot(format!(
            "expected header {:?}, got {:?}",
            SNAPSHOT_HEADER.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(|error| Error::InvalidSnapshot(error.to_string())))
        .collect()
}

fn write_error(error: impl std::fmt::Display) -> Error {
    Error::SnapshotWriteError(error.to_string())
}

#[cfg(test)]
mod export_tests {
    use std::{cell::Cell, io, io::Write, rc::Rc};

    use rusqlite::Connection;

    use crate::{
        Error, ErrorKind,
        account::{AccountId, create_account},
        db::initialize,
        transaction::{Transaction, TransactionKind, record_transaction},
        user::create_user,
    };

    use super::export_account_ledger;

    fn get_test_connection() -> (Connection, AccountId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Alice", "alice@example.com", &conn).unwrap();
        let account = create_account("Checking", 0.0, user.id, &conn).unwrap();

        (conn, account.id)
    }

    fn record(
        conn: &Connection,
        account_id: AccountId,
        name: &str,
        amount: f64,
        kind: TransactionKind,
    ) -> Transaction {
        record_transaction(name, amount, account_id, kind, conn).unwrap()
    }

    /// Fails every write and records whether it was dropped.
    struct FailingWriter {
        dropped: Rc<Cell<bool>>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    impl Drop for FailingWriter {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let (conn, account_id) = get_test_connection();
        let salary = record(&conn, account_id, "salary", 2500.0, TransactionKind::Credit);
        let coffee = record(&conn, account_id, "coffee", 4.5, TransactionKind::Debit);
        let mut buffer = Vec::new();

        let row_count = export_account_ledger(account_id, &mut buffer, &conn).unwrap();

        assert_eq!(row_count, 2);
        let want = format!(
            "ID,NAME,AMOUNT\n{},T1-SALARY,2500\n{},T0-COFFEE,4.5\n",
            salary.id, coffee.id
        );
        assert_eq!(String::from_utf8(buffer).unwrap(), want);
    }

    #[test]
    fn writes_only_header_for_empty_ledger() {
        let (conn, account_id) = get_test_connection();
        let mut buffer = Vec::new();

        let row_count = export_account_ledger(account_id, &mut buffer, &conn).unwrap();

        assert_eq!(row_count, 0);
        assert_eq!(String::from_utf8(buffer).unwrap(), "ID,NAME,AMOUNT\n");
    }

    #[test]
    fn quotes_names_containing_commas() {
        let (conn, account_id) = get_test_connection();
        let transaction = record(&conn, account_id, "fish, chips", 12.0, TransactionKind::Debit);
        let mut buffer = Vec::new();

        export_account_ledger(account_id, &mut buffer, &conn).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(
            text.contains(&format!("{},\"T0-FISH, CHIPS\",12\n", transaction.id)),
            "got {text:?}"
        );
    }

    #[test]
    fn fails_with_non_existent_account() {
        let (conn, _) = get_test_connection();
        let id = AccountId::new(12);

        assert_eq!(
            export_account_ledger(id, Vec::new(), &conn),
            Err(Error::AccountNotFound(id))
        );
    }

    #[test]
    fn write_failure_is_reported_and_sink_is_released() {
        let (conn, account_id) = get_test_connection();
        record(&conn, account_id, "salary", 10.0, TransactionKind::Credit);
        let dropped = Rc::new(Cell::new(false));
        let writer = FailingWriter {
            dropped: dropped.clone(),
        };

        let result = export_account_ledger(account_id, writer, &conn);

        assert!(
            matches!(result, Err(Error::SnapshotWriteError(_))),
            "got {result:?}"
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Io);
        assert!(dropped.get(), "the writer should be dropped on failure");
    }
}
