//! Opening connections to the ledger database and creating its schema.

use std::path::Path;

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// Open the SQLite database at `path`, enabling foreign key enforcement.
///
/// The schema is not created, call [initialize] for that.
///
/// # Errors
/// Returns [Error::SqlError] if the database cannot be opened or configured.
pub fn open_connection(path: &Path) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    enable_foreign_keys(&connection)?;

    Ok(connection)
}

/// Create the user, account and transaction tables if they do not exist.
///
/// Foreign key enforcement is switched on for `connection` before the tables
/// are created.
///
/// # Errors
/// Returns [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    enable_foreign_keys(connection)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

// SQLite leaves foreign keys off by default, and the setting is per connection.
fn enable_foreign_keys(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", true)
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    fn count_rows(connection: &Connection, sql: &str) -> i64 {
        connection.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn creates_all_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let table_count = count_rows(
            &connection,
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
            AND name IN ('user', 'account', 'transaction')",
        );
        assert_eq!(table_count, 3);
    }

    #[test]
    fn can_run_twice() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert_eq!(count_rows(&connection, "PRAGMA foreign_keys"), 1);
    }

    #[test]
    fn schema_has_no_triggers() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let trigger_count = count_rows(
            &connection,
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger'",
        );
        assert_eq!(
            trigger_count, 0,
            "balances must only be updated by record_transaction"
        );
    }
}
