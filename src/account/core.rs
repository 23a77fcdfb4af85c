use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, is_foreign_key_violation, user::UserId};

/// A newtype wrapper for integer account IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(i64);

impl AccountId {
    /// Create a new account ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the account ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A bank account owned by a user.
///
/// `balance` and `transaction_count` are caches of the account's transaction
/// history. Only [crate::record_transaction] changes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The display name of the account.
    pub name: String,
    /// The balance the account was opened with.
    pub opening_balance: f64,
    /// The current balance, the opening balance plus credits minus debits.
    pub balance: f64,
    /// How many transactions have been recorded against the account.
    pub transaction_count: i64,
    /// The user that owns the account.
    pub user_id: UserId,
    /// When the account was opened.
    pub created_at: OffsetDateTime,
}

pub fn create_account_table(connection: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            opening_balance REAL NOT NULL,
            balance REAL NOT NULL,
            transaction_count INTEGER NOT NULL DEFAULT 0,
            user_id INTEGER NOT NULL,
            creation_ts TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id)
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = AccountId::new(row.get(0)?);
    let name = row.get(1)?;
    let opening_balance = row.get(2)?;
    let balance = row.get(3)?;
    let transaction_count = row.get(4)?;
    let user_id = UserId::new(row.get(5)?);
    let created_at = row.get(6)?;

    Ok(Account {
        id,
        name,
        opening_balance,
        balance,
        transaction_count,
        user_id,
        created_at,
    })
}

/// Open a new account for `user_id` with a balance of `initial_amount`.
///
/// The account starts with no transactions. `initial_amount` may be zero or
/// negative.
///
/// # Errors
/// Returns a:
/// - [Error::EmptyAccountName] if `name` is blank,
/// - [Error::InvalidInitialAmount] if `initial_amount` is NaN or infinite,
/// - [Error::UserNotFound] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    name: &str,
    initial_amount: f64,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = name.trim();
    if name.is_empty() {
        tracing::warn!("rejected account with an empty name for user {user_id}");
        return Err(Error::EmptyAccountName);
    }

    if !initial_amount.is_finite() {
        tracing::warn!("rejected account with initial amount {initial_amount}");
        return Err(Error::InvalidInitialAmount(initial_amount));
    }

    let account = connection
        .prepare(
            "INSERT INTO account (name, opening_balance, balance, transaction_count, user_id, creation_ts)
             VALUES (?1, ?2, ?2, 0, ?3, ?4)
             RETURNING id, name, opening_balance, balance, transaction_count, user_id, creation_ts",
        )?
        .query_row(
            (
                name,
                initial_amount,
                user_id.as_i64(),
                OffsetDateTime::now_utc(),
            ),
            map_row_to_account,
        )
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::UserNotFound(user_id)
            } else {
                error.into()
            }
        })?;

    tracing::info!(
        "opened account {} for user {} with {:.2}",
        account.id,
        user_id,
        initial_amount
    );

    Ok(account)
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// Returns [Error::AccountNotFound] if `id` does not refer to an account, or
/// [Error::SqlError] if there is some other SQL error.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, name, opening_balance, balance, transaction_count, user_id, creation_ts
             FROM account WHERE id = :id",
        )?
        .query_row(&[(":id", &id.as_i64())], map_row_to_account)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::AccountNotFound(id),
            error => error.into(),
        })
}

/// Retrieve every account, ordered by ID.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, name, opening_balance, balance, transaction_count, user_id, creation_ts
             FROM account ORDER BY id ASC",
        )?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Retrieve the accounts owned by `user_id`, oldest first.
///
/// # Errors
/// Returns [Error::UserNotFound] if `user_id` does not refer to a registered
/// user, or [Error::SqlError] if there is some other SQL error.
pub fn get_accounts_for_user(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    let user_exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM user WHERE id = ?1)",
        [user_id.as_i64()],
        |row| row.get(0),
    )?;

    if !user_exists {
        return Err(Error::UserNotFound(user_id));
    }

    connection
        .prepare(
            "SELECT id, name, opening_balance, balance, transaction_count, user_id, creation_ts
             FROM account WHERE user_id = :user_id
             ORDER BY creation_ts ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}


#[cfg(test)]
mod create_account_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, user::UserId, user::create_user};

    use super::{AccountId, create_account, get_account, get_accounts, get_accounts_for_user};

    fn get_test_connection() -> (Connection, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Amelie Dal", "amelie@example.com", &conn).unwrap();

        (conn, user.id)
    }

    #[test]
    fn create_account_succeeds() {
        let (conn, user_id) = get_test_connection();

        let account = create_account("Compte courant", 2000.0, user_id, &conn).unwrap();

        assert!(account.id.as_i64() > 0);
        assert_eq!(account.name, "Compte courant");
        assert_eq!(account.opening_balance, 2000.0);
        assert_eq!(account.balance, 2000.0);
        assert_eq!(account.transaction_count, 0);
        assert_eq!(account.user_id, user_id);
    }

    #[test]
    fn create_account_allows_negative_initial_amount() {
        let (conn, user_id) = get_test_connection();

        let account = create_account("Overdraft", -50.0, user_id, &conn).unwrap();

        assert_eq!(account.balance, -50.0);
    }

    #[test]
    fn create_account_fails_with_non_existent_user() {
        let (conn, user_id) = get_test_connection();
        let missing_user = UserId::new(user_id.as_i64() + 41);

        let result = create_account("Savings", 10.0, missing_user, &conn);

        assert_eq!(result, Err(Error::UserNotFound(missing_user)));
        assert_eq!(result.unwrap_err().kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn create_account_fails_with_empty_name() {
        let (conn, user_id) = get_test_connection();

        assert_eq!(
            create_account("", 10.0, user_id, &conn),
            Err(Error::EmptyAccountName)
        );
    }

    #[test]
    fn create_account_fails_with_nan_amount() {
        let (conn, user_id) = get_test_connection();

        let result = create_account("Savings", f64::NAN, user_id, &conn);

        assert!(matches!(result, Err(Error::InvalidInitialAmount(_))));
    }

    #[test]
    fn get_account_returns_created_account() {
        let (conn, user_id) = get_test_connection();
        let account = create_account("Savings", 10.0, user_id, &conn).unwrap();

        let got = get_account(account.id, &conn).unwrap();

        assert_eq!(got, account);
    }

    #[test]
    fn get_account_fails_with_non_existent_id() {
        let (conn, _) = get_test_connection();
        let id = AccountId::new(1337);

        assert_eq!(get_account(id, &conn), Err(Error::AccountNotFound(id)));
    }

    #[test]
    fn get_accounts_for_user_only_returns_owned_accounts() {
        let (conn, user_id) = get_test_connection();
        let other_user = create_user("Valentin", "valentin@example.com", &conn).unwrap();
        let first = create_account("Checking", 10.0, user_id, &conn).unwrap();
        create_account("Elsewhere", 10.0, other_user.id, &conn).unwrap();
        let second = create_account("Savings", 20.0, user_id, &conn).unwrap();

        let accounts = get_accounts_for_user(user_id, &conn).unwrap();

        assert_eq!(accounts, vec![first, second]);
    }

    #[test]
    fn get_accounts_returns_every_account() {
        let (conn, user_id) = get_test_connection();
        let other_user = create_user("Valentin", "valentin@example.com", &conn).unwrap();
        let first = create_account("Checking", 10.0, user_id, &conn).unwrap();
        let second = create_account("Elsewhere", 5.0, other_user.id, &conn).unwrap();

        let accounts = get_accounts(&conn).unwrap();

        assert_eq!(accounts, vec![first, second]);
    }

    #[test]
    fn get_accounts_is_empty_without_accounts() {
        let (conn, _) = get_test_connection();

        assert_eq!(get_accounts(&conn), Ok(vec![]));
    }

    #[test]
    fn get_accounts_for_user_fails_with_non_existent_user() {
        let (conn, _) = get_test_connection();
        let id = UserId::new(999);

        assert_eq!(
            get_accounts_for_user(id, &conn),
            Err(Error::UserNotFound(id))
        );
    }
}
