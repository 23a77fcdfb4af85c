//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Error;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A validated email address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// Only the shape is checked: a single `@` with something on either side
    /// and no whitespace.
    ///
    /// # Errors
    ///
    /// This function will return [Error::InvalidEmail] if `raw_email` is not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let raw_email = raw_email.trim();

        let is_valid = match raw_email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !raw_email.contains(char::is_whitespace)
            }
            None => false,
        };

        if is_valid {
            Ok(Self(raw_email.to_owned()))
        } else {
            Err(Error::InvalidEmail(raw_email.to_owned()))
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// The caller should ensure that `raw_email` is a correctly formatted email address,
    /// e.g. when it was read back from the database.
    pub fn new_unchecked(raw_email: String) -> Self {
        Self(raw_email)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A customer of the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The name shown for the user.
    pub name: String,
    /// The user's email address.
    pub email: Email,
    /// When the user was created.
    pub created_at: OffsetDateTime,
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
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                creation_ts TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(2)?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        email: Email::new_unchecked(raw_email),
        created_at: row.get(3)?,
    })
}

/// Create and insert a new user into the database.
///
/// The generated ID is returned as part of the [User] in the same query that
/// inserts the row.
///
/// # Errors
///
/// Returns a:
/// - [Error::EmptyUserName] if `name` is blank,
/// - [Error::InvalidEmail] if `email` is not an email address,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn create_user(name: &str, email: &str, connection: &Connection) -> Result<User, Error> {
    let name = name.trim();
    if name.is_empty() {
        tracing::warn!("rejected user with an empty name");
        return Err(Error::EmptyUserName);
    }

    let email = Email::new(email).inspect_err(|error| tracing::warn!("rejected user: {error}"))?;

    let user = connection
        .prepare(
            "INSERT INTO user (name, email, creation_ts) VALUES (?1, ?2, ?3)
             RETURNING id, name, email, creation_ts",
        )?
        .query_row(
            (name, email.as_ref(), OffsetDateTime::now_utc()),
            map_row_to_user,
        )?;

    tracing::info!("created user {} ({})", user.id, user.email);

    Ok(user)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user ([Error::UserNotFound]),
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email, creation_ts FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UserNotFound(user_id),
            error => error.into(),
        })
}

/// Get every user, ordered by ID.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare("SELECT id, name, email, creation_ts FROM user ORDER BY id ASC")?
        .query_map([], map_row_to_user)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get::<_, i64>(0))
        .map(|count| count as usize)
        .map_err(|error| error.into())
}
