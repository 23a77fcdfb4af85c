//! Recording transactions and keeping account balances in step with them.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use time::OffsetDateTime;

use crate::{Error, account::AccountId, is_foreign_key_violation};

use super::core::{Transaction, TransactionKind, format_transaction_name, map_transaction_row};

/// Record a transaction against `account_id` and apply it to the account.
///
/// The transaction row is inserted and the account's balance and transaction
/// count are updated in one SQL transaction: either both changes are committed
/// or neither is. A credit adds `amount` to the balance, a debit subtracts it.
/// This is the only code that changes an account's balance.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyTransactionName] if `name` is blank,
/// - [Error::InvalidAmount] if `amount` is not a finite number greater than zero,
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
/// - or [Error::SqlError] if there is some other SQL error, in which case nothing is committed.
pub fn record_transaction(
    name: &str,
    amount: f64,
    account_id: AccountId,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Transaction, Error> {
    record_transaction_at(
        name,
        amount,
        account_id,
        kind,
        OffsetDateTime::now_utc(),
        connection,
    )
}

/// [record_transaction] with an explicit creation time.
pub(crate) fn record_transaction_at(
    name: &str,
    amount: f64,
    account_id: AccountId,
    kind: TransactionKind,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if name.trim().is_empty() {
        tracing::warn!("rejected transaction with an empty name for account {account_id}");
        return Err(Error::EmptyTransactionName);
    }

    if !amount.is_finite() || amount <= 0.0 {
        tracing::warn!("rejected transaction with amount {amount} for account {account_id}");
        return Err(Error::InvalidAmount(amount));
    }

    // IMMEDIATE takes the write lock up front so that other connections to the
    // same file cannot interleave a balance update between our insert and update.
    // Dropping `tx` without committing rolls both statements back.
    let tx = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let transaction = tx
        .prepare(
            "INSERT INTO \"transaction\" (name, amount, kind, account_id, creation_ts)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, name, amount, kind, account_id, creation_ts",
        )?
        .query_row(
            (
                format_transaction_name(kind, name),
                amount,
                kind,
                account_id.as_i64(),
                created_at,
            ),
            map_transaction_row,
        )
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                Error::AccountNotFound(account_id)
            } else {
                error.into()
            }
        })?;

    let rows_affected = tx.execute(
        "UPDATE account
         SET balance = balance + ?1, transaction_count = transaction_count + 1
         WHERE id = ?2",
        (kind.signed(amount), account_id.as_i64()),
    )?;

    if rows_affected != 1 {
        tracing::error!(
            "updating the balance for transaction {} affected {rows_affected} accounts, rolling back",
            transaction.id
        );
        return Err(Error::AccountNotFound(account_id));
    }

    tx.commit()?;

    tracing::info!(
        "recorded {} {} of {:.2} on account {}",
        transaction.kind,
        transaction.id,
        transaction.amount,
        account_id
    );

    Ok(transaction)
}
