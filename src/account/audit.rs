//! Read-only check that an account's cached balance agrees with its history.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    account::{AccountId, get_account},
    transaction::TransactionKind,
};

/// The cached and recomputed figures for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceAudit {
    /// The audited account.
    pub account_id: AccountId,
    /// The balance cached on the account row.
    pub cached_balance: f64,
    /// The opening balance plus every credit minus every debit, applied in
    /// the order they were recorded.
    pub computed_balance: f64,
    /// The transaction count cached on the account row.
    pub cached_count: i64,
    /// The number of transactions that reference the account.
    pub computed_count: i64,
}

impl BalanceAudit {
    /// Whether the cached figures match the transaction history.
    pub fn is_consistent(&self) -> bool {
        self.cached_balance == self.computed_balance && self.cached_count == self.computed_count
    }
}

/// Recompute the balance and transaction count of `account_id` from its
/// transactions and compare them against the cached values.
///
/// # Errors
/// Returns [Error::AccountNotFound] if the account does not exist, or
/// [Error::SqlError] if there is some other SQL error.
pub fn verify_account_balance(
    account_id: AccountId,
    connection: &Connection,
) -> Result<BalanceAudit, Error> {
    let account = get_account(account_id, connection)?;

    // Replay in the order the deltas were applied so the float additions
    // happen in the same sequence as the cached balance.
    let signed_amounts = connection
        .prepare(
            "SELECT amount, kind FROM \"transaction\"
             WHERE account_id = ?1
             ORDER BY id ASC",
        )?
        .query_map([account_id.as_i64()], |row| {
            let amount: f64 = row.get(0)?;
            let kind: TransactionKind = row.get(1)?;
            Ok(kind.signed(amount))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let computed_balance = signed_amounts
        .iter()
        .fold(account.opening_balance, |balance, amount| balance + amount);
    let computed_count = signed_amounts.len() as i64;

    let audit = BalanceAudit {
        account_id,
        cached_balance: account.balance,
        computed_balance,
        cached_count: account.transaction_count,
        computed_count,
    };

    if !audit.is_consistent() {
        tracing::warn!("account {account_id} does not match its history: {audit:?}");
    }

    Ok(audit)
}
