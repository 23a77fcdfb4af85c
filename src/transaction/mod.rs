//! Transactions and the engine that applies them to account balances.
//!
//! This module contains:
//! - The `Transaction` model, its `TransactionKind` and display name formatting
//! - `record_transaction`, the only operation that changes an account balance
//! - Queries for an account's ordered transaction history and for every
//!   transaction in the store

mod core;
mod record;

pub use core::{
    Transaction, TransactionId, TransactionKind, create_transaction_table,
    format_transaction_name, get_transactions, get_transactions_for_account,
};
pub use record::record_transaction;

pub(crate) use core::ensure_account_exists;
#[cfg(test)]
pub(crate) use record::record_transaction_at;
