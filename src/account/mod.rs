//! Accounts and the read-only audit of their cached balances.

mod audit;
mod core;

pub use audit::{BalanceAudit, verify_account_balance};
pub use core::{
    Account, AccountId, create_account, create_account_table, get_account, get_accounts,
    get_accounts_for_user,
};
