//! Finding the last transaction an account could afford within a budget.
//!
//! The scan walks the ledger oldest first, keeping a running sum of the raw
//! transaction amounts. Credits and debits are both counted as spending, the
//! kind is ignored.

use rusqlite::Connection;

use crate::{
    Error,
    account::AccountId,
    transaction::{TransactionId, ensure_account_exists},
};

/// Find the last transaction whose inclusion keeps the running sum of amounts
/// within `budget`.
///
/// `transactions` must be in ledger order. The scan stops at the first
/// transaction that would push the running sum above `budget` and returns the
/// transaction before it. Returns `None` if there are no transactions, or if
/// the very first one already exceeds the budget.
pub fn find_budget_cutoff<I>(transactions: I, budget: f64) -> Option<TransactionId>
where
    I: IntoIterator<Item = (TransactionId, f64)>,
{
    let mut running_sum = 0.0;
    let mut previous = None;

    for (id, amount) in transactions {
        if running_sum + amount > budget {
            tracing::debug!(
                "budget {budget} exceeded at transaction {id} (running sum {running_sum}, amount {amount})"
            );
            return previous;
        }

        running_sum += amount;
        previous = Some(id);
    }

    previous
}

/// Find the last transaction of `account_id` that fits within `budget`.
///
/// Transactions are scanned by creation time, oldest first, with ties broken
/// by ID, so the answer does not depend on the order rows are stored in. See
/// [find_budget_cutoff] for the scan itself.
///
/// # Errors
/// Returns a:
/// - [Error::InvalidBudget] if `budget` is NaN or infinite,
/// - [Error::AccountNotFound] if `account_id` does not refer to an account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn compute_budget_cutoff(
    account_id: AccountId,
    budget: f64,
    connection: &Connection,
) -> Result<Option<TransactionId>, Error> {
    if !budget.is_finite() {
        tracing::warn!("rejected budget {budget} for account {account_id}");
        return Err(Error::InvalidBudget(budget));
    }

    ensure_account_exists(account_id, connection)?;

    let mut statement = connection.prepare(
        "SELECT id, amount FROM \"transaction\"
         WHERE account_id = :account_id
         ORDER BY creation_ts ASC, id ASC",
    )?;

    let rows = statement
        .query_map(&[(":account_id", &account_id.as_i64())], |row| {
            Ok((TransactionId::new(row.get(0)?), row.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let cutoff = find_budget_cutoff(rows, budget);

    tracing::debug!("budget cutoff for account {account_id} at {budget}: {cutoff:?}");

    Ok(cutoff)
}

#[cfg(test)]
mod find_budget_cutoff_tests {
    use crate::transaction::TransactionId;

    use super::find_budget_cutoff;

    fn ledger(amounts: &[f64]) -> Vec<(TransactionId, f64)> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| (TransactionId::new(i as i64 + 1), *amount))
            .collect()
    }

    #[test]
    fn empty_ledger_has_no_cutoff() {
        assert_eq!(find_budget_cutoff(ledger(&[]), 100.0), None);
    }

    #[test]
    fn stops_before_first_transaction_over_budget() {
        let cutoff = find_budget_cutoff(ledger(&[100.0, 50.0, 30.0]), 140.0);

        assert_eq!(cutoff, Some(TransactionId::new(1)));
    }

    #[test]
    fn does_not_skip_ahead_after_exceeding() {
        // 30 would fit after 100, but the scan has already stopped at 50.
        let cutoff = find_budget_cutoff(ledger(&[100.0, 50.0, 30.0]), 135.0);

        assert_eq!(cutoff, Some(TransactionId::new(1)));
    }

    #[test]
    fn first_transaction_over_budget_has_no_cutoff() {
        assert_eq!(find_budget_cutoff(ledger(&[200.0, 1.0]), 100.0), None);
    }

    #[test]
    fn returns_last_transaction_when_everything_fits() {
        let cutoff = find_budget_cutoff(ledger(&[10.0, 10.0]), 100.0);

        assert_eq!(cutoff, Some(TransactionId::new(2)));
    }

    #[test]
    fn running_sum_equal_to_budget_fits() {
        let cutoff = find_budget_cutoff(ledger(&[60.0, 40.0, 0.01]), 100.0);

        assert_eq!(cutoff, Some(TransactionId::new(2)));
    }

    #[test]
    fn negative_budget_fits_nothing() {
        assert_eq!(find_budget_cutoff(ledger(&[1.0]), -1.0), None);
    }
}
