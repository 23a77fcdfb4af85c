//! The handle through which callers use the ledger.

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::Connection;

use crate::{
    Error,
    account::{
        Account, AccountId, BalanceAudit, create_account, get_account, get_accounts,
        get_accounts_for_user, verify_account_balance,
    },
    budget::compute_budget_cutoff,
    config::LedgerConfig,
    db::{initialize, open_connection},
    snapshot::{import_ledger_snapshot, write_snapshot_file},
    transaction::{
        Transaction, TransactionId, TransactionKind, get_transactions,
        get_transactions_for_account, record_transaction,
    },
    user::{User, UserId, create_user, get_user_by_id, get_users},
};

/// Owns the database connection and exposes the ledger operations.
///
/// Cloning a `Ledger` is cheap and shares the connection. Each operation holds
/// the connection for one unit of work, so operations from different threads
/// are applied one at a time.
#[derive(Debug, Clone)]
pub struct Ledger {
    connection: Arc<Mutex<Connection>>,
    config: LedgerConfig,
}

impl Ledger {
    /// Create a ledger over `connection`, creating the schema if needed.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(connection: Connection, config: LedgerConfig) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            config,
        })
    }

    /// Open (or create) the SQLite database at `db_path` and wrap it in a ledger.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: &Path, config: LedgerConfig) -> Result<Self, Error> {
        tracing::debug!("opening ledger database at {}", db_path.display());
        Self::new(open_connection(db_path)?, config)
    }

    /// The configuration this ledger was created with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }

    /// Register a user. See [create_user].
    pub fn create_user(&self, name: &str, email: &str) -> Result<UserId, Error> {
        let connection = self.lock()?;
        create_user(name, email, &connection).map(|user| user.id)
    }

    /// Open an account for `user_id`. See [create_account].
    pub fn create_account(
        &self,
        name: &str,
        initial_amount: f64,
        user_id: UserId,
    ) -> Result<AccountId, Error> {
        let connection = self.lock()?;
        create_account(name, initial_amount, user_id, &connection).map(|account| account.id)
    }

    /// Record a transaction and apply it to the account balance. See [record_transaction].
    pub fn record_transaction(
        &self,
        name: &str,
        amount: f64,
        account_id: AccountId,
        kind: TransactionKind,
    ) -> Result<TransactionId, Error> {
        let connection = self.lock()?;
        record_transaction(name, amount, account_id, kind, &connection)
            .map(|transaction| transaction.id)
    }

    /// Find the last transaction of `account_id` that fits within `budget`.
    /// See [compute_budget_cutoff].
    pub fn compute_budget_cutoff(
        &self,
        account_id: AccountId,
        budget: f64,
    ) -> Result<Option<TransactionId>, Error> {
        let connection = self.lock()?;
        compute_budget_cutoff(account_id, budget, &connection)
    }

    /// Write the ledger of `account_id` to the snapshot directory.
    ///
    /// `snapshot_name` defaults to [LedgerConfig::default_snapshot_name]. The
    /// snapshot directory is created if it does not exist yet. Returns the
    /// number of transactions exported.
    ///
    /// # Errors
    /// See [LedgerConfig::snapshot_path] and [crate::write_snapshot_file].
    pub fn export_account_ledger(
        &self,
        account_id: AccountId,
        snapshot_name: Option<&str>,
    ) -> Result<usize, Error> {
        let path = self.config.snapshot_path(snapshot_name)?;

        fs::create_dir_all(&self.config.snapshot_dir).map_err(|error| {
            tracing::error!(
                "could not create snapshot directory {}: {error}",
                self.config.snapshot_dir.display()
            );
            Error::SnapshotWriteError(format!("{}: {error}", self.config.snapshot_dir.display()))
        })?;

        let connection = self.lock()?;
        write_snapshot_file(account_id, &path, &connection)
    }

    /// Read a snapshot from the snapshot directory.
    ///
    /// # Errors
    /// See [LedgerConfig::snapshot_path] and [crate::import_ledger_snapshot].
    pub fn import_ledger_snapshot(&self, snapshot_name: Option<&str>) -> Result<String, Error> {
        let path = self.config.snapshot_path(snapshot_name)?;
        import_ledger_snapshot(&path)
    }

    /// Get a user by ID.
    pub fn user(&self, user_id: UserId) -> Result<User, Error> {
        let connection = self.lock()?;
        get_user_by_id(user_id, &connection)
    }

    /// Get every user.
    pub fn users(&self) -> Result<Vec<User>, Error> {
        let connection = self.lock()?;
        get_users(&connection)
    }

    /// Get an account by ID.
    pub fn account(&self, account_id: AccountId) -> Result<Account, Error> {
        let connection = self.lock()?;
        get_account(account_id, &connection)
    }

    /// Get every account.
    pub fn accounts(&self) -> Result<Vec<Account>, Error> {
        let connection = self.lock()?;
        get_accounts(&connection)
    }

    /// Get the accounts owned by `user_id`.
    pub fn accounts_for_user(&self, user_id: UserId) -> Result<Vec<Account>, Error> {
        let connection = self.lock()?;
        get_accounts_for_user(user_id, &connection)
    }

    /// Get the transactions of `account_id` in ledger order.
    pub fn transactions(&self, account_id: AccountId) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;
        get_transactions_for_account(account_id, &connection)
    }

    /// Get every transaction across all accounts.
    pub fn all_transactions(&self) -> Result<Vec<Transaction>, Error> {
        let connection = self.lock()?;
        get_transactions(&connection)
    }

    /// Check the cached balance of `account_id` against its history.
    pub fn verify_account_balance(&self, account_id: AccountId) -> Result<BalanceAudit, Error> {
        let connection = self.lock()?;
        verify_account_balance(account_id, &connection)
    }
}
