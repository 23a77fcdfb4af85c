use std::{path::PathBuf, process::exit};

use clap::{Parser, Subcommand};
use serde::Serialize;

use minibank::{AccountId, ErrorKind, Ledger, LedgerConfig, TransactionKind, UserId, setup_logging};

/// Command line access to the minibank ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, default_value = "minibank.db")]
    db_path: PathBuf,

    /// Directory that snapshots are exported to and imported from.
    #[arg(long, default_value = "exports")]
    snapshot_dir: PathBuf,

    /// File that debug logs are appended to.
    #[arg(long, default_value = "debug.log")]
    log_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new user and print their ID.
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Open an account for a user and print its ID.
    CreateAccount {
        #[arg(long)]
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
        #[arg(long)]
        user_id: i64,
    },
    /// Record a credit or debit against an account and print the transaction ID.
    Record {
        #[arg(long)]
        name: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        account_id: i64,
        /// "credit" or "debit".
        #[arg(long)]
        kind: TransactionKind,
    },
    /// Print the last transaction that fits within a budget.
    Budget {
        #[arg(long)]
        account_id: i64,
        #[arg(long, allow_negative_numbers = true)]
        budget: f64,
    },
    /// Export an account's transactions to a snapshot file.
    Export {
        #[arg(long)]
        account_id: i64,
        /// Snapshot file name inside the snapshot directory.
        #[arg(long)]
        file: Option<String>,
    },
    /// Print the content of a snapshot file.
    Import {
        /// Snapshot file name inside the snapshot directory.
        #[arg(long)]
        file: Option<String>,
    },
    /// Print an account with its transactions.
    ShowAccount {
        #[arg(long)]
        account_id: i64,
    },
    /// Print every user with their accounts.
    ListUsers,
    /// Print every account.
    ListAccounts,
    /// Print every transaction across all accounts.
    ListTransactions,
}

#[derive(Serialize)]
struct AccountView {
    account: minibank::Account,
    transactions: Vec<minibank::Transaction>,
    consistent: bool,
}

#[derive(Serialize)]
struct UserView {
    user: minibank::User,
    accounts: Vec<minibank::Account>,
}

fn main() {
    let args = Args::parse();

    if let Err(error) = setup_logging(&args.log_path) {
        print_error(format!(
            "Could not open log file {}: {error}",
            args.log_path.display()
        ));
        exit(1);
    }

    let config = LedgerConfig::new(&args.snapshot_dir);
    let ledger = match Ledger::open(&args.db_path, config) {
        Ok(ledger) => ledger,
        Err(error) => {
            print_error(format!(
                "Could not open the database at {}: {error}",
                args.db_path.display()
            ));
            exit(1);
        }
    };

    if let Err(error) = run(&ledger, args.command) {
        print_error(&error);
        exit(exit_code(&error));
    }
}

fn run(ledger: &Ledger, command: Command) -> Result<(), minibank::Error> {
    match command {
        Command::CreateUser { name, email } => {
            println!("{}", ledger.create_user(&name, &email)?);
        }
        Command::CreateAccount {
            name,
            amount,
            user_id,
        } => {
            println!(
                "{}",
                ledger.create_account(&name, amount, UserId::new(user_id))?
            );
        }
        Command::Record {
            name,
            amount,
            account_id,
            kind,
        } => {
            println!(
                "{}",
                ledger.record_transaction(&name, amount, AccountId::new(account_id), kind)?
            );
        }
        Command::Budget { account_id, budget } => {
            match ledger.compute_budget_cutoff(AccountId::new(account_id), budget)? {
                Some(transaction_id) => println!("{transaction_id}"),
                None => println!("none"),
            }
        }
        Command::Export { account_id, file } => {
            let row_count =
                ledger.export_account_ledger(AccountId::new(account_id), file.as_deref())?;
            println!("Exported {row_count} transactions");
        }
        Command::Import { file } => {
            print!("{}", ledger.import_ledger_snapshot(file.as_deref())?);
        }
        Command::ShowAccount { account_id } => {
            let account_id = AccountId::new(account_id);
            let view = AccountView {
                account: ledger.account(account_id)?,
                transactions: ledger.transactions(account_id)?,
                consistent: ledger.verify_account_balance(account_id)?.is_consistent(),
            };
            print_json(&view);
        }
        Command::ListUsers => {
            let views = ledger
                .users()?
                .into_iter()
                .map(|user| {
                    let accounts = ledger.accounts_for_user(user.id)?;
                    Ok(UserView { user, accounts })
                })
                .collect::<Result<Vec<_>, minibank::Error>>()?;
            print_json(&views);
        }
        Command::ListAccounts => print_json(&ledger.accounts()?),
        Command::ListTransactions => print_json(&ledger.all_transactions()?),
    }

    Ok(())
}

fn exit_code(error: &minibank::Error) -> i32 {
    match error.kind() {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Store => 4,
        ErrorKind::Io => 5,
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(error) => print_error(format!("Could not serialize output as JSON: {error}")),
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
