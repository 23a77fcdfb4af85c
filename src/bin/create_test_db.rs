use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;

use minibank::{Ledger, LedgerConfig, TransactionKind};

/// A utility for creating a demo database for minibank.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// Also record a few transactions against the demo account.
    #[arg(long)]
    with_transactions: bool,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let ledger = Ledger::open(output_path, LedgerConfig::default())?;

    println!("Creating test users...");
    let valentin = ledger.create_user("Valentin Montagne", "contact@vm-it-consulting.com")?;
    ledger.create_user("Amélie Dal", "amelie.dal@gmail.com")?;

    println!("Creating test account...");
    let account_id = ledger.create_account("Compte courant", 2000.0, valentin)?;

    if args.with_transactions {
        println!("Recording test transactions...");
        ledger.record_transaction("salaire", 1800.0, account_id, TransactionKind::Credit)?;
        ledger.record_transaction("loyer", 750.0, account_id, TransactionKind::Debit)?;
        ledger.record_transaction("courses", 82.4, account_id, TransactionKind::Debit)?;
    }

    println!("Success!");

    Ok(())
}
