use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use banker_rs::{AccountNumber, get_account_by_number, set_bankrupt};

/// Flag an account as bankrupt, which stops it from withdrawing money, or clear the flag.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The account number of the account to update.
    account_no: AccountNumber,

    /// Clear the flag instead of setting it.
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }

    let connection = Connection::open(db_path)?;
    let is_bankrupt = !args.clear;

    if let Err(error) = set_bankrupt(args.account_no, is_bankrupt, &connection) {
        eprintln!("Could not update account {}: {error}", args.account_no);
        exit(1);
    }

    let account = get_account_by_number(args.account_no, &connection)?;
    println!(
        "Account {} is {}",
        account.account_no,
        if account.is_bankrupt {
            "now flagged as bankrupt"
        } else {
            "no longer flagged as bankrupt"
        }
    );

    Ok(())
}
