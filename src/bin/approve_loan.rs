use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use banker_rs::{TransactionId, approve_loan, get_pending_loans};

/// Approve a loan request and credit the loan to the borrower's account.
///
/// Lists the pending loan requests when no loan ID is given.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The ID of the loan request to approve.
    loan_id: Option<TransactionId>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }

    let connection = Connection::open(db_path)?;
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let Some(loan_id) = args.loan_id else {
        let pending_loans = get_pending_loans(&connection)?;

        if pending_loans.is_empty() {
            println!("There are no pending loan requests.");
        }

        for loan in pending_loans {
            println!(
                "Loan {}: {} for account ID {}, requested {}",
                loan.id, loan.amount, loan.account_id, loan.timestamp
            );
        }

        return Ok(());
    };

    match approve_loan(loan_id, &connection) {
        Ok(loan) => {
            println!(
                "Approved loan {} of {}, the new balance is {}",
                loan.id, loan.amount, loan.balance_after_transaction
            );
            Ok(())
        }
        Err(error) => {
            eprintln!("Could not approve loan {loan_id}: {error}");
            exit(1);
        }
    }
}
