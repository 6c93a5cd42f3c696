use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use finance_assistant::{
    Money, PasswordHash, Username, ValidatedPassword,
    cli::{
        Allocation, BudgetMonth, CategoryName, NewSplit, NewTransaction, accept_friend_request,
        create_split, create_transaction, create_user, send_friend_request, set_budget,
    },
    initialize_db,
};

/// A utility for creating a test database for the personal finance assistant.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
///
/// Creates the users "alice" and "bob", both with the password "test", who are
/// friends and share a dinner bill. Alice has a month of transactions and budgets.
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
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test users...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let alice = create_user(Username::new("alice")?, password_hash.clone(), &conn)?;
    let bob = create_user(Username::new("bob")?, password_hash, &conn)?;

    println!("Making alice and bob friends...");
    let request = send_friend_request(alice.id, bob.id, &conn)?;
    accept_friend_request(request.id, bob.id, &conn)?;

    println!("Adding transactions...");
    let today = OffsetDateTime::now_utc().date();
    let transactions = [
        (0, 420_000, "Salary", Some("Monthly pay")),
        (1, -185_000, "Rent", None),
        (2, -8_950, "Groceries", Some("Weekly shop")),
        (5, -4_320, "Eating out", Some("Lunch with bob")),
        (9, -12_075, "Groceries", None),
        (12, -6_000, "Transport", Some("Fuel")),
        (20, -2_599, "Entertainment", Some("Streaming")),
    ];
    for (days_ago, cents, category, note) in transactions {
        create_transaction(
            alice.id,
            NewTransaction {
                amount: Money::new(cents),
                category: CategoryName::new(category)?,
                date: today - Duration::days(days_ago),
                note: note.map(str::to_owned),
            },
            &conn,
        )?;
    }

    println!("Setting budgets...");
    let month = BudgetMonth::containing(today);
    for (category, cents) in [("Groceries", 20_000), ("Eating out", 4_000), ("Rent", 185_000)] {
        set_budget(
            alice.id,
            CategoryName::new(category)?,
            month,
            Money::new(cents),
            &conn,
        )?;
    }

    println!("Splitting a bill...");
    create_split(
        NewSplit {
            payer: alice.id,
            total: Money::new(8_640),
            description: "Dinner".to_owned(),
            shares: vec![
                Allocation {
                    participant: alice.id,
                    amount: Money::new(4_320),
                },
                Allocation {
                    participant: bob.id,
                    amount: Money::new(4_320),
                },
            ],
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
