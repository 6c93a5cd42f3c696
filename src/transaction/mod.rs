//! The ledger: recording transactions and summarising them.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and database functions for storing and querying transactions
//! - Income and expense summaries used by the budgets, dashboard and assistant
//! - View handlers for the transactions page

mod core;
mod create_endpoint;
mod summary;
mod transactions_page;

pub use core::{
    CategoryName, NewTransaction, Transaction, TransactionFilter, TransactionKind,
    create_transaction, create_transaction_table,
};
pub use create_endpoint::create_transaction_endpoint;
pub use summary::{CategoryTotals, Summary, summarize};
pub use transactions_page::get_transactions_page;
