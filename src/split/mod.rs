//! Bills paid by one user and shared with their friends.

mod core;
mod create_endpoint;
mod settle_endpoint;
mod splits_page;

pub use core::{
    Allocation, NewSplit, create_split, create_split_tables, get_balances, net_balance,
};
pub use create_endpoint::create_split_endpoint;
pub use settle_endpoint::settle_share_endpoint;
pub use splits_page::get_splits_page;
