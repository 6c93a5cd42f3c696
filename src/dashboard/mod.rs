//! The dashboard: this month's totals, budget overruns, balances with friends
//! and charts of where the money went.

mod cards;
mod charts;
mod handlers;

pub use handlers::get_dashboard_page;
