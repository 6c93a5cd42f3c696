//! Monthly spending limits per category.

mod budgets_page;
mod core;
mod set_endpoint;

pub use budgets_page::get_budgets_page;
pub use core::{
    BudgetStatus, Overrun, budget_status, check_overruns, create_budget_table, set_budget,
};
pub use set_endpoint::set_budget_endpoint;
