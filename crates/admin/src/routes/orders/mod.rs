//! Order route handlers.
//!
//! The list filters the full order set in the panel; the detail page shows
//! one order and changes its status.

mod detail;
mod list;

pub use detail::{OrderShowTemplate, StatusForm, show, update_status};
pub use list::{OrdersQuery, OrdersTemplate, index};
