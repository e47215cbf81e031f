//! Display helpers shared by the views.

pub mod format;

pub use format::{format_date, format_datetime, format_money, format_optional, truncate_string};
