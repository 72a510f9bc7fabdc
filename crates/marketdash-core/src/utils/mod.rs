//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{
    contains_ignore_case, format_currency, format_date, format_optional, format_thousands,
    month_abbrev, month_number, truncate_string,
};
