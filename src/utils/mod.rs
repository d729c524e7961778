//! Small formatting helpers shared by the transformer and the handlers

pub mod helper;

pub use helper::{format_amount, round_amount, truncate_display};
