//! Receipt vocabulary and reconciliation rules.
//!
//! This crate holds the shared domain model (receipt types, unit labels, stock
//! keys) and the pure functions that convert units to receipts, assign series
//! ranges and apply consumption. Every other module calls into these rules
//! instead of re-deriving a multiplier or threshold.

pub mod kind;
pub mod rules;

pub use kind::{ReceiptType, StockKey, UnitLabel};
pub use rules::{
    SeriesPosition, SeriesRange, apply_consumption, assign_series_range, is_low_stock,
    receipts_per_unit, series_range_from, threshold_for, unit_label_for, units_to_receipts,
};
