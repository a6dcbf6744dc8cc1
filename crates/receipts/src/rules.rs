//! Reconciliation rules (pure functions).
//!
//! The unit table below is the only place the box/booklet multipliers and
//! low-stock thresholds are written down.

use serde::{Deserialize, Serialize};

use receiptdesk_core::{DomainError, DomainResult, ValueObject};

use crate::kind::{ReceiptType, UnitLabel};

const SALES_INVOICE_PER_UNIT: u64 = 500;
const BOOKLET_PER_UNIT: u64 = 50;

const SALES_INVOICE_THRESHOLD: u64 = 5_000;
const BOOKLET_THRESHOLD: u64 = 250;

/// Receipts contained in one stocking unit of `receipt_type`.
pub fn receipts_per_unit(receipt_type: ReceiptType) -> u64 {
    match receipt_type {
        ReceiptType::SalesInvoice => SALES_INVOICE_PER_UNIT,
        ReceiptType::CollectionReceipt
        | ReceiptType::DeliveryReceipt
        | ReceiptType::ServiceInvoice => BOOKLET_PER_UNIT,
    }
}

/// Convert a unit count into individual receipts.
pub fn units_to_receipts(receipt_type: ReceiptType, units: u32) -> u64 {
    u64::from(units) * receipts_per_unit(receipt_type)
}

pub fn unit_label_for(receipt_type: ReceiptType) -> UnitLabel {
    match receipt_type {
        ReceiptType::SalesInvoice => UnitLabel::Box,
        ReceiptType::CollectionReceipt
        | ReceiptType::DeliveryReceipt
        | ReceiptType::ServiceInvoice => UnitLabel::Booklet,
    }
}

/// Remaining-stock level at or below which a branch/type is flagged.
pub fn threshold_for(receipt_type: ReceiptType) -> u64 {
    match receipt_type {
        ReceiptType::SalesInvoice => SALES_INVOICE_THRESHOLD,
        ReceiptType::CollectionReceipt
        | ReceiptType::DeliveryReceipt
        | ReceiptType::ServiceInvoice => BOOKLET_THRESHOLD,
    }
}

pub fn is_low_stock(remaining: u64, threshold: u64) -> bool {
    remaining <= threshold
}

/// Inclusive range of receipt numbers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRange {
    pub start: u64,
    pub end: u64,
}

impl ValueObject for SeriesRange {}

impl SeriesRange {
    /// Number of receipts in the range.
    pub fn len(&self) -> u64 {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Next range after `current_end` holding `units_shipped` units.
///
/// `start = current_end + 1`, `end = start + units_shipped * per_unit - 1`.
pub fn assign_series_range(
    current_end: u64,
    units_shipped: u32,
    per_unit: u64,
) -> DomainResult<SeriesRange> {
    let start = current_end
        .checked_add(1)
        .ok_or_else(|| DomainError::validation("series counter exhausted"))?;
    series_range_from(start, units_shipped, per_unit)
}

/// Range starting at an explicit `start` holding `units_shipped` units.
pub fn series_range_from(start: u64, units_shipped: u32, per_unit: u64) -> DomainResult<SeriesRange> {
    if start == 0 {
        return Err(DomainError::validation("series numbers start at 1"));
    }
    if units_shipped == 0 || per_unit == 0 {
        return Err(DomainError::validation("a shipment must contain at least one receipt"));
    }

    let end = u64::from(units_shipped)
        .checked_mul(per_unit)
        .and_then(|receipts| start.checked_add(receipts - 1))
        .ok_or_else(|| DomainError::validation("series range overflows"))?;

    Ok(SeriesRange { start, end })
}

/// Running counters of one branch/type series allocation.
///
/// Invariant: `series_start - 1 <= last_used <= series_end`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPosition {
    pub series_start: u64,
    pub series_end: u64,
    pub last_used: u64,
    pub remaining: u64,
}

impl ValueObject for SeriesPosition {}

impl SeriesPosition {
    /// Fresh position for a newly delivered range: nothing used yet.
    pub fn opened(range: SeriesRange, receipts: u64) -> Self {
        Self {
            series_start: range.start,
            series_end: range.end,
            last_used: range.start.saturating_sub(1),
            remaining: receipts,
        }
    }

    /// Whether `last_used` lies within `[series_start - 1, series_end]`.
    pub fn is_consistent(&self) -> bool {
        self.last_used >= self.series_start.saturating_sub(1) && self.last_used <= self.series_end
    }

    /// Next receipt number to be issued.
    pub fn next_number(&self) -> u64 {
        self.last_used + 1
    }
}

/// Advance `last_used` to `new_last_used`, consuming the receipts in between.
///
/// Rejects numbers that do not move forward or that run past the series end.
/// Remaining stock is floored at zero.
pub fn apply_consumption(position: &SeriesPosition, new_last_used: u64) -> DomainResult<SeriesPosition> {
    if new_last_used <= position.last_used {
        return Err(DomainError::validation(format!(
            "last used number must be greater than {}",
            position.last_used
        )));
    }
    if new_last_used > position.series_end {
        return Err(DomainError::validation(format!(
            "last used number must not exceed series end {}",
            position.series_end
        )));
    }

    let consumed = new_last_used - position.last_used;
    Ok(SeriesPosition {
        last_used: new_last_used,
        remaining: position.remaining.saturating_sub(consumed),
        ..*position
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn position(start: u64, end: u64, last_used: u64, remaining: u64) -> SeriesPosition {
        SeriesPosition {
            series_start: start,
            series_end: end,
            last_used,
            remaining,
        }
    }

    #[test]
    fn sales_invoice_comes_in_boxes_of_500() {
        assert_eq!(units_to_receipts(ReceiptType::SalesInvoice, 5), 2_500);
        assert_eq!(unit_label_for(ReceiptType::SalesInvoice), UnitLabel::Box);
        assert_eq!(threshold_for(ReceiptType::SalesInvoice), 5_000);
    }

    #[test]
    fn other_types_come_in_booklets_of_50() {
        for t in [
            ReceiptType::CollectionReceipt,
            ReceiptType::DeliveryReceipt,
            ReceiptType::ServiceInvoice,
        ] {
            assert_eq!(units_to_receipts(t, 3), 150);
            assert_eq!(unit_label_for(t), UnitLabel::Booklet);
            assert_eq!(threshold_for(t), 250);
        }
    }

    #[test]
    fn range_follows_previous_end() {
        let range = assign_series_range(5_000, 5, 500).unwrap();
        assert_eq!(range, SeriesRange { start: 5_001, end: 7_500 });
        assert_eq!(range.len(), 2_500);
    }

    #[test]
    fn range_for_first_shipment_starts_at_one() {
        let range = assign_series_range(0, 2, 50).unwrap();
        assert_eq!(range, SeriesRange { start: 1, end: 100 });
    }

    #[test]
    fn empty_shipment_is_rejected() {
        assert!(matches!(
            assign_series_range(10, 0, 50),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn explicit_start_zero_is_rejected() {
        assert!(matches!(series_range_from(0, 1, 50), Err(DomainError::Validation(_))));
    }

    #[test]
    fn overflowing_range_is_rejected() {
        assert!(matches!(
            assign_series_range(u64::MAX - 10, 1, 500),
            Err(DomainError::Validation(_))
        ));
        assert!(assign_series_range(u64::MAX, 1, 50).is_err());
    }

    #[test]
    fn consumption_reduces_remaining_by_numbers_used() {
        let before = position(1_000, 7_500, 4_850, 2_650);
        let after = apply_consumption(&before, 5_200).unwrap();
        assert_eq!(after.last_used, 5_200);
        assert_eq!(after.remaining, 2_300);
        assert_eq!(after.series_end, 7_500);
    }

    #[test]
    fn consumption_must_move_forward() {
        let before = position(100, 500, 300, 200);
        let err = apply_consumption(&before, 300).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("greater than 300")));
    }

    #[test]
    fn consumption_cannot_pass_series_end() {
        let before = position(100, 500, 300, 200);
        let err = apply_consumption(&before, 501).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("series end 500")));
    }

    #[test]
    fn remaining_is_floored_at_zero() {
        // Counters can drift when rows are imported from the remote store.
        let before = position(1, 1_000, 0, 10);
        let after = apply_consumption(&before, 1_000).unwrap();
        assert_eq!(after.remaining, 0);
    }

    #[test]
    fn opened_position_has_nothing_used() {
        let pos = SeriesPosition::opened(SeriesRange { start: 5_001, end: 7_500 }, 2_500);
        assert_eq!(pos.last_used, 5_000);
        assert_eq!(pos.next_number(), 5_001);
        assert!(pos.is_consistent());
    }

    #[test]
    fn low_stock_includes_threshold() {
        assert!(is_low_stock(250, 250));
        assert!(!is_low_stock(251, 250));
    }

    fn any_receipt_type() -> impl Strategy<Value = ReceiptType> {
        prop::sample::select(ReceiptType::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the unit multiplier depends on the type alone.
        #[test]
        fn units_to_receipts_matches_table(t in any_receipt_type(), units in 0u32..100_000) {
            let expected = u64::from(units) * if t == ReceiptType::SalesInvoice { 500 } else { 50 };
            prop_assert_eq!(units_to_receipts(t, units), expected);
        }

        /// Property: consecutive ranges never overlap and leave no gap.
        #[test]
        fn consecutive_ranges_are_contiguous(
            start_end in 0u64..1_000_000,
            shipments in prop::collection::vec(1u32..40, 1..8),
            t in any_receipt_type(),
        ) {
            let mut end = start_end;
            for units in shipments {
                let range = assign_series_range(end, units, receipts_per_unit(t)).unwrap();
                prop_assert_eq!(range.start, end + 1);
                prop_assert_eq!(range.len(), units_to_receipts(t, units));
                end = range.end;
            }
        }

        /// Property: strictly increasing in-bounds consumption keeps remaining
        /// stock non-increasing and the position consistent.
        #[test]
        fn consumption_never_increases_remaining(
            steps in prop::collection::vec(1u64..200, 1..30),
            remaining in 0u64..5_000,
        ) {
            let mut pos = position(1, 5_000, 0, remaining);
            for step in steps {
                let next = pos.last_used + step;
                if next > pos.series_end {
                    prop_assert!(apply_consumption(&pos, next).is_err());
                    break;
                }
                let after = apply_consumption(&pos, next).unwrap();
                prop_assert!(after.remaining <= pos.remaining);
                prop_assert!(after.is_consistent());
                pos = after;
            }
        }
    }
}
