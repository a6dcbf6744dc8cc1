use core::str::FromStr;

use serde::{Deserialize, Serialize};

use receiptdesk_core::{DomainError, UserId};

/// Official receipt series a branch can stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReceiptType {
    #[serde(rename = "Sales Invoice")]
    SalesInvoice,
    #[serde(rename = "Collection Receipt")]
    CollectionReceipt,
    #[serde(rename = "Delivery Receipt")]
    DeliveryReceipt,
    #[serde(rename = "Service Invoice")]
    ServiceInvoice,
}

impl ReceiptType {
    pub const ALL: [ReceiptType; 4] = [
        ReceiptType::SalesInvoice,
        ReceiptType::CollectionReceipt,
        ReceiptType::DeliveryReceipt,
        ReceiptType::ServiceInvoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptType::SalesInvoice => "Sales Invoice",
            ReceiptType::CollectionReceipt => "Collection Receipt",
            ReceiptType::DeliveryReceipt => "Delivery Receipt",
            ReceiptType::ServiceInvoice => "Service Invoice",
        }
    }
}

impl core::fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ReceiptType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown receipt type: {wanted}")))
    }
}

/// Stocking granularity: a box of 500 or a booklet of 50.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitLabel {
    Box,
    Booklet,
}

impl UnitLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitLabel::Box => "Box",
            UnitLabel::Booklet => "Booklet",
        }
    }
}

impl core::fmt::Display for UnitLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key of every per-branch, per-type record (ledger rows, warehouse rows).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub branch_id: UserId,
    pub receipt_type: ReceiptType,
}

impl StockKey {
    pub fn new(branch_id: UserId, receipt_type: ReceiptType) -> Self {
        Self {
            branch_id,
            receipt_type,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.branch_id, self.receipt_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&ReceiptType::CollectionReceipt).unwrap();
        assert_eq!(json, "\"Collection Receipt\"");

        let back: ReceiptType = serde_json::from_str("\"Service Invoice\"").unwrap();
        assert_eq!(back, ReceiptType::ServiceInvoice);
    }

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("sales invoice".parse::<ReceiptType>().unwrap(), ReceiptType::SalesInvoice);
        assert!(matches!(
            "Official Receipt".parse::<ReceiptType>(),
            Err(DomainError::Validation(_))
        ));
    }
}
