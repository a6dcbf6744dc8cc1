//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: two values with the same attributes are
//! the same value. To "modify" one, build a new one.

/// Marker trait for value objects.
///
/// Requires `Clone + PartialEq + Debug`; value objects are cheap to copy and
/// compared attribute by attribute.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct SeriesRange { start: u64, end: u64 }
///
/// impl ValueObject for SeriesRange {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
