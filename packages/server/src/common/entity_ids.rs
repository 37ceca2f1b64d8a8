//! Typed ID definitions for the entities this service touches.

pub use super::id::Id;

/// Marker type for product records whose generated content is refreshed.
pub struct Product;

/// Typed ID for refreshable product records.
pub type RecordId = Id<Product>;
