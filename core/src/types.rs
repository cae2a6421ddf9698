//! Shared primitive types used across the whole pipeline.

/// A fraud-termination rule name as it appears in the warehouse.
pub type RuleName = String;

/// ISO 3166-1 alpha-2 country code ("Unknown" when the warehouse has none).
pub type CountryCode = String;

/// A shop identifier from the warehouse.
pub type ShopId = i64;
