//! Mise Tools module
//!
//! MCP tool implementations for the unit catalog, ingredients, and conversions.

pub mod conversion;
pub mod ingredients;
pub mod status;
pub mod units;
