//! Mise Library
//!
//! Unit catalog, ingredient densities, and quantity conversion for retreat kitchens.

pub mod build_info;
pub mod conversion;
pub mod db;
pub mod mcp;
pub mod models;
pub mod tools;
