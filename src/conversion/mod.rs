//! Unit conversion module
//!
//! Converts quantities between catalog units: base-unit normalization,
//! cross-system equivalents, and ingredient densities for volume <-> weight.

pub mod catalog;
pub mod engine;
pub mod error;

pub use catalog::{ConversionCatalog, SqliteCatalog};
pub use engine::{
    convert, ConversionRequest, ConversionResult, ConversionStrategy, DensityDirection,
    DIRECT_CONVERSION_TRACE, UNKNOWN_INGREDIENT,
};
pub use error::{ConversionError, ConversionErrorResponse};
