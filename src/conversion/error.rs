//! Conversion error types

use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::models::UnitType;

/// Every way a conversion request can fail.
///
/// All variants except `Store` are deterministic for a given catalog and
/// request; retrying without changing inputs or seeding data won't help.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Quantity must be a positive number, got {quantity}")]
    InvalidQuantity { quantity: f64 },

    #[error("Converting {quantity} gives {converted}, which is outside the representable range")]
    QuantityOutOfRange { quantity: f64, converted: f64 },

    #[error("Unit {unit_id} not found")]
    UnitNotFound { unit_id: i64 },

    #[error("Converting between {from_type} and {to_type} requires an ingredient")]
    IngredientRequiredForConversion { from_type: UnitType, to_type: UnitType },

    #[error(
        "No density conversion for ingredient {ingredient_id} from unit {volume_unit_id} to unit {weight_unit_id}"
    )]
    DensityConversionNotFound {
        ingredient_id: i64,
        volume_unit_id: i64,
        weight_unit_id: i64,
    },

    #[error("Cannot convert between {from_type} and {to_type}")]
    IncompatibleUnitTypes { from_type: UnitType, to_type: UnitType },

    #[error("Units do not share a base unit ('{from_base}' vs '{to_base}') and no equivalent links them")]
    IncompatibleBaseUnits { from_base: String, to_base: String },

    #[error("Base unit chain starting at unit {unit_id} is circular or too deep")]
    InvalidBaseChain { unit_id: i64 },

    #[error(transparent)]
    Store(#[from] DbError),
}

impl ConversionError {
    /// Stable identifier for the boundary layer
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionError::InvalidQuantity { .. } => "InvalidQuantity",
            ConversionError::QuantityOutOfRange { .. } => "QuantityOutOfRange",
            ConversionError::UnitNotFound { .. } => "UnitNotFound",
            ConversionError::IngredientRequiredForConversion { .. } => {
                "IngredientRequiredForConversion"
            }
            ConversionError::DensityConversionNotFound { .. } => "DensityConversionNotFound",
            ConversionError::IncompatibleUnitTypes { .. } => "IncompatibleUnitTypes",
            ConversionError::IncompatibleBaseUnits { .. } => "IncompatibleBaseUnits",
            ConversionError::InvalidBaseChain { .. } => "InvalidBaseChain",
            ConversionError::Store(_) => "StoreError",
        }
    }

    /// Whether the caller (rather than the store) is at fault
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, ConversionError::Store(_))
    }
}

/// Error payload returned to tool callers
#[derive(Debug, Serialize)]
pub struct ConversionErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl From<&ConversionError> for ConversionErrorResponse {
    fn from(err: &ConversionError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}
