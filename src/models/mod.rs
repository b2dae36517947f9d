//! Data models
//!
//! Rust structs representing database entities.

mod density_conversion;
mod ingredient;
mod unit;

pub use density_conversion::{DensityConversion, DensityConversionCreate, DensityConversionDetail};
pub use ingredient::{Ingredient, IngredientCreate};
pub use unit::{would_create_base_cycle, MeasurementSystem, Unit, UnitCreate, UnitType};
