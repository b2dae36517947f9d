//! Read-only catalog the conversion engine queries
//!
//! The engine never touches the database directly; it receives a catalog
//! for the duration of one conversion.

use rusqlite::Connection;

use crate::db::DbResult;
use crate::models::{DensityConversion, Ingredient, Unit};

/// Lookups the conversion engine needs from the unit and density store
pub trait ConversionCatalog {
    /// Resolve a unit, with its base unit's abbreviation inlined
    fn get_unit(&self, id: i64) -> DbResult<Option<Unit>>;

    /// Density row for an exact (ingredient, volume unit, weight unit) triple
    fn get_density_conversion(
        &self,
        ingredient_id: i64,
        volume_unit_id: i64,
        weight_unit_id: i64,
    ) -> DbResult<Option<DensityConversion>>;

    /// Display name used only to annotate the conversion trace
    fn get_ingredient_display_name(&self, ingredient_id: i64) -> DbResult<Option<String>>;
}

/// Catalog over a SQLite connection.
///
/// Pass a `Transaction` to get a point-in-time view for the whole conversion.
pub struct SqliteCatalog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalog<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ConversionCatalog for SqliteCatalog<'_> {
    fn get_unit(&self, id: i64) -> DbResult<Option<Unit>> {
        Unit::get_by_id(self.conn, id)
    }

    fn get_density_conversion(
        &self,
        ingredient_id: i64,
        volume_unit_id: i64,
        weight_unit_id: i64,
    ) -> DbResult<Option<DensityConversion>> {
        DensityConversion::find(self.conn, ingredient_id, volume_unit_id, weight_unit_id)
    }

    fn get_ingredient_display_name(&self, ingredient_id: i64) -> DbResult<Option<String>> {
        Ok(Ingredient::get_by_id(self.conn, ingredient_id)?.map(|i| i.name))
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;

    use super::*;
    use crate::db::DbError;
    use crate::models::{MeasurementSystem, UnitType};

    /// HashMap-backed catalog for engine tests
    #[derive(Default)]
    pub struct MemoryCatalog {
        units: HashMap<i64, Unit>,
        densities: HashMap<(i64, i64, i64), DensityConversion>,
        ingredients: HashMap<i64, String>,
        pub fail_ingredient_lookup: bool,
    }

    impl MemoryCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_unit(
            &mut self,
            id: i64,
            abbreviation: &str,
            system: MeasurementSystem,
            unit_type: UnitType,
            base_unit_id: Option<i64>,
            conversion_factor: f64,
        ) {
            let base_unit_abbreviation =
                base_unit_id.and_then(|b| self.units.get(&b).map(|u| u.abbreviation.clone()));
            self.units.insert(
                id,
                Unit {
                    id,
                    name: abbreviation.to_string(),
                    abbreviation: abbreviation.to_string(),
                    system,
                    unit_type,
                    base_unit_id,
                    base_unit_abbreviation,
                    conversion_factor,
                    equivalent_unit_id: None,
                    equivalent_factor: None,
                    created_at: String::new(),
                    updated_at: String::new(),
                },
            );
        }

        pub fn link_equivalent(&mut self, id: i64, equivalent_unit_id: i64, factor: f64) {
            if let Some(unit) = self.units.get_mut(&id) {
                unit.equivalent_unit_id = Some(equivalent_unit_id);
                unit.equivalent_factor = Some(factor);
            }
        }

        pub fn add_ingredient(&mut self, id: i64, name: &str) {
            self.ingredients.insert(id, name.to_string());
        }

        pub fn add_density(&mut self, ingredient_id: i64, volume: i64, weight: i64, factor: f64) {
            let id = self.densities.len() as i64 + 1;
            self.densities.insert(
                (ingredient_id, volume, weight),
                DensityConversion {
                    id,
                    ingredient_id,
                    volume_unit_id: volume,
                    weight_unit_id: weight,
                    conversion_factor: factor,
                    notes: None,
                    created_at: String::new(),
                    updated_at: String::new(),
                },
            );
        }
    }

    impl ConversionCatalog for MemoryCatalog {
        fn get_unit(&self, id: i64) -> DbResult<Option<Unit>> {
            Ok(self.units.get(&id).cloned())
        }

        fn get_density_conversion(
            &self,
            ingredient_id: i64,
            volume_unit_id: i64,
            weight_unit_id: i64,
        ) -> DbResult<Option<DensityConversion>> {
            Ok(self
                .densities
                .get(&(ingredient_id, volume_unit_id, weight_unit_id))
                .cloned())
        }

        fn get_ingredient_display_name(&self, ingredient_id: i64) -> DbResult<Option<String>> {
            if self.fail_ingredient_lookup {
                return Err(DbError::Validation("ingredient store offline".to_string()));
            }
            Ok(self.ingredients.get(&ingredient_id).cloned())
        }
    }
}
