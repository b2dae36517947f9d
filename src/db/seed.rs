//! Standard unit catalog
//!
//! US customary and metric kitchen units, each expressed against the base unit
//! of its (system, type), with the base units linked across systems.

use rusqlite::Connection;

use super::connection::{DbError, DbResult};
use crate::models::MeasurementSystem::{Metric, Us};
use crate::models::UnitType::{Count, Length, Volume, Weight};
use crate::models::{MeasurementSystem, Unit, UnitCreate, UnitType};

// ============================================================================
// Cross-system constants
// ============================================================================

/// Milliliters per teaspoon (US)
pub const ML_PER_TSP: f64 = 4.92892;
/// Grams per ounce
pub const G_PER_OZ: f64 = 28.3495;
/// Centimeters per inch
pub const CM_PER_INCH: f64 = 2.54;

/// (name, abbreviation, system, type, base abbreviation, factor to base)
///
/// Base units must come before the units that reference them.
const STANDARD_UNITS: &[(&str, &str, MeasurementSystem, UnitType, Option<&str>, f64)] = &[
    // US volume, base teaspoon
    ("Teaspoon", "tsp", Us, Volume, None, 1.0),
    ("Tablespoon", "tbsp", Us, Volume, Some("tsp"), 3.0),
    ("Fluid Ounce", "fl oz", Us, Volume, Some("tsp"), 6.0),
    ("Cup", "cup", Us, Volume, Some("tsp"), 48.0),
    ("Pint", "pt", Us, Volume, Some("tsp"), 96.0),
    ("Quart", "qt", Us, Volume, Some("tsp"), 192.0),
    ("Gallon", "gal", Us, Volume, Some("tsp"), 768.0),
    // Metric volume, base milliliter
    ("Milliliter", "ml", Metric, Volume, None, 1.0),
    ("Liter", "l", Metric, Volume, Some("ml"), 1000.0),
    // US weight, base ounce
    ("Ounce", "oz", Us, Weight, None, 1.0),
    ("Pound", "lb", Us, Weight, Some("oz"), 16.0),
    // Metric weight, base gram
    ("Gram", "g", Metric, Weight, None, 1.0),
    ("Milligram", "mg", Metric, Weight, Some("g"), 0.001),
    ("Kilogram", "kg", Metric, Weight, Some("g"), 1000.0),
    // Count
    ("Each", "ea", Us, Count, None, 1.0),
    ("Dozen", "dz", Us, Count, Some("ea"), 12.0),
    // Length
    ("Inch", "in", Us, Length, None, 1.0),
    ("Foot", "ft", Us, Length, Some("in"), 12.0),
    ("Centimeter", "cm", Metric, Length, None, 1.0),
    ("Millimeter", "mm", Metric, Length, Some("cm"), 0.1),
];

/// (abbreviation, equivalent abbreviation, equivalent units per one unit)
const STANDARD_EQUIVALENTS: &[(&str, &str, f64)] = &[
    ("tsp", "ml", ML_PER_TSP),
    ("ml", "tsp", 1.0 / ML_PER_TSP),
    ("oz", "g", G_PER_OZ),
    ("g", "oz", 1.0 / G_PER_OZ),
    ("in", "cm", CM_PER_INCH),
    ("cm", "in", 1.0 / CM_PER_INCH),
];

/// Outcome of seeding
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SeedSummary {
    pub units_created: usize,
    pub units_skipped: usize,
    pub equivalents_linked: usize,
}

/// Insert the standard unit catalog. Units whose abbreviation already exists are left alone.
pub fn seed_standard_units(conn: &Connection) -> DbResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    let tx = conn.unchecked_transaction()?;

    for &(name, abbreviation, system, unit_type, base, factor) in STANDARD_UNITS {
        if Unit::get_by_abbreviation(&tx, abbreviation)?.is_some() {
            summary.units_skipped += 1;
            continue;
        }

        let base_unit_id = match base {
            Some(base_abbr) => Some(lookup_id(&tx, base_abbr)?),
            None => None,
        };

        Unit::create(
            &tx,
            &UnitCreate {
                name: name.to_string(),
                abbreviation: abbreviation.to_string(),
                system,
                unit_type,
                base_unit_id,
                conversion_factor: factor,
            },
        )?;
        summary.units_created += 1;
    }

    for &(abbreviation, equivalent_abbr, factor) in STANDARD_EQUIVALENTS {
        let unit = Unit::get_by_abbreviation(&tx, abbreviation)?
            .ok_or_else(|| missing(abbreviation))?;
        if unit.equivalent_unit_id.is_some() {
            continue;
        }
        let equivalent_id = lookup_id(&tx, equivalent_abbr)?;
        Unit::set_equivalent(&tx, unit.id, equivalent_id, factor)?;
        summary.equivalents_linked += 1;
    }

    tx.commit()?;

    tracing::info!(
        "Seeded standard units: {} created, {} already present, {} equivalents linked",
        summary.units_created,
        summary.units_skipped,
        summary.equivalents_linked
    );

    Ok(summary)
}

fn lookup_id(conn: &Connection, abbreviation: &str) -> DbResult<i64> {
    Unit::get_by_abbreviation(conn, abbreviation)?
        .map(|u| u.id)
        .ok_or_else(|| missing(abbreviation))
}

fn missing(abbreviation: &str) -> DbError {
    DbError::Validation(format!("Standard unit '{}' is missing", abbreviation))
}
