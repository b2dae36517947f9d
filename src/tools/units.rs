//! Unit MCP Tools
//!
//! Tools for managing the unit catalog.

use serde::Serialize;

use crate::db::{seed, Database, DbError};
use crate::models::{MeasurementSystem, Unit, UnitCreate, UnitType};

/// Summary of a unit for list results
#[derive(Debug, Serialize)]
pub struct UnitSummary {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub system: MeasurementSystem,
    pub unit_type: UnitType,
    pub base_unit: Option<String>,
    pub conversion_factor: f64,
}

impl From<&Unit> for UnitSummary {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            abbreviation: unit.abbreviation.clone(),
            system: unit.system,
            unit_type: unit.unit_type,
            base_unit: unit.base_unit_abbreviation.clone(),
            conversion_factor: unit.conversion_factor,
        }
    }
}

/// Full unit detail with usage information
#[derive(Debug, Serialize)]
pub struct UnitDetail {
    #[serde(flatten)]
    pub unit: Unit,
    pub equivalent_unit: Option<String>,
    pub derived_unit_count: i64,
    pub density_conversion_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ListUnitsResponse {
    pub units: Vec<UnitSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteUnitSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteUnitBlockedResponse {
    pub error: String,
    pub derived_unit_count: i64,
    pub density_conversion_count: i64,
}

fn parse_system(s: &str) -> Result<MeasurementSystem, String> {
    MeasurementSystem::from_str(s)
        .ok_or_else(|| format!("Unknown measurement system '{}'. Use METRIC or US", s))
}

fn parse_unit_type(s: &str) -> Result<UnitType, String> {
    UnitType::from_str(s).ok_or_else(|| {
        format!(
            "Unknown unit type '{}'. Use VOLUME, WEIGHT, COUNT, LENGTH, or TEMPERATURE",
            s
        )
    })
}

fn describe(e: DbError, action: &str) -> String {
    match e {
        DbError::Validation(msg) => msg,
        other => format!("Failed to {}: {}", action, other),
    }
}

/// Add a new unit
pub fn add_unit(
    db: &Database,
    name: &str,
    abbreviation: &str,
    system: &str,
    unit_type: &str,
    base_unit_id: Option<i64>,
    conversion_factor: Option<f64>,
) -> Result<Unit, String> {
    // A derived unit with a defaulted factor of 1 would silently equal its base
    let conversion_factor = match (base_unit_id, conversion_factor) {
        (Some(_), None) => {
            return Err("conversion_factor is required when base_unit_id is set".to_string())
        }
        (_, factor) => factor.unwrap_or(1.0),
    };

    let data = UnitCreate {
        name: name.to_string(),
        abbreviation: abbreviation.to_string(),
        system: parse_system(system)?,
        unit_type: parse_unit_type(unit_type)?,
        base_unit_id,
        conversion_factor,
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Unit::get_by_abbreviation(&conn, &data.abbreviation)
        .map_err(|e| format!("Database error: {}", e))?
        .is_some()
    {
        return Err(format!("A unit with abbreviation '{}' already exists", data.abbreviation.trim()));
    }

    Unit::create(&conn, &data).map_err(|e| describe(e, "create unit"))
}

/// Get a unit by ID with usage information
pub fn get_unit(db: &Database, id: i64) -> Result<Option<UnitDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(unit) = Unit::get_by_id(&conn, id).map_err(|e| format!("Failed to get unit: {}", e))? else {
        return Ok(None);
    };

    let equivalent_unit = match unit.equivalent_unit_id {
        Some(eq_id) => Unit::get_by_id(&conn, eq_id)
            .map_err(|e| format!("Failed to get equivalent unit: {}", e))?
            .map(|u| u.abbreviation),
        None => None,
    };
    let derived_unit_count = Unit::get_derived_count(&conn, id)
        .map_err(|e| format!("Failed to count derived units: {}", e))?;
    let density_conversion_count = Unit::get_density_usage_count(&conn, id)
        .map_err(|e| format!("Failed to count density conversions: {}", e))?;

    Ok(Some(UnitDetail {
        unit,
        equivalent_unit,
        derived_unit_count,
        density_conversion_count,
    }))
}

/// List units, optionally filtered by system and type
pub fn list_units(
    db: &Database,
    system: Option<&str>,
    unit_type: Option<&str>,
) -> Result<ListUnitsResponse, String> {
    let system = system.map(parse_system).transpose()?;
    let unit_type = unit_type.map(parse_unit_type).transpose()?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let units = Unit::list(&conn, system, unit_type)
        .map_err(|e| format!("Failed to list units: {}", e))?;

    let units: Vec<UnitSummary> = units.iter().map(UnitSummary::from).collect();
    let total = units.len();

    Ok(ListUnitsResponse { units, total })
}

/// Point a unit at a new base unit, or make it a base unit
pub fn set_unit_base(
    db: &Database,
    id: i64,
    base_unit_id: Option<i64>,
    conversion_factor: f64,
) -> Result<Option<Unit>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Unit::set_base_unit(&conn, id, base_unit_id, conversion_factor)
        .map_err(|e| describe(e, "update base unit"))
}

/// Link a unit to its equivalent in the other measurement system
pub fn set_unit_equivalent(
    db: &Database,
    id: i64,
    equivalent_unit_id: i64,
    equivalent_factor: f64,
) -> Result<Option<Unit>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Unit::set_equivalent(&conn, id, equivalent_unit_id, equivalent_factor)
        .map_err(|e| describe(e, "set equivalent unit"))
}

/// Delete a unit that nothing references
pub fn delete_unit(
    db: &Database,
    id: i64,
) -> Result<Result<DeleteUnitSuccessResponse, DeleteUnitBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if Unit::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get unit: {}", e))?
        .is_none()
    {
        return Err(format!("Unit {} not found", id));
    }

    let derived_unit_count = Unit::get_derived_count(&conn, id)
        .map_err(|e| format!("Failed to count derived units: {}", e))?;
    let density_conversion_count = Unit::get_density_usage_count(&conn, id)
        .map_err(|e| format!("Failed to count density conversions: {}", e))?;

    if derived_unit_count > 0 || density_conversion_count > 0 {
        return Ok(Err(DeleteUnitBlockedResponse {
            error: "Unit is still referenced by derived units or density conversions".to_string(),
            derived_unit_count,
            density_conversion_count,
        }));
    }

    let deleted = Unit::delete(&conn, id).map_err(|e| format!("Failed to delete unit: {}", e))?;
    Ok(Ok(DeleteUnitSuccessResponse {
        success: deleted,
        deleted_id: id,
    }))
}

/// Load the standard US and metric unit catalog
pub fn seed_standard_units(db: &Database) -> Result<seed::SeedSummary, String> {
    db.with_conn(seed::seed_standard_units)
        .map_err(|e| format!("Failed to seed units: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;

    fn setup() -> Database {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| migrations::run_migrations(conn)).unwrap();
        db
    }

    #[test]
    fn test_add_unit_rejects_bad_input() {
        let db = setup();
        assert!(add_unit(&db, "Teaspoon", "tsp", "imperial", "volume", None, None).is_err());
        assert!(add_unit(&db, "Teaspoon", "tsp", "us", "volume-ish", None, None).is_err());

        add_unit(&db, "Teaspoon", "tsp", "us", "volume", None, None).unwrap();
        let dup = add_unit(&db, "Teaspoon again", "tsp", "us", "volume", None, None);
        assert!(dup.unwrap_err().contains("already exists"));
    }

    #[test]
    fn test_derived_unit_requires_factor() {
        let db = setup();
        let tsp = add_unit(&db, "Teaspoon", "tsp", "US", "VOLUME", None, None).unwrap();

        let err = add_unit(&db, "Tablespoon", "tbsp", "US", "VOLUME", Some(tsp.id), None).unwrap_err();
        assert!(err.contains("conversion_factor is required"));
        assert!(list_units(&db, None, None).unwrap().units.iter().all(|u| u.abbreviation != "tbsp"));

        let tbsp = add_unit(&db, "Tablespoon", "tbsp", "US", "VOLUME", Some(tsp.id), Some(3.0)).unwrap();
        assert_eq!(tbsp.conversion_factor, 3.0);
    }

    #[test]
    fn test_get_and_delete_unit() {
        let db = setup();
        let tsp = add_unit(&db, "Teaspoon", "tsp", "US", "VOLUME", None, None).unwrap();
        let tbsp = add_unit(&db, "Tablespoon", "tbsp", "US", "VOLUME", Some(tsp.id), Some(3.0)).unwrap();

        let detail = get_unit(&db, tsp.id).unwrap().unwrap();
        assert_eq!(detail.derived_unit_count, 1);
        assert!(get_unit(&db, 999).unwrap().is_none());

        let blocked = delete_unit(&db, tsp.id).unwrap().unwrap_err();
        assert_eq!(blocked.derived_unit_count, 1);

        assert!(delete_unit(&db, tbsp.id).unwrap().unwrap().success);
        assert!(delete_unit(&db, tsp.id).unwrap().unwrap().success);
        assert!(delete_unit(&db, tsp.id).is_err());
    }

    #[test]
    fn test_seed_then_list_by_filter() {
        let db = setup();
        let summary = seed_standard_units(&db).unwrap();
        assert!(summary.units_created > 0);

        let metric_weight = list_units(&db, Some("metric"), Some("weight")).unwrap();
        let abbrs: Vec<&str> = metric_weight.units.iter().map(|u| u.abbreviation.as_str()).collect();
        assert_eq!(abbrs, vec!["mg", "g", "kg"]);

        assert!(list_units(&db, Some("martian"), None).is_err());
    }
}
