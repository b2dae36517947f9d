//! Unit model
//!
//! Units of measure with their base-unit chain and cross-system equivalent.

use std::collections::HashSet;
use std::fmt;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// Measurement system a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasurementSystem {
    Metric,
    Us,
}

impl MeasurementSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementSystem::Metric => "METRIC",
            MeasurementSystem::Us => "US",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "METRIC" => Some(MeasurementSystem::Metric),
            "US" => Some(MeasurementSystem::Us),
            _ => None,
        }
    }
}

impl fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical quantity a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UnitType {
    Volume,
    Weight,
    Count,
    Length,
    Temperature,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Volume => "VOLUME",
            UnitType::Weight => "WEIGHT",
            UnitType::Count => "COUNT",
            UnitType::Length => "LENGTH",
            UnitType::Temperature => "TEMPERATURE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "VOLUME" => Some(UnitType::Volume),
            "WEIGHT" => Some(UnitType::Weight),
            "COUNT" => Some(UnitType::Count),
            "LENGTH" => Some(UnitType::Length),
            "TEMPERATURE" => Some(UnitType::Temperature),
            _ => None,
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of measure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub system: MeasurementSystem,
    pub unit_type: UnitType,
    /// None means this unit is a base unit
    pub base_unit_id: Option<i64>,
    pub base_unit_abbreviation: Option<String>,
    /// How many base-unit quantities one of this unit equals
    pub conversion_factor: f64,
    pub equivalent_unit_id: Option<i64>,
    pub equivalent_factor: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCreate {
    pub name: String,
    pub abbreviation: String,
    pub system: MeasurementSystem,
    pub unit_type: UnitType,
    pub base_unit_id: Option<i64>,
    pub conversion_factor: f64,
}

const SELECT_UNIT: &str = r#"
    SELECT u.*, b.abbreviation AS base_unit_abbreviation
    FROM units u
    LEFT JOIN units b ON b.id = u.base_unit_id
"#;

impl Unit {
    pub fn is_base(&self) -> bool {
        self.base_unit_id.is_none()
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let system: String = row.get("system")?;
        let unit_type: String = row.get("unit_type")?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            abbreviation: row.get("abbreviation")?,
            system: MeasurementSystem::from_str(&system).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(0, system.clone(), rusqlite::types::Type::Text)
            })?,
            unit_type: UnitType::from_str(&unit_type).ok_or_else(|| {
                rusqlite::Error::InvalidColumnType(0, unit_type.clone(), rusqlite::types::Type::Text)
            })?,
            base_unit_id: row.get("base_unit_id")?,
            base_unit_abbreviation: row.get("base_unit_abbreviation")?,
            conversion_factor: row.get("conversion_factor")?,
            equivalent_unit_id: row.get("equivalent_unit_id")?,
            equivalent_factor: row.get("equivalent_factor")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new unit, validating its base-unit reference
    pub fn create(conn: &Connection, data: &UnitCreate) -> DbResult<Self> {
        let name = data.name.trim();
        let abbreviation = data.abbreviation.trim();
        if name.is_empty() || abbreviation.is_empty() {
            return Err(DbError::Validation(
                "Unit name and abbreviation cannot be empty".to_string(),
            ));
        }
        if !(data.conversion_factor.is_finite() && data.conversion_factor > 0.0) {
            return Err(DbError::Validation(
                "conversion_factor must be greater than 0".to_string(),
            ));
        }
        if let Some(base_id) = data.base_unit_id {
            validate_base_unit(conn, data.system, data.unit_type, base_id)?;
        } else if data.conversion_factor != 1.0 {
            tracing::warn!(
                "Base unit '{}' created with conversion_factor {}; base units convert at 1",
                abbreviation,
                data.conversion_factor
            );
        }

        conn.execute(
            r#"
            INSERT INTO units (name, abbreviation, system, unit_type, base_unit_id, conversion_factor)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                name,
                abbreviation,
                data.system.as_str(),
                data.unit_type.as_str(),
                data.base_unit_id,
                data.conversion_factor,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a unit by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(&format!("{} WHERE u.id = ?1", SELECT_UNIT))?;

        match stmt.query_row([id], Self::from_row) {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a unit by its (unique) abbreviation
    pub fn get_by_abbreviation(conn: &Connection, abbreviation: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(&format!("{} WHERE u.abbreviation = ?1", SELECT_UNIT))?;

        match stmt.query_row([abbreviation.trim()], Self::from_row) {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List units, optionally filtered by system and/or type
    pub fn list(
        conn: &Connection,
        system: Option<MeasurementSystem>,
        unit_type: Option<UnitType>,
    ) -> DbResult<Vec<Self>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR u.system = ?1) AND (?2 IS NULL OR u.unit_type = ?2)
             ORDER BY u.system, u.unit_type, u.conversion_factor, u.name",
            SELECT_UNIT
        );
        let mut stmt = conn.prepare(&sql)?;

        let units = stmt
            .query_map(
                params![system.map(|s| s.as_str()), unit_type.map(|t| t.as_str())],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(units)
    }

    /// Count all units
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Re-point a unit at a new base unit (or make it a base unit with None)
    pub fn set_base_unit(
        conn: &Connection,
        id: i64,
        base_unit_id: Option<i64>,
        conversion_factor: f64,
    ) -> DbResult<Option<Self>> {
        let Some(unit) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        if !(conversion_factor.is_finite() && conversion_factor > 0.0) {
            return Err(DbError::Validation(
                "conversion_factor must be greater than 0".to_string(),
            ));
        }

        if let Some(base_id) = base_unit_id {
            if base_id == id {
                return Err(DbError::Validation(format!(
                    "Unit '{}' cannot be its own base unit",
                    unit.abbreviation
                )));
            }
            validate_base_unit(conn, unit.system, unit.unit_type, base_id)?;
            if would_create_base_cycle(conn, id, base_id)? {
                return Err(DbError::Validation(format!(
                    "Setting this base unit would create a circular base chain for '{}'",
                    unit.abbreviation
                )));
            }
        }

        conn.execute(
            "UPDATE units SET base_unit_id = ?1, conversion_factor = ?2, updated_at = datetime('now')
             WHERE id = ?3",
            params![base_unit_id, conversion_factor, id],
        )?;

        Self::get_by_id(conn, id)
    }

    /// Link a unit to an interchangeable unit in the other measurement system.
    ///
    /// `factor` is how many equivalent-unit quantities one of this unit equals.
    pub fn set_equivalent(
        conn: &Connection,
        id: i64,
        equivalent_unit_id: i64,
        factor: f64,
    ) -> DbResult<Option<Self>> {
        let Some(unit) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        if !(factor.is_finite() && factor > 0.0) {
            return Err(DbError::Validation(
                "equivalent_factor must be greater than 0".to_string(),
            ));
        }

        let equivalent = Self::get_by_id(conn, equivalent_unit_id)?.ok_or_else(|| {
            DbError::Validation(format!("Equivalent unit {} not found", equivalent_unit_id))
        })?;
        if equivalent.unit_type != unit.unit_type {
            return Err(DbError::Validation(format!(
                "Equivalent unit '{}' is {} but '{}' is {}",
                equivalent.abbreviation, equivalent.unit_type, unit.abbreviation, unit.unit_type
            )));
        }
        if equivalent.system == unit.system {
            return Err(DbError::Validation(format!(
                "Equivalent unit '{}' must belong to the other measurement system",
                equivalent.abbreviation
            )));
        }

        conn.execute(
            "UPDATE units SET equivalent_unit_id = ?1, equivalent_factor = ?2, updated_at = datetime('now')
             WHERE id = ?3",
            params![equivalent_unit_id, factor, id],
        )?;

        Self::get_by_id(conn, id)
    }

    /// Number of units that use this unit as their base
    pub fn get_derived_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM units WHERE base_unit_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of density conversions referencing this unit
    pub fn get_density_usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM density_conversions WHERE volume_unit_id = ?1 OR weight_unit_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a unit. Returns Ok(false) if not found.
    ///
    /// Fails on foreign keys while derived units or density conversions still reference it.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM units WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

/// A base reference must exist and share the unit's system and type
fn validate_base_unit(
    conn: &Connection,
    system: MeasurementSystem,
    unit_type: UnitType,
    base_unit_id: i64,
) -> DbResult<()> {
    let base = Unit::get_by_id(conn, base_unit_id)?
        .ok_or_else(|| DbError::Validation(format!("Base unit {} not found", base_unit_id)))?;

    if base.system != system || base.unit_type != unit_type {
        return Err(DbError::Validation(format!(
            "Base unit '{}' is {} {} but the unit is {} {}",
            base.abbreviation, base.system, base.unit_type, system, unit_type
        )));
    }

    Ok(())
}

/// Check whether pointing `unit_id` at `base_unit_id` would close a loop,
/// i.e. `unit_id` is already reachable from `base_unit_id` along base references.
pub fn would_create_base_cycle(conn: &Connection, unit_id: i64, base_unit_id: i64) -> DbResult<bool> {
    let mut visited = HashSet::new();
    let mut current = Some(base_unit_id);

    while let Some(id) = current {
        if id == unit_id {
            return Ok(true);
        }
        if !visited.insert(id) {
            // Pre-existing loop that doesn't involve unit_id
            return Ok(true);
        }
        current = conn
            .query_row("SELECT base_unit_id FROM units WHERE id = ?1", [id], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn unit(
        conn: &Connection,
        abbr: &str,
        system: MeasurementSystem,
        unit_type: UnitType,
        base: Option<i64>,
        factor: f64,
    ) -> DbResult<Unit> {
        Unit::create(
            conn,
            &UnitCreate {
                name: abbr.to_string(),
                abbreviation: abbr.to_string(),
                system,
                unit_type,
                base_unit_id: base,
                conversion_factor: factor,
            },
        )
    }

    #[test]
    fn test_create_and_fetch_with_base_abbreviation() {
        let conn = setup();
        let tsp = unit(&conn, "tsp", MeasurementSystem::Us, UnitType::Volume, None, 1.0).unwrap();
        let tbsp =
            unit(&conn, "tbsp", MeasurementSystem::Us, UnitType::Volume, Some(tsp.id), 3.0).unwrap();

        assert!(tsp.is_base());
        assert_eq!(tbsp.base_unit_id, Some(tsp.id));
        assert_eq!(tbsp.base_unit_abbreviation.as_deref(), Some("tsp"));

        let found = Unit::get_by_abbreviation(&conn, "tbsp").unwrap().unwrap();
        assert_eq!(found.id, tbsp.id);
        assert_eq!(found.system, MeasurementSystem::Us);
    }

    #[test]
    fn test_base_unit_must_match_system_and_type() {
        let conn = setup();
        let g = unit(&conn, "g", MeasurementSystem::Metric, UnitType::Weight, None, 1.0).unwrap();

        let wrong_type = unit(&conn, "ml", MeasurementSystem::Metric, UnitType::Volume, Some(g.id), 1.0);
        assert!(matches!(wrong_type, Err(DbError::Validation(_))));

        let wrong_system = unit(&conn, "oz", MeasurementSystem::Us, UnitType::Weight, Some(g.id), 28.0);
        assert!(matches!(wrong_system, Err(DbError::Validation(_))));

        let missing = unit(&conn, "kg", MeasurementSystem::Metric, UnitType::Weight, Some(999), 1000.0);
        assert!(matches!(missing, Err(DbError::Validation(_))));
    }

    #[test]
    fn test_set_base_unit_rejects_self_and_cycles() {
        let conn = setup();
        let a = unit(&conn, "a", MeasurementSystem::Us, UnitType::Length, None, 1.0).unwrap();
        let b = unit(&conn, "b", MeasurementSystem::Us, UnitType::Length, Some(a.id), 12.0).unwrap();
        let c = unit(&conn, "c", MeasurementSystem::Us, UnitType::Length, Some(b.id), 3.0).unwrap();

        let own = Unit::set_base_unit(&conn, a.id, Some(a.id), 1.0);
        assert!(matches!(own, Err(DbError::Validation(_))));

        assert!(would_create_base_cycle(&conn, a.id, c.id).unwrap());
        let cycle = Unit::set_base_unit(&conn, a.id, Some(c.id), 2.0);
        assert!(matches!(cycle, Err(DbError::Validation(_))));

        // Flattening c onto a is fine
        let moved = Unit::set_base_unit(&conn, c.id, Some(a.id), 36.0).unwrap().unwrap();
        assert_eq!(moved.base_unit_id, Some(a.id));
    }

    #[test]
    fn test_set_equivalent_requires_other_system_same_type() {
        let conn = setup();
        let tsp = unit(&conn, "tsp", MeasurementSystem::Us, UnitType::Volume, None, 1.0).unwrap();
        let ml = unit(&conn, "ml", MeasurementSystem::Metric, UnitType::Volume, None, 1.0).unwrap();
        let g = unit(&conn, "g", MeasurementSystem::Metric, UnitType::Weight, None, 1.0).unwrap();
        let tbsp =
            unit(&conn, "tbsp", MeasurementSystem::Us, UnitType::Volume, Some(tsp.id), 3.0).unwrap();

        let linked = Unit::set_equivalent(&conn, tsp.id, ml.id, 4.92892).unwrap().unwrap();
        assert_eq!(linked.equivalent_unit_id, Some(ml.id));

        assert!(matches!(
            Unit::set_equivalent(&conn, tsp.id, g.id, 5.0),
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            Unit::set_equivalent(&conn, tsp.id, tbsp.id, 3.0),
            Err(DbError::Validation(_))
        ));
        assert!(Unit::set_equivalent(&conn, 999, ml.id, 1.0).unwrap().is_none());
    }

    #[test]
    fn test_list_filters() {
        let conn = setup();
        unit(&conn, "tsp", MeasurementSystem::Us, UnitType::Volume, None, 1.0).unwrap();
        unit(&conn, "ml", MeasurementSystem::Metric, UnitType::Volume, None, 1.0).unwrap();
        unit(&conn, "g", MeasurementSystem::Metric, UnitType::Weight, None, 1.0).unwrap();

        assert_eq!(Unit::list(&conn, None, None).unwrap().len(), 3);
        assert_eq!(Unit::list(&conn, Some(MeasurementSystem::Metric), None).unwrap().len(), 2);
        assert_eq!(Unit::list(&conn, None, Some(UnitType::Volume)).unwrap().len(), 2);
        assert_eq!(
            Unit::list(&conn, Some(MeasurementSystem::Us), Some(UnitType::Weight)).unwrap().len(),
            0
        );
    }

    #[test]
    fn test_delete_blocked_by_derived_unit() {
        let conn = setup();
        let tsp = unit(&conn, "tsp", MeasurementSystem::Us, UnitType::Volume, None, 1.0).unwrap();
        let tbsp =
            unit(&conn, "tbsp", MeasurementSystem::Us, UnitType::Volume, Some(tsp.id), 3.0).unwrap();

        assert_eq!(Unit::get_derived_count(&conn, tsp.id).unwrap(), 1);
        assert!(Unit::delete(&conn, tsp.id).is_err());
        assert!(Unit::delete(&conn, tbsp.id).unwrap());
        assert!(Unit::delete(&conn, tsp.id).unwrap());
        assert!(!Unit::delete(&conn, tsp.id).unwrap());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(MeasurementSystem::from_str("metric"), Some(MeasurementSystem::Metric));
        assert_eq!(MeasurementSystem::from_str("US"), Some(MeasurementSystem::Us));
        assert_eq!(MeasurementSystem::from_str("imperial"), None);
        assert_eq!(UnitType::from_str("weight"), Some(UnitType::Weight));
        assert_eq!(UnitType::from_str("mass"), None);
    }
}
