//! Density Conversion model
//!
//! Ingredient-specific factor relating a volume unit to a weight unit:
//! volume quantity x conversion_factor = weight quantity.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{Ingredient, Unit, UnitType};

/// A density conversion row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityConversion {
    pub id: i64,
    pub ingredient_id: i64,
    pub volume_unit_id: i64,
    pub weight_unit_id: i64,
    pub conversion_factor: f64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Density conversion joined with unit abbreviations for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityConversionDetail {
    pub id: i64,
    pub volume_unit_id: i64,
    pub volume_unit: String,
    pub weight_unit_id: i64,
    pub weight_unit: String,
    pub conversion_factor: f64,
    pub notes: Option<String>,
}

/// Data for creating a density conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityConversionCreate {
    pub ingredient_id: i64,
    pub volume_unit_id: i64,
    pub weight_unit_id: i64,
    pub conversion_factor: f64,
    pub notes: Option<String>,
}

impl DensityConversion {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ingredient_id: row.get("ingredient_id")?,
            volume_unit_id: row.get("volume_unit_id")?,
            weight_unit_id: row.get("weight_unit_id")?,
            conversion_factor: row.get("conversion_factor")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a density conversion after checking the ingredient and both unit types
    pub fn create(conn: &Connection, data: &DensityConversionCreate) -> DbResult<Self> {
        if !(data.conversion_factor.is_finite() && data.conversion_factor > 0.0) {
            return Err(DbError::Validation(
                "conversion_factor must be greater than 0".to_string(),
            ));
        }
        if Ingredient::get_by_id(conn, data.ingredient_id)?.is_none() {
            return Err(DbError::Validation(format!(
                "Ingredient {} not found",
                data.ingredient_id
            )));
        }
        expect_unit_type(conn, data.volume_unit_id, UnitType::Volume)?;
        expect_unit_type(conn, data.weight_unit_id, UnitType::Weight)?;

        conn.execute(
            r#"
            INSERT INTO density_conversions
                (ingredient_id, volume_unit_id, weight_unit_id, conversion_factor, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.ingredient_id,
                data.volume_unit_id,
                data.weight_unit_id,
                data.conversion_factor,
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get a density conversion by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM density_conversions WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up the row for an exact (ingredient, volume unit, weight unit) triple
    pub fn find(
        conn: &Connection,
        ingredient_id: i64,
        volume_unit_id: i64,
        weight_unit_id: i64,
    ) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM density_conversions
            WHERE ingredient_id = ?1 AND volume_unit_id = ?2 AND weight_unit_id = ?3
            "#,
        )?;

        match stmt.query_row(params![ingredient_id, volume_unit_id, weight_unit_id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All density conversions for an ingredient, with unit abbreviations
    pub fn list_for_ingredient(
        conn: &Connection,
        ingredient_id: i64,
    ) -> DbResult<Vec<DensityConversionDetail>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT dc.id, dc.volume_unit_id, v.abbreviation AS volume_unit,
                   dc.weight_unit_id, w.abbreviation AS weight_unit,
                   dc.conversion_factor, dc.notes
            FROM density_conversions dc
            INNER JOIN units v ON v.id = dc.volume_unit_id
            INNER JOIN units w ON w.id = dc.weight_unit_id
            WHERE dc.ingredient_id = ?1
            ORDER BY v.abbreviation, w.abbreviation
            "#,
        )?;

        let rows = stmt
            .query_map([ingredient_id], |row| {
                Ok(DensityConversionDetail {
                    id: row.get("id")?,
                    volume_unit_id: row.get("volume_unit_id")?,
                    volume_unit: row.get("volume_unit")?,
                    weight_unit_id: row.get("weight_unit_id")?,
                    weight_unit: row.get("weight_unit")?,
                    conversion_factor: row.get("conversion_factor")?,
                    notes: row.get("notes")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Delete a density conversion. Returns Ok(false) if not found.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM density_conversions WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

fn expect_unit_type(conn: &Connection, unit_id: i64, expected: UnitType) -> DbResult<Unit> {
    let unit = Unit::get_by_id(conn, unit_id)?
        .ok_or_else(|| DbError::Validation(format!("Unit {} not found", unit_id)))?;

    if unit.unit_type != expected {
        return Err(DbError::Validation(format!(
            "Unit '{}' is {}, expected {}",
            unit.abbreviation, unit.unit_type, expected
        )));
    }

    Ok(unit)
}
