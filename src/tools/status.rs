//! Mise Status Tool
//!
//! Provides runtime status information about the Mise service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database};
use crate::models::{Ingredient, Unit};

/// Conversion instructions for AI assistants
pub const CONVERSION_INSTRUCTIONS: &str = r#"
# Mise Conversion Instructions

## Catalog first

Conversions only work between units that exist in the catalog.

1. Call `list_units` to find unit IDs. If it is empty, call `seed_standard_units`
   to load US and metric kitchen units (tsp, tbsp, cup, ml, l, oz, lb, g, kg, ...).
2. Use `add_unit` for anything missing. Derived units need a `base_unit_id` from the
   same system and type, plus `conversion_factor` = base units per one unit
   (Tablespoon: base Teaspoon, factor 3).

## Converting

Call `convert_quantity` with `quantity`, `from_unit_id`, `to_unit_id`.

| From / To                  | What happens                                         |
|----------------------------|------------------------------------------------------|
| Same type, same base       | Factors along the base chain                         |
| Same type, other system    | Bridged through an equivalent link (tsp <-> ml)      |
| Volume <-> Weight          | Needs `ingredient_id` and a density conversion row   |
| Anything else              | Rejected with IncompatibleUnitTypes                  |

## Density conversions

Volume <-> weight depends on the ingredient (a cup of flour is not a cup of sugar).
Record one with `add_density_conversion`:
`conversion_factor` = weight units per one volume unit (flour: 1 cup = 120 g).

The lookup is exact: a cup/g row does not cover tbsp/g or cup/kg. Add a row per pair
you need.

## Errors

Errors come back as `{"error": "<Kind>", "message": "..."}`:
InvalidQuantity, QuantityOutOfRange, UnitNotFound, IngredientRequiredForConversion,
DensityConversionNotFound, IncompatibleUnitTypes, IncompatibleBaseUnits,
InvalidBaseChain. None of them go away on retry; change the input or add catalog data.
"#;

/// Status information for the Mise service
#[derive(Debug, Serialize)]
pub struct MiseStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub unit_count: Option<i64>,
    pub ingredient_count: Option<i64>,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Tracks service start time for status reporting
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status. Catalog counts are omitted if the database is unreachable.
    pub fn get_status(&self, db: &Database) -> MiseStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let counts = db
            .with_conn(|conn| {
                Ok((
                    migrations::get_schema_version(conn)?,
                    Unit::count(conn)?,
                    Ingredient::count(conn, None)?,
                ))
            })
            .map_err(|e| tracing::warn!("Status could not read catalog counts: {}", e))
            .ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        MiseStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version: counts.map(|c| c.0),
            unit_count: counts.map(|c| c.1),
            ingredient_count: counts.map(|c| c.2),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_catalog_counts() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            migrations::run_migrations(conn)?;
            crate::db::seed::seed_standard_units(conn)?;
            Ok(())
        })
        .unwrap();

        let tracker = StatusTracker::new(PathBuf::from("does-not-exist.db"));
        let status = tracker.get_status(&db);

        assert_eq!(status.schema_version, Some(1));
        assert!(status.unit_count.unwrap_or(0) > 0);
        assert_eq!(status.ingredient_count, Some(0));
        assert_eq!(status.database_size_bytes, None);
        assert_eq!(status.process_id, std::process::id());
    }
}
