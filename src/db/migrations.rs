//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- UNITS
        -- Units of measure, grouped by system and type
        -- ============================================
        CREATE TABLE units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            abbreviation TEXT NOT NULL UNIQUE,
            system TEXT NOT NULL CHECK(system IN ('METRIC', 'US')),
            unit_type TEXT NOT NULL CHECK(unit_type IN ('VOLUME', 'WEIGHT', 'COUNT', 'LENGTH', 'TEMPERATURE')),

            -- NULL base_unit_id means this unit is itself a base unit
            base_unit_id INTEGER REFERENCES units(id) ON DELETE RESTRICT,
            conversion_factor REAL NOT NULL DEFAULT 1.0 CHECK(conversion_factor > 0),

            -- Interchangeable unit in the other measurement system
            equivalent_unit_id INTEGER REFERENCES units(id) ON DELETE SET NULL,
            equivalent_factor REAL CHECK(equivalent_factor IS NULL OR equivalent_factor > 0),

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            CHECK (base_unit_id IS NULL OR base_unit_id != id)
        );

        CREATE INDEX idx_units_system_type ON units(system, unit_type);
        CREATE INDEX idx_units_base ON units(base_unit_id);

        -- ============================================
        -- INGREDIENTS
        -- ============================================
        CREATE TABLE ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT,                       -- e.g. "Baking", "Dairy"
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_ingredients_name ON ingredients(name);
        CREATE INDEX idx_ingredients_category ON ingredients(category);

        -- ============================================
        -- DENSITY CONVERSIONS
        -- volume quantity x conversion_factor = weight quantity
        -- ============================================
        CREATE TABLE density_conversions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            volume_unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE RESTRICT,
            weight_unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE RESTRICT,
            conversion_factor REAL NOT NULL CHECK(conversion_factor > 0),
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),

            UNIQUE(ingredient_id, volume_unit_id, weight_unit_id)
        );

        CREATE INDEX idx_density_ingredient ON density_conversions(ingredient_id);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).unwrap());

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }

    #[test]
    fn test_unit_factor_must_be_positive() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO units (name, abbreviation, system, unit_type, conversion_factor)
             VALUES ('Broken', 'brk', 'US', 'VOLUME', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
