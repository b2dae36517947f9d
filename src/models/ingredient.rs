//! Ingredient model

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// A culinary ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCreate {
    pub name: String,
    pub category: Option<String>,
    pub notes: Option<String>,
}

impl Ingredient {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new ingredient
    pub fn create(conn: &Connection, data: &IngredientCreate) -> DbResult<Self> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(DbError::Validation("Ingredient name cannot be empty".to_string()));
        }
        let category = data
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        conn.execute(
            "INSERT INTO ingredients (name, category, notes) VALUES (?1, ?2, ?3)",
            params![name, category, data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Get an ingredient by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM ingredients WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Search ingredients by name or category
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE name LIKE ?1 OR category LIKE ?1
            ORDER BY name ASC
            LIMIT ?2
            "#,
        )?;

        let items = stmt
            .query_map(params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// List ingredients, optionally within one category
    pub fn list(
        conn: &Connection,
        category: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM ingredients
            WHERE (?1 IS NULL OR category = ?1)
            ORDER BY name ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;

        let items = stmt
            .query_map(params![category, limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Count ingredients, optionally within one category
    pub fn count(conn: &Connection, category: Option<&str>) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ingredients WHERE (?1 IS NULL OR category = ?1)",
            params![category],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete an ingredient and its density conversions.
    /// Returns Ok(false) if not found.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM ingredients WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn add(conn: &Connection, name: &str, category: Option<&str>) -> Ingredient {
        Ingredient::create(
            conn,
            &IngredientCreate {
                name: name.to_string(),
                category: category.map(str::to_string),
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_trims_and_blanks_category() {
        let conn = setup();
        let item = add(&conn, "  Rolled oats ", Some("  "));
        assert_eq!(item.name, "Rolled oats");
        assert_eq!(item.category, None);

        let empty = Ingredient::create(
            &conn,
            &IngredientCreate { name: " ".to_string(), category: None, notes: None },
        );
        assert!(matches!(empty, Err(DbError::Validation(_))));
    }

    #[test]
    fn test_search_and_list() {
        let conn = setup();
        add(&conn, "All-purpose flour", Some("Baking"));
        add(&conn, "Brown sugar", Some("Baking"));
        add(&conn, "Whole milk", Some("Dairy"));

        assert_eq!(Ingredient::search(&conn, "flour", 10).unwrap().len(), 1);
        assert_eq!(Ingredient::search(&conn, "baking", 10).unwrap().len(), 2);

        let baking = Ingredient::list(&conn, Some("Baking"), 50, 0).unwrap();
        assert_eq!(baking.len(), 2);
        assert_eq!(baking[0].name, "All-purpose flour");
        assert_eq!(Ingredient::count(&conn, None).unwrap(), 3);
        assert_eq!(Ingredient::list(&conn, None, 1, 1).unwrap()[0].name, "Brown sugar");
    }
}
