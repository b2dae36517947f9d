//! Ingredient MCP Tools
//!
//! Tools for managing ingredients and their density conversions.

use serde::Serialize;

use crate::db::{Database, DbError};
use crate::models::{
    DensityConversion, DensityConversionCreate, DensityConversionDetail, Ingredient,
    IngredientCreate,
};

/// Ingredient with its density conversions
#[derive(Debug, Serialize)]
pub struct IngredientDetail {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub density_conversions: Vec<DensityConversionDetail>,
}

#[derive(Debug, Serialize)]
pub struct ListIngredientsResponse {
    pub items: Vec<Ingredient>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Add a new ingredient
pub fn add_ingredient(db: &Database, data: IngredientCreate) -> Result<Ingredient, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Ingredient::create(&conn, &data).map_err(|e| match e {
        DbError::Validation(msg) => msg,
        other => format!("Failed to create ingredient: {}", other),
    })
}

/// Get an ingredient with its density conversions
pub fn get_ingredient(db: &Database, id: i64) -> Result<Option<IngredientDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(ingredient) =
        Ingredient::get_by_id(&conn, id).map_err(|e| format!("Failed to get ingredient: {}", e))?
    else {
        return Ok(None);
    };

    let density_conversions = DensityConversion::list_for_ingredient(&conn, id)
        .map_err(|e| format!("Failed to get density conversions: {}", e))?;

    Ok(Some(IngredientDetail {
        ingredient,
        density_conversions,
    }))
}

/// List or search ingredients.
///
/// A search query takes precedence over the category filter and pagination.
pub fn list_ingredients(
    db: &Database,
    query: Option<&str>,
    category: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListIngredientsResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    if let Some(q) = query.filter(|q| !q.trim().is_empty()) {
        let items = Ingredient::search(&conn, q, limit)
            .map_err(|e| format!("Search failed: {}", e))?;
        let total = items.len() as i64;
        return Ok(ListIngredientsResponse { items, total, limit, offset: 0 });
    }

    let items = Ingredient::list(&conn, category, limit, offset)
        .map_err(|e| format!("Failed to list ingredients: {}", e))?;
    let total = Ingredient::count(&conn, category)
        .map_err(|e| format!("Failed to count ingredients: {}", e))?;

    Ok(ListIngredientsResponse { items, total, limit, offset })
}

/// Delete an ingredient (its density conversions go with it)
pub fn delete_ingredient(db: &Database, id: i64) -> Result<DeleteResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = Ingredient::delete(&conn, id)
        .map_err(|e| format!("Failed to delete ingredient: {}", e))?;
    if !deleted {
        return Err(format!("Ingredient {} not found", id));
    }

    Ok(DeleteResponse { success: true, deleted_id: id })
}

/// Record how much one volume unit of an ingredient weighs in a weight unit
pub fn add_density_conversion(
    db: &Database,
    data: DensityConversionCreate,
) -> Result<DensityConversion, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let existing = DensityConversion::find(
        &conn,
        data.ingredient_id,
        data.volume_unit_id,
        data.weight_unit_id,
    )
    .map_err(|e| format!("Database error: {}", e))?;
    if let Some(existing) = existing {
        return Err(format!(
            "Density conversion {} already covers this ingredient and unit pair",
            existing.id
        ));
    }

    DensityConversion::create(&conn, &data).map_err(|e| match e {
        DbError::Validation(msg) => msg,
        other => format!("Failed to create density conversion: {}", other),
    })
}

/// Delete a density conversion
pub fn delete_density_conversion(db: &Database, id: i64) -> Result<DeleteResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = DensityConversion::delete(&conn, id)
        .map_err(|e| format!("Failed to delete density conversion: {}", e))?;
    if !deleted {
        return Err(format!("Density conversion {} not found", id));
    }

    Ok(DeleteResponse { success: true, deleted_id: id })
}
