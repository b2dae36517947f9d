//! Mise MCP Server Implementation
//!
//! Implements the MCP server with all Mise tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::conversion::ConversionRequest;
use crate::db::Database;
use crate::models::{DensityConversionCreate, IngredientCreate};
use crate::tools::conversion;
use crate::tools::ingredients;
use crate::tools::status::StatusTracker;
use crate::tools::units;

/// Mise MCP Service
#[derive(Clone)]
pub struct MiseService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<MiseService>,
}

impl MiseService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        what, id
    ))]))
}

// ============================================================================
// Conversion Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConvertQuantityParams {
    /// Quantity to convert (must be greater than 0)
    pub quantity: f64,
    /// Unit ID to convert from
    pub from_unit_id: i64,
    /// Unit ID to convert to
    pub to_unit_id: i64,
    /// Ingredient ID, required only for volume <-> weight conversions
    pub ingredient_id: Option<i64>,
}

// ============================================================================
// Unit Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddUnitParams {
    /// Display name (e.g., "Tablespoon")
    pub name: String,
    /// Unique abbreviation (e.g., "tbsp")
    pub abbreviation: String,
    /// Measurement system: METRIC or US
    pub system: String,
    /// Unit type: VOLUME, WEIGHT, COUNT, LENGTH, or TEMPERATURE
    pub unit_type: String,
    /// Base unit ID (same system and type). Omit to create a base unit.
    pub base_unit_id: Option<i64>,
    /// Base units per one of this unit. Required when base_unit_id is set.
    pub conversion_factor: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetUnitParams {
    /// Unit ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListUnitsParams {
    /// Filter by measurement system: METRIC or US
    pub system: Option<String>,
    /// Filter by unit type: VOLUME, WEIGHT, COUNT, LENGTH, TEMPERATURE
    pub unit_type: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetUnitBaseParams {
    /// Unit ID to update
    pub id: i64,
    /// New base unit ID, or null to make this a base unit
    pub base_unit_id: Option<i64>,
    /// Base units per one of this unit
    #[serde(default = "default_factor")]
    pub conversion_factor: f64,
}

fn default_factor() -> f64 { 1.0 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetUnitEquivalentParams {
    /// Unit ID to link
    pub id: i64,
    /// Unit ID in the other measurement system with the same unit type
    pub equivalent_unit_id: i64,
    /// Equivalent units per one of this unit (e.g., tsp -> ml: 4.92892)
    pub equivalent_factor: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteUnitParams {
    /// Unit ID to delete
    pub id: i64,
}

// ============================================================================
// Ingredient Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    /// Ingredient name
    pub name: String,
    /// Category (e.g., "Baking", "Dairy")
    pub category: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetIngredientParams {
    /// Ingredient ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListIngredientsParams {
    /// Search by name or category (optional)
    pub query: Option<String>,
    /// Exact category filter (ignored when query is set)
    pub category: Option<String>,
    /// Maximum results (default 50, max 200)
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    /// Offset for pagination
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteIngredientParams {
    /// Ingredient ID to delete (its density conversions are deleted too)
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddDensityConversionParams {
    /// Ingredient ID
    pub ingredient_id: i64,
    /// VOLUME unit ID
    pub volume_unit_id: i64,
    /// WEIGHT unit ID
    pub weight_unit_id: i64,
    /// Weight units per one volume unit (e.g., 1 cup flour = 120 g -> 120)
    pub conversion_factor: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteDensityConversionParams {
    /// Density conversion ID
    pub id: i64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl MiseService {
    // --- Status ---

    #[tool(description = "Get the current status of the Mise service including build info, catalog counts, and process information")]
    async fn mise_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        to_json(&status)
    }

    #[tool(description = "Get instructions for converting quantities and maintaining the unit catalog. Call this before the first conversion in a session.")]
    fn conversion_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::CONVERSION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(CONVERSION_INSTRUCTIONS)]))
    }

    // --- Conversion ---

    #[tool(description = "Convert a quantity between two units. Volume <-> weight conversions need an ingredient_id with a matching density conversion.")]
    fn convert_quantity(&self, Parameters(p): Parameters<ConvertQuantityParams>) -> Result<CallToolResult, McpError> {
        let request = ConversionRequest {
            quantity: p.quantity,
            from_unit_id: p.from_unit_id,
            to_unit_id: p.to_unit_id,
            ingredient_id: p.ingredient_id,
        };
        let result = conversion::convert_quantity(&self.database, request).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Ok(converted) => to_json(&converted),
            Err(rejected) => to_json(&rejected),
        }
    }

    // --- Units ---

    #[tool(description = "Add a unit of measure. Derived units reference a base unit of the same system and type.")]
    fn add_unit(&self, Parameters(p): Parameters<AddUnitParams>) -> Result<CallToolResult, McpError> {
        let result = units::add_unit(
            &self.database, &p.name, &p.abbreviation, &p.system, &p.unit_type, p.base_unit_id, p.conversion_factor,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a unit with its equivalent unit and usage counts")]
    fn get_unit(&self, Parameters(p): Parameters<GetUnitParams>) -> Result<CallToolResult, McpError> {
        match units::get_unit(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(unit) => to_json(&unit),
            None => not_found("Unit", p.id),
        }
    }

    #[tool(description = "List units, optionally filtered by measurement system and unit type")]
    fn list_units(&self, Parameters(p): Parameters<ListUnitsParams>) -> Result<CallToolResult, McpError> {
        let result = units::list_units(&self.database, p.system.as_deref(), p.unit_type.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Change a unit's base unit and conversion factor. Rejects self references, cross-system or cross-type bases, and cycles.")]
    fn set_unit_base(&self, Parameters(p): Parameters<SetUnitBaseParams>) -> Result<CallToolResult, McpError> {
        match units::set_unit_base(&self.database, p.id, p.base_unit_id, p.conversion_factor)
            .map_err(|e| McpError::internal_error(e, None))?
        {
            Some(unit) => to_json(&unit),
            None => not_found("Unit", p.id),
        }
    }

    #[tool(description = "Link a unit to its equivalent in the other measurement system (e.g., tsp -> ml)")]
    fn set_unit_equivalent(&self, Parameters(p): Parameters<SetUnitEquivalentParams>) -> Result<CallToolResult, McpError> {
        match units::set_unit_equivalent(&self.database, p.id, p.equivalent_unit_id, p.equivalent_factor)
            .map_err(|e| McpError::internal_error(e, None))?
        {
            Some(unit) => to_json(&unit),
            None => not_found("Unit", p.id),
        }
    }

    #[tool(description = "Delete a unit (only allowed if no derived units or density conversions reference it)")]
    fn delete_unit(&self, Parameters(p): Parameters<DeleteUnitParams>) -> Result<CallToolResult, McpError> {
        match units::delete_unit(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Ok(success) => to_json(&success),
            Err(blocked) => to_json(&blocked),
        }
    }

    #[tool(description = "Load the standard US and metric kitchen units with cross-system equivalents. Safe to call repeatedly.")]
    fn seed_standard_units(&self) -> Result<CallToolResult, McpError> {
        let result = units::seed_standard_units(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Ingredients ---

    #[tool(description = "Add an ingredient")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let data = IngredientCreate { name: p.name, category: p.category, notes: p.notes };
        let result = ingredients::add_ingredient(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get an ingredient with its density conversions")]
    fn get_ingredient(&self, Parameters(p): Parameters<GetIngredientParams>) -> Result<CallToolResult, McpError> {
        match ingredients::get_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => to_json(&detail),
            None => not_found("Ingredient", p.id),
        }
    }

    #[tool(description = "List or search ingredients with optional category filter and pagination")]
    fn list_ingredients(&self, Parameters(p): Parameters<ListIngredientsParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::list_ingredients(&self.database, p.query.as_deref(), p.category.as_deref(), p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete an ingredient and its density conversions")]
    fn delete_ingredient(&self, Parameters(p): Parameters<DeleteIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::delete_ingredient(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Record an ingredient's density: weight units per one volume unit (e.g., 1 cup flour = 120 g)")]
    fn add_density_conversion(&self, Parameters(p): Parameters<AddDensityConversionParams>) -> Result<CallToolResult, McpError> {
        let data = DensityConversionCreate {
            ingredient_id: p.ingredient_id,
            volume_unit_id: p.volume_unit_id,
            weight_unit_id: p.weight_unit_id,
            conversion_factor: p.conversion_factor,
            notes: p.notes,
        };
        let result = ingredients::add_density_conversion(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a density conversion")]
    fn delete_density_conversion(&self, Parameters(p): Parameters<DeleteDensityConversionParams>) -> Result<CallToolResult, McpError> {
        let result = ingredients::delete_density_conversion(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MiseService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "mise".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Mise Retreat Kitchen".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Mise - units, ingredients, and quantity conversion for retreat meal planning. \
                 IMPORTANT: Call conversion_instructions before the first conversion. \
                 Convert: convert_quantity (volume <-> weight needs ingredient_id). \
                 Units: add/get/list/delete_unit, set_unit_base, set_unit_equivalent, seed_standard_units. \
                 Ingredients: add/get/list/delete_ingredient, add/delete_density_conversion. \
                 Status: mise_status."
                    .into(),
            ),
        }
    }
}
