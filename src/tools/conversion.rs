//! Conversion MCP Tools
//!
//! Runs the conversion engine against a point-in-time view of the catalog.

use crate::conversion::{
    convert, ConversionErrorResponse, ConversionRequest, ConversionResult, SqliteCatalog,
};
use crate::db::Database;

/// Convert a quantity between two units.
///
/// Outer `Err` is a store failure; inner `Err` is a typed conversion error for the caller.
pub fn convert_quantity(
    db: &Database,
    request: ConversionRequest,
) -> Result<Result<ConversionResult, ConversionErrorResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    // Deferred read transaction: every lookup in this conversion sees the same catalog
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| format!("Database error: {}", e))?;
    let catalog = SqliteCatalog::new(&tx);

    match convert(&catalog, &request) {
        Ok(result) => Ok(Ok(result)),
        Err(e) if !e.is_caller_error() => Err(format!("Conversion lookup failed: {}", e)),
        Err(e) => {
            tracing::info!(
                "Conversion of {} from unit {} to unit {} rejected: {}",
                request.quantity,
                request.from_unit_id,
                request.to_unit_id,
                e
            );
            Ok(Err(ConversionErrorResponse::from(&e)))
        }
    }
}
