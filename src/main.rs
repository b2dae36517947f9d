//! Mise
//!
//! An MCP server for retreat kitchen units, ingredients, and quantity conversion.

use std::path::PathBuf;
use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use mise::mcp::MiseService;
use mise::models::{Ingredient, Unit};
use mise::{build_info, db};

/// Get the database path from environment or use default
fn get_database_path() -> PathBuf {
    std::env::var("MISE_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut path = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()))
                .unwrap_or_else(|| PathBuf::from("."));

            // Go up from target/release or target/debug to project root
            if path.ends_with("release") || path.ends_with("debug") {
                if let Some(parent) = path.parent() {
                    if let Some(grandparent) = parent.parent() {
                        path = grandparent.to_path_buf();
                    }
                }
            }

            path.push("data");
            path.push("mise.db");
            path
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr so stdout stays clean for MCP stdio
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mise=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();

    let db_path = get_database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = db::Database::new(&db_path)?;

    let (schema_version, unit_count, ingredient_count) = database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        Ok((
            db::migrations::get_schema_version(conn)?,
            Unit::count(conn)?,
            Ingredient::count(conn, None)?,
        ))
    })?;

    tracing::info!(
        path = %db_path.display(),
        schema_version,
        unit_count,
        ingredient_count,
        "catalog ready"
    );
    if unit_count == 0 {
        tracing::warn!("Unit catalog is empty; run seed_units or call the seed_standard_units tool");
    }

    let service = MiseService::new(db_path, database);

    eprintln!("Serving MCP on stdio");
    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
