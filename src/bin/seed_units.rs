//! Utility to load the standard kitchen units into the database

use std::path::PathBuf;

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
            std::fs::create_dir_all(&path).ok();
            path.push("mise.db");
            path
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_database_path();
    println!("Database path: {}", db_path.display());

    let database = mise::db::Database::new(&db_path)?;

    database.with_conn(|conn| {
        mise::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    database.with_conn(|conn| {
        let summary = mise::db::seed::seed_standard_units(conn)?;
        println!("Standard units seeded:");
        println!("  Created: {}", summary.units_created);
        println!("  Already present: {}", summary.units_skipped);
        println!("  Equivalents linked: {}", summary.equivalents_linked);
        Ok(())
    })?;

    Ok(())
}
