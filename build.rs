//! Embeds the Mise build number and compile time.
//!
//! The counter lives in `build_number.txt` at the crate root and moves on
//! every rebuild of `src/`.

use std::fs;
use std::path::Path;

const BUILD_NUMBER_FILE: &str = "build_number.txt";

fn next_build_number(path: &Path) -> u64 {
    let previous = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(0);
    previous + 1
}

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=build.rs");

    let path = Path::new(BUILD_NUMBER_FILE);
    let build = next_build_number(path);

    // A read-only checkout still builds; the number just doesn't persist
    if let Err(e) = fs::write(path, build.to_string()) {
        println!("cargo:warning=Could not persist Mise build number: {}", e);
    }

    let compiled_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

    println!("cargo:rustc-env=MISE_BUILD_NUMBER={}", build);
    println!("cargo:rustc-env=MISE_BUILD_TIMESTAMP={}", compiled_at);
}
