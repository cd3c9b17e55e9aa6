//! Write the OpenAPI document to disk
//!
//! Usage: `generate_openapi [output-dir]` (defaults to `usta-web/docs`).

use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use usta_web::openapi::get_openapi_json;

fn main() -> anyhow::Result<()> {
    let docs_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("usta-web/docs"));

    fs::create_dir_all(&docs_dir)
        .with_context(|| format!("Failed to create {}", docs_dir.display()))?;

    let json_path = docs_dir.join("openapi.json");
    fs::write(&json_path, get_openapi_json()?)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    println!("Generated: {}", json_path.display());
    Ok(())
}
