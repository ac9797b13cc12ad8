//! services/api/src/bin/openapi.rs
//!
//! Writes the campus API's OpenAPI document to disk so the web client can
//! generate its typed bindings without a running server.
//!
//! Usage: `openapi [OUTPUT]` (defaults to `openapi.json`).

use campus_api::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output: PathBuf = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    // Same document the server mounts under /api-docs/openapi.json.
    let doc = ApiDoc::openapi();
    let endpoints = doc.paths.paths.len();
    std::fs::write(&output, doc.to_pretty_json()?)?;

    println!("Wrote {} endpoints to {}", endpoints, output.display());
    Ok(())
}
