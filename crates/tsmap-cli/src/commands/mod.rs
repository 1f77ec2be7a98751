//! Subcommand handlers. `main.rs` parses arguments and dispatches here.

use std::path::Path;

use anyhow::{Context, Result};
use tsmap_lib::TemplateCatalog;

pub mod decode;
pub mod routes;

/// Load a prefab template catalog from a JSON array.
pub fn load_catalog(path: &Path) -> Result<TemplateCatalog> {
    TemplateCatalog::from_json_path(path)
        .with_context(|| format!("failed to load prefab templates from {}", path.display()))
}
