// SPDX-License-Identifier: MIT OR Apache-2.0
//! Catalog selection: configured file or the built-in demo catalog.

use pipeline_editor_graph::catalog::CatalogError;
use pipeline_editor_graph::StaticCatalog;
use std::path::Path;

const DEMO_CATALOG: &str = include_str!("../assets/demo_catalog.ron");

/// Built-in catalog shipped with the editor
pub fn demo_catalog() -> Result<StaticCatalog, CatalogError> {
    StaticCatalog::from_ron(DEMO_CATALOG)
}

/// Load the catalog at `path`, or the demo catalog if there is none.
///
/// A file that fails to parse is reported and replaced by the demo catalog.
pub fn load_catalog(path: Option<&Path>) -> StaticCatalog {
    if let Some(path) = path {
        match std::fs::read_to_string(path) {
            Ok(text) => match StaticCatalog::from_ron(&text) {
                Ok(catalog) => {
                    tracing::info!(
                        "Loaded {} catalog records from {}",
                        catalog.len(),
                        path.display()
                    );
                    return catalog;
                }
                Err(e) => tracing::warn!("{}: {e}", path.display()),
            },
            Err(e) => tracing::warn!("Cannot read catalog {}: {e}", path.display()),
        }
    }

    demo_catalog().unwrap_or_else(|e| {
        tracing::error!("Built-in catalog is broken: {e}");
        StaticCatalog::new()
    })
}
