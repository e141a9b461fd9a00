//! Catalog inspection subcommands.

use std::io::Write;

use anyhow::Result;
use tracing::info;

use layer_catalog::{CatalogStore, RemoveOutcome};
use sar_common::LayerId;

/// Print every catalog entry, one per line, or the raw JSON document.
pub fn list_layers(store: &dyn CatalogStore, json: bool, out: &mut impl Write) -> Result<()> {
    let catalog = store.load()?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&catalog)?)?;
        return Ok(());
    }

    if catalog.is_empty() {
        writeln!(out, "No layers in {}", store.location())?;
        return Ok(());
    }

    for layer in &catalog.layers {
        match layer.as_entry() {
            Some(entry) => writeln!(
                out,
                "{}\t{}\tz{}-{}\t{}",
                entry.id, entry.name, entry.min_zoom, entry.max_zoom, entry.tiles_path
            )?,
            None => writeln!(out, "{}\t{}\t(incomplete)", layer.id(), layer.name().unwrap_or("-"))?,
        }
    }
    Ok(())
}

/// Remove a layer's catalog entry. An unknown id leaves the catalog as is.
///
/// Tiles and metadata on disk are not touched.
pub fn remove_layer(store: &dyn CatalogStore, id: &str, out: &mut impl Write) -> Result<RemoveOutcome> {
    let mut catalog = store.load()?;
    let id = LayerId::new(id);

    let outcome = catalog.remove(&id);
    match &outcome {
        RemoveOutcome::Removed(layer) => {
            store.save(&catalog)?;
            info!(layer_id = %layer.id(), remaining = catalog.len(), "Removed catalog entry");
            writeln!(out, "Removed {}", layer.id())?;
        }
        RemoveOutcome::NotFound => {
            writeln!(out, "No layer with id {}", id)?;
        }
    }
    Ok(outcome)
}
