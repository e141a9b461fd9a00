//! Load / upsert / save cycles against a catalog file on disk.

use std::fs;

use layer_catalog::{
    Catalog, CatalogEntry, CatalogError, CatalogLayer, CatalogStore, JsonCatalogStore, UpsertOutcome,
};
use sar_common::{LayerBounds, LayerId};

fn sentinel_entry(date: &str, tiles_base: &str) -> CatalogEntry {
    CatalogEntry {
        id: LayerId::sentinel1(date),
        name: format!("Sentinel-1A - {}", date),
        date: Some(date.to_string()),
        satellite: "S1A".to_string(),
        product_type: "GRDH".to_string(),
        tiles_path: format!("{}/{}_sentinel1/tiles/{{z}}/{{x}}/{{y}}.png", tiles_base, date),
        bounds: LayerBounds::new(-77.2, -12.3, -76.7, -11.7).to_corners(),
        min_zoom: 10,
        max_zoom: 15,
        default_opacity: 0.6,
        colormap: "sar-intensity".to_string(),
        extra: Default::default(),
    }
}

#[test]
fn test_reprocessing_same_date_replaces_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonCatalogStore::new(dir.path().join("layers-index.json"));

    let mut catalog = store.load().unwrap();
    assert_eq!(
        catalog.upsert(sentinel_entry("2023-03-29", "old")),
        UpsertOutcome::Inserted(0)
    );
    catalog.upsert(sentinel_entry("2023-04-10", "old"));
    store.save(&catalog).unwrap();

    let mut catalog = store.load().unwrap();
    assert_eq!(
        catalog.upsert(sentinel_entry("2023-03-29", "new")),
        UpsertOutcome::Replaced(0)
    );
    store.save(&catalog).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.len(), 2);
    let entry = reloaded.get(&LayerId::sentinel1("2023-03-29")).unwrap();
    assert!(entry.as_entry().unwrap().tiles_path.starts_with("new/"));
    assert_eq!(reloaded.layers[1].id().as_str(), "sentinel1-2023-04-10");
}

#[test]
fn test_reads_hand_written_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layers-index.json");
    fs::write(
        &path,
        r#"{
  "layers": [
    {
      "id": "sentinel1-2023-03-29",
      "name": "Sentinel-1A - 2023-03-29",
      "date": "2023-03-29",
      "satellite": "S1A",
      "type": "GRDH",
      "tilesPath": "src/data/nasa-layers/2023-03-29_sentinel1/tiles/{z}/{x}/{y}.png",
      "bounds": [[-12.3, -77.2], [-11.7, -76.7]],
      "minZoom": 10,
      "maxZoom": 15,
      "defaultOpacity": 0.6,
      "colormap": "sar-intensity",
      "attribution": "ESA Copernicus"
    }
  ]
}"#,
    )
    .unwrap();

    let catalog = JsonCatalogStore::new(&path).load().unwrap();
    let entry = catalog.layers[0].as_entry().unwrap();
    assert_eq!(entry.layer_bounds(), LayerBounds::new(-77.2, -12.3, -76.7, -11.7));
    assert_eq!(entry.extra["attribution"], "ESA Copernicus");
    assert!(entry.validate().is_ok());
}

#[test]
fn test_incomplete_layer_survives_upsert_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layers-index.json");
    fs::write(
        &path,
        r#"{"layers":[{"id":"sentinel1-2022-01-01","name":"old","tilesPath":"x/{z}/{x}/{y}.png"}]}"#,
    )
    .unwrap();

    let store = JsonCatalogStore::new(&path);
    let mut catalog = store.load().unwrap();
    assert_eq!(
        catalog.upsert(sentinel_entry("2023-03-29", "base")),
        UpsertOutcome::Inserted(1)
    );
    store.save(&catalog).unwrap();

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        saved["layers"][0],
        serde_json::json!({"id": "sentinel1-2022-01-01", "name": "old", "tilesPath": "x/{z}/{x}/{y}.png"})
    );
    assert_eq!(saved["layers"][1]["id"], "sentinel1-2023-03-29");
    assert!(matches!(store.load().unwrap().layers[0], CatalogLayer::Partial(_)));
}

#[test]
fn test_corrupt_catalog_is_not_overwritten_by_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layers-index.json");
    fs::write(&path, "garbage").unwrap();

    let store = JsonCatalogStore::new(&path);
    assert!(matches!(store.load(), Err(CatalogError::Corrupt { .. })));
    assert_eq!(fs::read_to_string(&path).unwrap(), "garbage");
}

#[test]
fn test_absent_catalog_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonCatalogStore::new(dir.path().join("missing").join("layers-index.json"));
    assert_eq!(store.load().unwrap(), Catalog::new());
    assert!(!dir.path().join("missing").exists());
}
