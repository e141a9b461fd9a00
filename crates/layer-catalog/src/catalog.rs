//! Catalog document model and its mutation rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use sar_common::{LayerBounds, LayerId};

use crate::error::{CatalogError, CatalogResult};

/// The shared index of all known layers.
///
/// Entries keep their insertion order. Top-level keys other than `layers` are
/// carried through load/save untouched, as are layers this crate did not write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub layers: Vec<CatalogLayer>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One processed layer as seen by web map clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: LayerId,

    /// Display name
    pub name: String,

    /// Acquisition date (`YYYY-MM-DD`), null when the archive name carried none
    pub date: Option<String>,

    pub satellite: String,

    /// Product type (e.g. "GRDH")
    #[serde(rename = "type")]
    pub product_type: String,

    /// Tile URL template containing `{z}`, `{x}` and `{y}`
    pub tiles_path: String,

    /// `[[south, west], [north, east]]`
    pub bounds: [[f64; 2]; 2],

    pub min_zoom: u8,
    pub max_zoom: u8,

    /// Initial layer opacity in `[0, 1]`
    pub default_opacity: f64,

    /// Colormap tag understood by the viewer
    pub colormap: String,

    /// Fields written by other tools, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An element of the `layers` array.
///
/// Layers written by hand or by older tools may lack fields a
/// [`CatalogEntry`] requires. Those only need an `id` and are kept verbatim
/// until an upsert for the same id replaces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogLayer {
    Complete(CatalogEntry),
    Partial(PartialEntry),
}

/// A layer that does not carry every [`CatalogEntry`] field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialEntry {
    pub id: LayerId,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CatalogLayer {
    pub fn id(&self) -> &LayerId {
        match self {
            CatalogLayer::Complete(entry) => &entry.id,
            CatalogLayer::Partial(partial) => &partial.id,
        }
    }

    /// Display name, if the layer has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            CatalogLayer::Complete(entry) => Some(&entry.name),
            CatalogLayer::Partial(partial) => partial.fields.get("name").and_then(Value::as_str),
        }
    }

    pub fn as_entry(&self) -> Option<&CatalogEntry> {
        match self {
            CatalogLayer::Complete(entry) => Some(entry),
            CatalogLayer::Partial(_) => None,
        }
    }
}

impl From<CatalogEntry> for CatalogLayer {
    fn from(entry: CatalogEntry) -> Self {
        CatalogLayer::Complete(entry)
    }
}

impl CatalogEntry {
    /// The entry's bounds as named edges.
    pub fn layer_bounds(&self) -> LayerBounds {
        LayerBounds::from_corners(self.bounds)
    }

    /// Check the entry's structural invariants.
    pub fn validate(&self) -> CatalogResult<()> {
        let invalid = |message: String| CatalogError::InvalidEntry {
            id: self.id.to_string(),
            message,
        };

        if self.id.as_str().is_empty() {
            return Err(invalid("id cannot be empty".to_string()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(invalid(format!(
                "minZoom {} is greater than maxZoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(0.0..=1.0).contains(&self.default_opacity) {
            return Err(invalid(format!(
                "defaultOpacity {} is outside [0, 1]",
                self.default_opacity
            )));
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tiles_path.contains(placeholder) {
                return Err(invalid(format!(
                    "tilesPath '{}' is missing the {} placeholder",
                    self.tiles_path, placeholder
                )));
            }
        }
        Ok(())
    }
}

/// What an upsert did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Appended as a new entry at this position.
    Inserted(usize),
    /// Replaced an existing entry in place at this position.
    Replaced(usize),
}

impl UpsertOutcome {
    pub fn is_replacement(&self) -> bool {
        matches!(self, UpsertOutcome::Replaced(_))
    }
}

/// What a removal did to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    Removed(CatalogLayer),
    NotFound,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: &LayerId) -> Option<&CatalogLayer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    fn position_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }

    /// Insert or replace an entry by id.
    ///
    /// A matching entry is replaced wholesale at its current position; the
    /// order of every other entry is untouched. Otherwise the entry is
    /// appended.
    pub fn upsert(&mut self, entry: CatalogEntry) -> UpsertOutcome {
        match self.position_of(&entry.id) {
            Some(pos) => {
                debug!(id = %entry.id, position = pos, "Replacing catalog entry");
                self.layers[pos] = entry.into();
                UpsertOutcome::Replaced(pos)
            }
            None => {
                debug!(id = %entry.id, "Appending catalog entry");
                self.layers.push(entry.into());
                UpsertOutcome::Inserted(self.layers.len() - 1)
            }
        }
    }

    /// Consuming form of [`Catalog::upsert`].
    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.upsert(entry);
        self
    }

    /// Remove the entry with the given id, if present.
    pub fn remove(&mut self, id: &LayerId) -> RemoveOutcome {
        match self.position_of(id) {
            Some(pos) => RemoveOutcome::Removed(self.layers.remove(pos)),
            None => RemoveOutcome::NotFound,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry(id: &str, tiles: &str) -> CatalogEntry {
        CatalogEntry {
            id: LayerId::new(id),
            name: format!("Layer {}", id),
            date: Some("2023-03-29".to_string()),
            satellite: "S1A".to_string(),
            product_type: "GRDH".to_string(),
            tiles_path: format!("{}/{{z}}/{{x}}/{{y}}.png", tiles),
            bounds: [[-12.3, -77.2], [-11.7, -76.7]],
            min_zoom: 10,
            max_zoom: 15,
            default_opacity: 0.6,
            colormap: "sar-intensity".to_string(),
            extra: Map::new(),
        }
    }

    fn ids(catalog: &Catalog) -> Vec<&str> {
        catalog.layers.iter().map(|l| l.id().as_str()).collect()
    }

    #[test]
    fn test_upsert_appends_new_id() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.upsert(entry("a", "t/a")), UpsertOutcome::Inserted(0));
        assert_eq!(catalog.upsert(entry("b", "t/b")), UpsertOutcome::Inserted(1));
        assert_eq!(ids(&catalog), vec!["a", "b"]);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut catalog = Catalog::new()
            .with_entry(entry("a", "t/a"))
            .with_entry(entry("b", "t/b"))
            .with_entry(entry("c", "t/c"));

        let outcome = catalog.upsert(entry("b", "t/b-new"));

        assert_eq!(outcome, UpsertOutcome::Replaced(1));
        assert!(outcome.is_replacement());
        assert_eq!(ids(&catalog), vec!["a", "b", "c"]);
        assert_eq!(
            catalog.layers[1].as_entry().unwrap().tiles_path,
            "t/b-new/{z}/{x}/{y}.png"
        );
        assert_eq!(catalog.layers[0], entry("a", "t/a").into());
        assert_eq!(catalog.layers[2], entry("c", "t/c").into());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let base = Catalog::new().with_entry(entry("a", "t/a"));
        let once = base.clone().with_entry(entry("x", "t/x"));
        let twice = once.clone().with_entry(entry("x", "t/x"));
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 2);
    }

    #[test]
    fn test_upsert_replaces_whole_entry() {
        let mut original = entry("a", "t/a");
        original
            .extra
            .insert("legend".to_string(), Value::String("old".to_string()));
        let mut catalog = Catalog::new().with_entry(original);

        catalog.upsert(entry("a", "t/a"));

        assert!(catalog.layers[0].as_entry().unwrap().extra.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut catalog = Catalog::new()
            .with_entry(entry("a", "t/a"))
            .with_entry(entry("b", "t/b"));

        assert!(matches!(
            catalog.remove(&LayerId::new("a")),
            RemoveOutcome::Removed(l) if l.id().as_str() == "a"
        ));
        assert_eq!(catalog.remove(&LayerId::new("zzz")), RemoveOutcome::NotFound);
        assert_eq!(ids(&catalog), vec!["b"]);
    }

    #[test]
    fn test_entry_json_shape() {
        let value = serde_json::to_value(entry("sentinel1-2023-03-29", "base/x/tiles")).unwrap();
        assert_eq!(value["id"], "sentinel1-2023-03-29");
        assert_eq!(value["type"], "GRDH");
        assert_eq!(value["tilesPath"], "base/x/tiles/{z}/{x}/{y}.png");
        assert_eq!(value["minZoom"], 10);
        assert_eq!(value["maxZoom"], 15);
        assert_eq!(value["defaultOpacity"], 0.6);
        assert_eq!(value["bounds"][0][0], -12.3);
        assert_eq!(value["bounds"][1][1], -76.7);
    }

    #[test]
    fn test_null_date_round_trips() {
        let mut e = entry("a", "t/a");
        e.date = None;
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"date\":null"));
        let back: CatalogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, None);
    }

    #[test]
    fn test_incomplete_layer_is_kept_verbatim() {
        let json = r#"{"layers":[{"id":"sentinel1-2022-01-01","name":"old","tilesPath":"x/{z}/{x}/{y}.png"}]}"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();

        let layer = &catalog.layers[0];
        assert!(matches!(layer, CatalogLayer::Partial(_)));
        assert_eq!(layer.id().as_str(), "sentinel1-2022-01-01");
        assert_eq!(layer.name(), Some("old"));
        assert!(layer.as_entry().is_none());

        let original: Value = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_value(&catalog).unwrap(), original);
    }

    #[test]
    fn test_upsert_replaces_incomplete_layer() {
        let json = r#"{"layers":[{"id":"a","name":"old"},{"id":"b","legacy":true}]}"#;
        let mut catalog: Catalog = serde_json::from_str(json).unwrap();

        assert_eq!(catalog.upsert(entry("a", "t/a")), UpsertOutcome::Replaced(0));

        assert_eq!(ids(&catalog), vec!["a", "b"]);
        assert_eq!(catalog.layers[0], entry("a", "t/a").into());
        assert!(matches!(&catalog.layers[1], CatalogLayer::Partial(p) if p.fields["legacy"] == true));
    }

    #[test]
    fn test_layer_without_id_is_rejected() {
        let json = r#"{"layers":[{"name":"no id"}]}"#;
        assert!(serde_json::from_str::<Catalog>(json).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(entry("a", "t/a").validate().is_ok());

        let mut bad_zoom = entry("a", "t/a");
        bad_zoom.min_zoom = 16;
        assert!(bad_zoom.validate().is_err());

        let mut bad_opacity = entry("a", "t/a");
        bad_opacity.default_opacity = 1.5;
        assert!(bad_opacity.validate().is_err());

        let mut bad_template = entry("a", "t/a");
        bad_template.tiles_path = "t/a/tiles".to_string();
        assert!(bad_template.validate().is_err());
    }
}
