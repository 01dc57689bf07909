//! Building Structure
//!
//! The already-parsed description of a building: AHUs and the terminal units
//! they feed, plus the central plant equipment. Mapping order is preserved
//! from the source document because network numbering follows it.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::fs;
use tracing::{debug, info};

use crate::error::LoadError;

/// Insertion-ordered string-keyed map with hashed lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
    /// Key to position in `entries`
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Accepts either a list of names or a mapping keyed by name (the values are
/// ignored), since schema extractors emit both shapes.
fn names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    struct NamesVisitor;

    impl<'de> Visitor<'de> for NamesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a list of names or a map keyed by name")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut names = Vec::new();
            while let Some(name) = seq.next_element::<String>()? {
                names.push(name);
            }
            Ok(names)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut names = Vec::new();
            while let Some((name, _)) = map.next_entry::<String, serde::de::IgnoredAny>()? {
                names.push(name);
            }
            Ok(names)
        }
    }

    deserializer.deserialize_any(NamesVisitor)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingInfo {
    #[serde(default)]
    pub name: Option<String>,
}

/// An air handler and the terminal units it feeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AhuInfo {
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub points: Vec<String>,
    /// Plant equipment feeding this AHU
    #[serde(default)]
    pub fed_by: Vec<String>,
}

/// A terminal unit and the zones it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VavInfo {
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default = "default_has_reheat")]
    pub has_reheat: bool,
}

fn default_has_reheat() -> bool {
    true
}

impl Default for VavInfo {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            has_reheat: default_has_reheat(),
        }
    }
}

/// Parsed building structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingStructure {
    #[serde(default)]
    pub building: BuildingInfo,
    #[serde(default)]
    pub ahus: OrderedMap<AhuInfo>,
    #[serde(default)]
    pub vavs: OrderedMap<VavInfo>,
    #[serde(default, deserialize_with = "names")]
    pub chillers: Vec<String>,
    #[serde(default, deserialize_with = "names")]
    pub boilers: Vec<String>,
    #[serde(default, deserialize_with = "names")]
    pub cooling_towers: Vec<String>,
}

impl BuildingStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ahu<I, S>(mut self, name: impl Into<String>, feeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ahus.insert(
            name,
            AhuInfo {
                feeds: feeds.into_iter().map(Into::into).collect(),
                points: Vec::new(),
                fed_by: Vec::new(),
            },
        );
        self
    }

    pub fn with_vav(mut self, name: impl Into<String>) -> Self {
        self.vavs.insert(name, VavInfo::default());
        self
    }

    pub fn with_chiller(mut self, name: impl Into<String>) -> Self {
        self.chillers.push(name.into());
        self
    }

    pub fn with_boiler(mut self, name: impl Into<String>) -> Self {
        self.boilers.push(name.into());
        self
    }

    pub fn with_cooling_tower(mut self, name: impl Into<String>) -> Self {
        self.cooling_towers.push(name.into());
        self
    }

    /// True when any central plant equipment is listed.
    pub fn has_central_plant(&self) -> bool {
        !self.chillers.is_empty() || !self.boilers.is_empty() || !self.cooling_towers.is_empty()
    }

    pub fn building_name(&self) -> &str {
        self.building.name.as_deref().unwrap_or("Unknown")
    }

    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a `.json` or `.toml` file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::PathNotFound(path.to_path_buf()));
        }

        let extension = path.extension().and_then(|ext| ext.to_str());
        let structure = match extension {
            Some("json") => Self::from_json_str(&fs::read_to_string(path).await?)?,
            Some("toml") => Self::from_toml_str(&fs::read_to_string(path).await?)?,
            _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        };

        info!(
            "Loaded building structure for {} from {}",
            structure.building_name(),
            path.display()
        );
        debug!(
            "  AHUs: {}, VAVs: {}, chillers: {}, boilers: {}, cooling towers: {}",
            structure.ahus.len(),
            structure.vavs.len(),
            structure.chillers.len(),
            structure.boilers.len(),
            structure.cooling_towers.len()
        );

        Ok(structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BUILDING_JSON: &str = r#"{
        "building": {"name": "Main Office"},
        "ahus": {
            "AHU-C": {"feeds": ["VAV-3"]},
            "AHU-A": {"feeds": ["VAV-1", "VAV-2"], "points": ["sat"]},
            "AHU-B": {}
        },
        "vavs": {
            "VAV-1": {"feeds": ["Zone-1"]},
            "VAV-2": {"has_reheat": false},
            "VAV-3": {}
        },
        "chillers": {"CH-1": {"id": "CH-1"}},
        "boilers": ["B-1"]
    }"#;

    #[test]
    fn test_json_preserves_document_order() {
        let structure = BuildingStructure::from_json_str(BUILDING_JSON).unwrap();
        let ahus: Vec<&str> = structure.ahus.keys().collect();
        assert_eq!(ahus, vec!["AHU-C", "AHU-A", "AHU-B"]);
        assert_eq!(structure.ahus.get("AHU-A").unwrap().feeds, vec!["VAV-1", "VAV-2"]);
        assert!(structure.ahus.get("AHU-B").unwrap().feeds.is_empty());
        assert_eq!(structure.building_name(), "Main Office");
        assert!(structure.vavs.get("VAV-1").unwrap().has_reheat);
        assert!(!structure.vavs.get("VAV-2").unwrap().has_reheat);
    }

    #[test]
    fn test_equipment_names_from_list_or_map() {
        let structure = BuildingStructure::from_json_str(BUILDING_JSON).unwrap();
        assert_eq!(structure.chillers, vec!["CH-1"]);
        assert_eq!(structure.boilers, vec!["B-1"]);
        assert!(structure.cooling_towers.is_empty());
        assert!(structure.has_central_plant());
    }

    #[test]
    fn test_central_plant_needs_non_empty_collection() {
        let structure =
            BuildingStructure::from_json_str(r#"{"chillers": [], "boilers": {}, "ahus": {}}"#)
                .unwrap();
        assert!(!structure.has_central_plant());
        assert_eq!(structure.building_name(), "Unknown");
    }

    #[test]
    fn test_toml_structure() {
        let structure = BuildingStructure::from_toml_str(
            r#"
cooling_towers = ["CT-1"]

[building]
name = "Annex"

[ahus.AHU-1]
feeds = ["VAV-101", "VAV-102"]

[vavs.VAV-101]
[vavs.VAV-102]
"#,
        )
        .unwrap();

        assert_eq!(structure.ahus.len(), 1);
        assert!(structure.vavs.contains_key("VAV-101"));
        assert!(structure.vavs.contains_key("VAV-102"));
        assert_eq!(structure.cooling_towers, vec!["CT-1"]);
    }

    #[test]
    fn test_builder_helpers() {
        let structure = BuildingStructure::new()
            .with_ahu("AHU1", ["VAV1"])
            .with_vav("VAV1")
            .with_chiller("CH1");
        assert_eq!(structure.ahus.get("AHU1").unwrap().feeds, vec!["VAV1"]);
        assert!(structure.has_central_plant());
    }

    #[test]
    fn test_ordered_map_replace_keeps_position() {
        let mut map: OrderedMap<u32> = [("b", 1), ("a", 2)].into_iter().collect();
        assert_eq!(map.insert("b", 3), Some(1));
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("b", &3), ("a", &2)]);
    }

    #[test]
    fn test_ordered_map_large_building() {
        let map: OrderedMap<usize> = (0..5_000).rev().map(|n| (format!("VAV-{n}"), n)).collect();
        assert_eq!(map.len(), 5_000);
        assert_eq!(map.keys().next(), Some("VAV-4999"));
        assert_eq!(map.keys().last(), Some("VAV-0"));
        assert_eq!(map.get("VAV-1234"), Some(&1234));
        assert!(map.contains_key("VAV-0"));
        assert!(!map.contains_key("VAV-5000"));

        let json = serde_json::to_string(&map).unwrap();
        let parsed: OrderedMap<usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
        assert_eq!(parsed.get("VAV-42"), Some(&42));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("building.json");
        fs::write(&path, BUILDING_JSON).await.unwrap();

        let structure = BuildingStructure::load(&path).await.unwrap();
        assert_eq!(structure.ahus.len(), 3);
        assert_eq!(structure.vavs.len(), 3);
    }

    #[tokio::test]
    async fn test_load_missing_and_unsupported() {
        let dir = TempDir::new().unwrap();

        let missing = BuildingStructure::load(dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(LoadError::PathNotFound(_))));

        let ttl = dir.path().join("building.ttl");
        fs::write(&ttl, "@prefix brick: <x> .").await.unwrap();
        let unsupported = BuildingStructure::load(&ttl).await;
        assert!(matches!(unsupported, Err(LoadError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_load_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("building.json");
        fs::write(&path, "{ not json").await.unwrap();
        assert!(matches!(
            BuildingStructure::load(&path).await,
            Err(LoadError::JsonParseError(_))
        ));
    }
}
