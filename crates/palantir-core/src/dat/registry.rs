//! Property-definition registry: bidirectional name/id resolution.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use strum::{Display, FromRepr, IntoStaticStr};

/// Declared type of a property, from the definition record.
///
/// Numeric codes 1–22 come from the game data; anything else maps to
/// `Unknown`. The code drives both the in-memory value decoding and the
/// skip widths used while parsing definition records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum PropertyType {
    #[default]
    Unknown = 0,
    String = 1,
    StringToken = 2,
    WaveForm = 3,
    Timestamp = 4,
    TriState = 5,
    Vector = 6,
    InstanceId = 7,
    EnumMapper = 8,
    Float = 9,
    PropertyId = 10,
    Struct = 11,
    Array = 12,
    StringInfo = 13,
    Bitfield64 = 14,
    Int = 15,
    Color = 16,
    Position = 17,
    Bitfield32 = 18,
    Long64 = 19,
    DataFile = 20,
    Boolean = 21,
    Bitfield = 22,
}

impl PropertyType {
    pub fn from_code(code: u32) -> Self {
        Self::from_repr(code).unwrap_or(Self::Unknown)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// One registered property definition.
///
/// `children` holds the ids of nested properties (structs and arrays);
/// resolve them back through the registry.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDef {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub data_id: u32,
    pub children: Vec<u32>,
}

impl PropertyDef {
    pub(crate) fn named(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            property_type: PropertyType::Unknown,
            data_id: 0,
            children: Vec::new(),
        }
    }
}

/// Immutable id ↔ name registry built from the master definition record.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    by_id: HashMap<u32, Arc<PropertyDef>>,
    by_name: HashMap<String, Arc<PropertyDef>>,
}

impl PropertyRegistry {
    pub(crate) fn from_defs(defs: impl IntoIterator<Item = PropertyDef>) -> Self {
        let mut registry = Self::default();
        for def in defs {
            let def = Arc::new(def);
            registry.by_name.insert(def.name.clone(), Arc::clone(&def));
            registry.by_id.insert(def.id, def);
        }
        registry
    }

    /// Property id for a name, or −1 when the name is unknown.
    pub fn id_of(&self, name: &str) -> i64 {
        self.by_name
            .get(name)
            .map_or(-1, |def| i64::from(def.id))
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(|def| def.name.as_str())
    }

    pub fn def_of(&self, id: u32) -> Option<&Arc<PropertyDef>> {
        self.by_id.get(&id)
    }

    pub fn def_by_name(&self, name: &str) -> Option<&Arc<PropertyDef>> {
        self.by_name.get(name)
    }

    /// Declared type for an id; `Unknown` when the id is unregistered or
    /// its definition record failed to parse.
    pub fn type_of(&self, id: u32) -> PropertyType {
        self.by_id
            .get(&id)
            .map_or(PropertyType::Unknown, |def| def.property_type)
    }

    /// Case-insensitive substring search over property names, capped at
    /// `limit` results and sorted by name.
    pub fn search(&self, keyword: &str, limit: usize) -> Vec<&Arc<PropertyDef>> {
        let needle = keyword.to_ascii_lowercase();
        let mut hits: Vec<_> = self
            .by_name
            .iter()
            .filter(|(name, _)| name.to_ascii_lowercase().contains(&needle))
            .map(|(_, def)| def)
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits.truncate(limit);
        hits
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> PropertyRegistry {
        PropertyRegistry::from_defs([
            PropertyDef {
                id: 100,
                name: "Name".into(),
                property_type: PropertyType::StringInfo,
                data_id: 0,
                children: Vec::new(),
            },
            PropertyDef {
                id: 200,
                name: "Advancement_Level".into(),
                property_type: PropertyType::Int,
                data_id: 0,
                children: Vec::new(),
            },
            PropertyDef::named(300, "Agent_Class".into()),
        ])
    }

    #[test]
    fn test_bidirectional_lookup() {
        let registry = sample_registry();
        assert_eq!(registry.id_of("Name"), 100);
        assert_eq!(registry.name_of(100), Some("Name"));
        assert_eq!(registry.id_of("Advancement_Level"), 200);
        assert_eq!(registry.id_of("NoSuchProperty"), -1);
        assert_eq!(registry.name_of(999), None);
    }

    #[test]
    fn test_maps_stay_in_lockstep() {
        let registry = sample_registry();
        for id in [100u32, 200, 300] {
            let name = registry.name_of(id).unwrap();
            assert_eq!(registry.id_of(name), i64::from(id));
        }
    }

    #[test]
    fn test_unparsed_definition_keeps_name() {
        let registry = sample_registry();
        assert_eq!(registry.type_of(300), PropertyType::Unknown);
        assert_eq!(registry.id_of("Agent_Class"), 300);
    }

    #[test]
    fn test_search_is_case_insensitive_and_capped() {
        let registry = sample_registry();
        let hits = registry.search("a", 2);
        assert_eq!(hits.len(), 2);
        let hits = registry.search("LEVEL", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Advancement_Level");
        assert!(registry.search("xyz", 10).is_empty());
    }

    #[test]
    fn test_type_codes_round_trip() {
        for code in 1..=22u32 {
            let property_type = PropertyType::from_code(code);
            assert_ne!(property_type, PropertyType::Unknown, "code {code}");
            assert_eq!(property_type.code(), code);
        }
        assert_eq!(PropertyType::from_code(0), PropertyType::Unknown);
        assert_eq!(PropertyType::from_code(23), PropertyType::Unknown);
    }
}
