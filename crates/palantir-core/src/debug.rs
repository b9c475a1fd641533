//! Debug utilities for memory analysis (requires the `debug-tools`
//! feature).
//!
//! These helpers walk structures the extractor normally only queries,
//! dumping everything they find. Useful when a client update moves
//! properties around and the catalogued names stop resolving.

use tracing::debug;

use crate::dat::{PropertyRegistry, PropertyType};
use crate::extract::hashtable;
use crate::memory::layout::{ClientLayout, caps};
use crate::memory::{ReadMemory, is_plausible_pointer};

/// One property found on an entity.
#[derive(Debug, Clone)]
pub struct PropertyDumpEntry {
    pub id: u32,
    pub name: String,
    pub property_type: PropertyType,
    pub value: u64,
}

/// Dump every property stored on an entity's property provider, resolving
/// names through the registry where possible.
pub fn dump_entity_properties<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    registry: Option<&PropertyRegistry>,
    entity: u64,
) -> Vec<PropertyDumpEntry> {
    let mut entries = Vec::new();
    let pointer_size = layout.pointer_size as usize;

    let Ok(buf) = memory.read_bytes(
        entity,
        layout.entity_provider_offset as usize + pointer_size,
    ) else {
        return entries;
    };
    let provider = buf.read_pointer(layout.entity_provider_offset as usize, pointer_size);
    if !is_plausible_pointer(provider) {
        return entries;
    }

    let table = provider + layout.provider_hashtable_offset;
    let Some(header) = hashtable::read_header(memory, layout, table) else {
        return entries;
    };
    debug!(
        "Dumping entity {:#x}: {} buckets, {} properties",
        entity, header.bucket_count, header.element_count
    );

    let node_len = layout.hashnode_value_offset() as usize + 8;
    'buckets: for index in 0..header.bucket_count {
        let slot = header.buckets_ptr + u64::from(index) * layout.pointer_size;
        let Ok(head) = memory.read_bytes(slot, pointer_size) else {
            continue;
        };
        let mut node = head.read_pointer(0, pointer_size);

        for _ in 0..caps::CHAIN_WALK {
            if node == 0 || !is_plausible_pointer(node) {
                break;
            }
            let Ok(buf) = memory.read_bytes(node, node_len) else {
                break;
            };
            let id = buf.read_u32(0);
            let value = buf.read_u64(layout.hashnode_value_offset() as usize);

            let (name, property_type) = match registry.and_then(|r| r.def_of(id)) {
                Some(def) => (def.name.clone(), def.property_type),
                None => (String::from("?"), PropertyType::Unknown),
            };
            entries.push(PropertyDumpEntry {
                id,
                name,
                property_type,
                value,
            });
            if entries.len() >= caps::ENTITY_SCAN {
                break 'buckets;
            }

            node = buf.read_pointer(layout.hashnode_next_offset() as usize, pointer_size);
        }
    }

    entries.sort_by_key(|entry| entry.id);
    entries
}
