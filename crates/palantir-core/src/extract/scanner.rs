//! Entity-table traversal and player discovery.
//!
//! The entity table is a top-level hashtable of every tracked world entity.
//! One bounded sweep serves two purposes: it collects the
//! `instance id → data id` side map used later for equipment resolution,
//! and it picks the player — the entity carrying by far the most properties.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::memory::layout::{ClientLayout, PLAYER_PROPERTY_THRESHOLD, caps};
use crate::memory::{ReadMemory, is_plausible_pointer};

use super::hashtable;

/// The chosen player candidate.
#[derive(Debug, Clone, Copy)]
pub struct PlayerEntity {
    pub address: u64,
    pub instance_id: u64,
    pub property_count: u32,
}

/// Result of one entity-table sweep.
#[derive(Debug, Default)]
pub struct EntityScan {
    pub player: Option<PlayerEntity>,
    /// Instance id → construction data id, for every entity that exposed one.
    pub data_ids: HashMap<u64, u32>,
    pub scanned: usize,
    pub candidates: usize,
}

/// Sweep the entity table reachable through the global pointer at
/// `table_global`.
pub fn scan_entity_table<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    table_global: u64,
) -> EntityScan {
    let mut scan = EntityScan::default();
    let pointer_size = layout.pointer_size as usize;

    let table_ptr = match memory.read_pointer(table_global) {
        Ok(ptr) if is_plausible_pointer(ptr) => ptr,
        _ => {
            warn!("Entity table pointer unreadable at {:#x}", table_global);
            return scan;
        }
    };

    let header_len = layout.entity_table_count_offset() as usize + 8;
    let Ok(header) = memory.read_bytes(table_ptr, header_len) else {
        warn!("Could not read entity table header at {:#x}", table_ptr);
        return scan;
    };
    let buckets_ptr = header.read_pointer(
        layout.entity_table_buckets_offset() as usize,
        pointer_size,
    );
    let bucket_count = header.read_u32(layout.entity_table_count_offset() as usize);
    let element_count = header.read_u32(layout.entity_table_count_offset() as usize + 4);
    debug!(
        "Entity table: {} buckets, {} elements, array at {:#x}",
        bucket_count, element_count, buckets_ptr
    );

    if buckets_ptr == 0 || bucket_count == 0 || bucket_count > caps::MAX_BUCKETS {
        warn!("Entity table header failed validation");
        return scan;
    }
    let Ok(buckets) = memory.read_bytes(buckets_ptr, bucket_count as usize * pointer_size) else {
        warn!("Could not read entity table bucket array");
        return scan;
    };

    let node_len = layout.entity_node_world_offset as usize + pointer_size;
    let mut best: Option<PlayerEntity> = None;

    'sweep: for index in 0..bucket_count as usize {
        let mut node = buckets.read_pointer(index * pointer_size, pointer_size);
        while node != 0 && is_plausible_pointer(node) {
            if scan.scanned >= caps::ENTITY_SCAN {
                debug!("Entity scan cap reached");
                break 'sweep;
            }
            scan.scanned += 1;

            let Ok(buf) = memory.read_bytes(node, node_len) else {
                break;
            };
            let instance_id = buf.read_u64(0);
            let next = buf.read_pointer(layout.entity_node_next_offset as usize, pointer_size);
            let world = buf.read_pointer(layout.entity_node_world_offset as usize, pointer_size);

            if is_plausible_pointer(world) {
                inspect_entity(memory, layout, world, instance_id, &mut scan, &mut best);
            }
            node = next;
        }
    }

    info!(
        "Scanned {} entities: {} player candidate(s), {} data ids collected",
        scan.scanned,
        scan.candidates,
        scan.data_ids.len()
    );
    if let Some(player) = &best {
        info!(
            "Player entity: instance {:#x} with {} properties at {:#x}",
            player.instance_id, player.property_count, player.address
        );
    }

    scan.player = best;
    scan
}

fn inspect_entity<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    world: u64,
    instance_id: u64,
    scan: &mut EntityScan,
    best: &mut Option<PlayerEntity>,
) {
    let pointer_size = layout.pointer_size as usize;
    let len = layout
        .construction_info_offset
        .max(layout.entity_provider_offset) as usize
        + pointer_size;
    let Ok(entity) = memory.read_bytes(world, len) else {
        return;
    };

    // Construction info gives the template data id; items equipped by the
    // player resolve through this map later.
    let info_ptr = entity.read_pointer(layout.construction_info_offset as usize, pointer_size);
    if is_plausible_pointer(info_ptr) {
        if let Ok(info) = memory.read_bytes(info_ptr, pointer_size + 8) {
            let data_id = info.read_u32(layout.construction_data_id_offset() as usize);
            if data_id != 0 {
                scan.data_ids.insert(instance_id, data_id);
            }
        }
    }

    let provider = entity.read_pointer(layout.entity_provider_offset as usize, pointer_size);
    if !is_plausible_pointer(provider) {
        return;
    }
    let Some(header) = hashtable::read_header(
        memory,
        layout,
        provider + layout.provider_hashtable_offset,
    ) else {
        return;
    };

    if header.element_count >= PLAYER_PROPERTY_THRESHOLD {
        scan.candidates += 1;
        let better = best
            .as_ref()
            .is_none_or(|current| header.element_count > current.property_count);
        if better {
            *best = Some(PlayerEntity {
                address: world,
                instance_id,
                property_count: header.element_count,
            });
        }
    }
}
