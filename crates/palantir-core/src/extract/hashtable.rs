//! Property lookups in the game's separate-chaining hash containers.
//!
//! A container is a header holding a bucket-array pointer and a bucket
//! count; each bucket chains nodes of `(id, next, value)`. The bucket index
//! should be `id % count`, but the client's hash is not provably plain
//! modulo, so a bounded linear scan of the remaining buckets runs before a
//! lookup is declared a miss.

use tracing::debug;

use crate::memory::layout::{ClientLayout, caps};
use crate::memory::{ReadMemory, is_plausible_pointer};

/// Parsed hashtable header.
#[derive(Debug, Clone, Copy)]
pub struct TableHeader {
    pub buckets_ptr: u64,
    pub bucket_count: u32,
    pub element_count: u32,
}

/// Read and validate the header of a hashtable at `base`.
pub fn read_header<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    base: u64,
) -> Option<TableHeader> {
    let len = layout.hashtable_elements_offset() as usize + 4;
    let header = memory.read_bytes(base, len).ok()?;

    let buckets_ptr = header.read_pointer(
        layout.hashtable_buckets_offset() as usize,
        layout.pointer_size as usize,
    );
    let bucket_count = header.read_u32(layout.hashtable_count_offset() as usize);
    let element_count = header.read_u32(layout.hashtable_elements_offset() as usize);

    if buckets_ptr == 0 || bucket_count == 0 || bucket_count > caps::MAX_BUCKETS {
        return None;
    }

    Some(TableHeader {
        buckets_ptr,
        bucket_count,
        element_count,
    })
}

/// Look up `property_id` in the hashtable at `base` and return its 64-bit
/// value slot.
pub fn lookup<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    base: u64,
    property_id: u32,
) -> Option<u64> {
    let header = read_header(memory, layout, base)?;

    let hashed = property_id % header.bucket_count;
    if let Some(value) = walk_chain(memory, layout, header.buckets_ptr, hashed, property_id) {
        return Some(value);
    }

    // Fallback sweep of the other buckets, bounded by the scan cap.
    for index in 0..header.bucket_count.min(caps::BUCKET_SCAN as u32) {
        if index == hashed {
            continue;
        }
        if let Some(value) = walk_chain(memory, layout, header.buckets_ptr, index, property_id) {
            debug!(
                "Property {} found in bucket {} (hashed bucket {}, {} buckets)",
                property_id, index, hashed, header.bucket_count
            );
            return Some(value);
        }
    }

    None
}

fn walk_chain<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    buckets_ptr: u64,
    index: u32,
    property_id: u32,
) -> Option<u64> {
    let pointer_size = layout.pointer_size as usize;
    let node_len = layout.hashnode_value_offset() as usize + 8;

    let slot = buckets_ptr + u64::from(index) * layout.pointer_size;
    let mut node = memory
        .read_bytes(slot, pointer_size)
        .ok()?
        .read_pointer(0, pointer_size);

    for _ in 0..caps::CHAIN_WALK {
        if node == 0 {
            return None;
        }
        if !is_plausible_pointer(node) {
            return None;
        }
        let buf = memory.read_bytes(node, node_len).ok()?;
        if buf.read_u32(0) == property_id {
            return Some(buf.read_u64(layout.hashnode_value_offset() as usize));
        }
        node = buf.read_pointer(layout.hashnode_next_offset() as usize, pointer_size);
    }

    None
}


#[cfg(test)]
mod tests {
    use super::testutil::build_hashtable;
    use super::*;
    use crate::memory::MockMemoryBuilder;

    const BASE: u64 = 0x10_0000;
    const BUCKETS: u64 = 0x11_0000;
    const NODES: u64 = 0x12_0000;

    fn layout() -> ClientLayout {
        ClientLayout::client_64()
    }

    #[test]
    fn test_hashed_bucket_hits() {
        // 1, 5 and 9 all hash to bucket 1 with 4 buckets
        let layout = layout();
        let mock = build_hashtable(
            MockMemoryBuilder::new(),
            &layout,
            BASE,
            BUCKETS,
            NODES,
            4,
            &[(1, &[(1, 0xA), (5, 0xB), (9, 0xC)])],
        )
        .build();

        assert_eq!(lookup(&mock, &layout, BASE, 1), Some(0xA));
        assert_eq!(lookup(&mock, &layout, BASE, 5), Some(0xB));
        assert_eq!(lookup(&mock, &layout, BASE, 9), Some(0xC));
    }

    #[test]
    fn test_miss_after_linear_scan() {
        let layout = layout();
        let mock = build_hashtable(
            MockMemoryBuilder::new(),
            &layout,
            BASE,
            BUCKETS,
            NODES,
            4,
            &[(1, &[(1, 0xA), (5, 0xB), (9, 0xC)])],
        )
        .build();

        assert_eq!(lookup(&mock, &layout, BASE, 2), None);
    }

    #[test]
    fn test_fallback_finds_misplaced_property() {
        // id 9 hashes to bucket 1 but lives in bucket 3; only the linear
        // sweep can find it.
        let layout = layout();
        let mock = build_hashtable(
            MockMemoryBuilder::new(),
            &layout,
            BASE,
            BUCKETS,
            NODES,
            4,
            &[(3, &[(9, 0xC)])],
        )
        .build();

        assert_eq!(lookup(&mock, &layout, BASE, 9), Some(0xC));
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let layout = layout();
        let header_len = layout.hashtable_elements_offset() as usize + 4;
        let node = NODES;
        let mock = MockMemoryBuilder::new()
            .bytes(BASE, &vec![0u8; header_len])
            .pointer(BASE + layout.hashtable_buckets_offset(), BUCKETS)
            .u32(BASE + layout.hashtable_count_offset(), 1)
            .u32(BASE + layout.hashtable_elements_offset(), 1)
            .pointer(BUCKETS, node)
            // node points at itself and never matches
            .bytes(node, &vec![0u8; 32])
            .u32(node, 12345)
            .pointer(node + layout.hashnode_next_offset(), node)
            .u64(node + layout.hashnode_value_offset(), 0xFF)
            .build();

        assert_eq!(lookup(&mock, &layout, BASE, 999), None);
    }

    #[test]
    fn test_rejects_corrupt_headers() {
        let layout = layout();
        let header_len = layout.hashtable_elements_offset() as usize + 4;

        // null bucket pointer
        let mock = MockMemoryBuilder::new()
            .bytes(BASE, &vec![0u8; header_len])
            .u32(BASE + layout.hashtable_count_offset(), 4)
            .build();
        assert_eq!(lookup(&mock, &layout, BASE, 1), None);

        // absurd bucket count
        let mock = MockMemoryBuilder::new()
            .bytes(BASE, &vec![0u8; header_len])
            .pointer(BASE + layout.hashtable_buckets_offset(), BUCKETS)
            .u32(BASE + layout.hashtable_count_offset(), 200_000)
            .build();
        assert_eq!(lookup(&mock, &layout, BASE, 1), None);

        // unreadable header
        let mock = MockMemoryBuilder::new().build();
        assert_eq!(lookup(&mock, &layout, BASE, 1), None);
    }

    #[test]
    fn test_32bit_layout_lookup() {
        let layout = ClientLayout::client_32();
        let mock = build_hashtable(
            MockMemoryBuilder::new().pointer_size(4),
            &layout,
            BASE,
            BUCKETS,
            NODES,
            4,
            &[(2, &[(6, 0x1234)])],
        )
        .build();

        assert_eq!(lookup(&mock, &layout, BASE, 6), Some(0x1234));
    }
}
