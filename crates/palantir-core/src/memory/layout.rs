//! Memory layout constants for client data structures.
//!
//! Every structure the extractor walks exists in two variants: the 64-bit
//! client and the 32-bit client. The offsets are carried as two parallel
//! tables selected once at attach time by the bitness of the matched
//! process; everything downstream asks the selected [`ClientLayout`].

/// Iteration and size caps that bound every traversal of foreign memory.
///
/// The live game can hand us cyclic node chains, torn counts, or stale
/// pointers; these caps turn all of those into bounded, failed lookups.
pub mod caps {
    /// Maximum nodes followed in one hashtable chain walk.
    pub const CHAIN_WALK: usize = 50;
    /// Maximum buckets visited by the linear-scan fallback.
    pub const BUCKET_SCAN: usize = 2048;
    /// Maximum entities visited in one entity-table scan.
    pub const ENTITY_SCAN: usize = 5000;
    /// Maximum elements accepted from a smart-array property.
    pub const ARRAY_ELEMENTS: usize = 10_000;
    /// Maximum string length (bytes or UTF-16 units) read from the target.
    pub const STRING_UNITS: usize = 128;
    /// Largest bucket count accepted from a hashtable header.
    pub const MAX_BUCKETS: u32 = 100_000;
}

/// Minimum property count for an entity to qualify as a player candidate.
pub const PLAYER_PROPERTY_THRESHOLD: u32 = 10;

/// Offsets and sizes for one client bitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientLayout {
    pub is_64bit: bool,
    /// Pointer width in bytes.
    pub pointer_size: u64,
    /// Width of the integer slots in ref-counted wrappers and map nodes.
    pub int_size: u64,

    // Global variables, relative to the client module base.
    pub entity_table_offset: u64,
    pub client_data_offset: u64,
    pub account_data_offset: u64,

    // ClientData structure.
    pub server_name_offset: u64,
    pub account_provider_offset: u64,
    /// Hashtable base inside the account property provider.
    pub account_hashtable_offset: u64,

    // World entity structure.
    pub entity_provider_offset: u64,
    pub construction_info_offset: u64,
    /// Hashtable base inside an entity property provider.
    pub provider_hashtable_offset: u64,

    // Entity-table node: instance id at 0, then these.
    pub entity_node_next_offset: u64,
    pub entity_node_world_offset: u64,
}

impl ClientLayout {
    pub const fn client_64() -> Self {
        Self {
            is_64bit: true,
            pointer_size: 8,
            int_size: 8,
            entity_table_offset: 0x1e03738,
            client_data_offset: 0x1dfedc8,
            account_data_offset: 0x1dfedc8,
            server_name_offset: 312,
            account_provider_offset: 408,
            account_hashtable_offset: 184,
            entity_provider_offset: 192,
            construction_info_offset: 288,
            provider_hashtable_offset: 56,
            entity_node_next_offset: 8,
            entity_node_world_offset: 16,
        }
    }

    pub const fn client_32() -> Self {
        Self {
            is_64bit: false,
            pointer_size: 4,
            int_size: 4,
            entity_table_offset: 0x1b03f08,
            client_data_offset: 0x1d2e214,
            account_data_offset: 0x1d2e214,
            server_name_offset: 180,
            account_provider_offset: 232,
            account_hashtable_offset: 108,
            entity_provider_offset: 108,
            construction_info_offset: 152,
            provider_hashtable_offset: 32,
            entity_node_next_offset: 8,
            entity_node_world_offset: 16,
        }
    }

    pub const fn for_bitness(is_64bit: bool) -> Self {
        if is_64bit {
            Self::client_64()
        } else {
            Self::client_32()
        }
    }

    // Hashtable header, relative to the hashtable base address.

    /// Offset of the bucket-array pointer.
    pub const fn hashtable_buckets_offset(&self) -> u64 {
        2 * self.pointer_size
    }

    /// Offset of the bucket count.
    pub const fn hashtable_count_offset(&self) -> u64 {
        4 * self.pointer_size
    }

    /// Offset of the element count (directly after the bucket count).
    pub const fn hashtable_elements_offset(&self) -> u64 {
        self.hashtable_count_offset() + 4
    }

    // Hashtable node: property id at 0, then these.

    pub const fn hashnode_next_offset(&self) -> u64 {
        self.pointer_size
    }

    pub const fn hashnode_value_offset(&self) -> u64 {
        3 * self.int_size
    }

    // Entity table header, relative to the table address.

    pub const fn entity_table_buckets_offset(&self) -> u64 {
        3 * self.pointer_size
    }

    pub const fn entity_table_count_offset(&self) -> u64 {
        5 * self.pointer_size
    }

    /// Data id inside a construction-info structure.
    pub const fn construction_data_id_offset(&self) -> u64 {
        self.pointer_size + 4
    }

    /// Payload offset inside a ref-counted wrapper (vtable pointer plus
    /// refcount slot).
    pub const fn refcount_header_size(&self) -> u64 {
        self.pointer_size + self.int_size
    }

    /// Pointer to the character data of a plain string value object.
    pub const fn string_value_offset(&self) -> u64 {
        self.refcount_header_size()
    }

    // StringInfo value object. The offsets fall out of the wrapper header,
    // one pointer, two 32-bit ids and an inline hashtable member.

    pub const fn string_info_token_offset(&self) -> u64 {
        self.refcount_header_size() + self.pointer_size
    }

    pub const fn string_info_table_offset(&self) -> u64 {
        self.string_info_token_offset() + 4
    }

    pub const fn string_info_literal_offset(&self) -> u64 {
        let inline_hashtable = 4 * self.pointer_size + 8;
        self.refcount_header_size() + self.pointer_size + 8 + inline_hashtable
    }

    pub const fn string_info_flag_offset(&self) -> u64 {
        self.string_info_literal_offset() + self.pointer_size
    }

    // Smart-array value object: wrapper header, element pointer, then
    // capacity and element count.

    pub const fn array_data_offset(&self) -> u64 {
        self.pointer_size + 4
    }

    pub const fn array_capacity_offset(&self) -> u64 {
        self.array_data_offset() + self.pointer_size
    }

    pub const fn array_count_offset(&self) -> u64 {
        self.array_capacity_offset() + 4
    }

    /// Byte stride of one array element (descriptor pointer + value slot).
    pub const fn array_element_stride(&self) -> u64 {
        2 * self.pointer_size
    }
}
