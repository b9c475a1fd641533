//! Resolution of the client's global data addresses.
//!
//! Signature scanning runs against the client module image; any global the
//! scan cannot place falls back to the baked layout offset for the attached
//! bitness.

use tracing::{debug, info, warn};

use crate::memory::layout::ClientLayout;
use crate::memory::{ModuleInfo, ReadMemory};

use super::signature::builtin_signatures;

/// Image bytes scanned per signature pass.
const MAX_IMAGE_SCAN: usize = 60 * 1024 * 1024;
/// Chunk size for image reads; unmapped chunks scan as zeroes.
const IMAGE_CHUNK: usize = 1024 * 1024;

/// Absolute addresses of the client's global data pointers.
#[derive(Debug, Clone, Copy)]
pub struct GlobalOffsets {
    pub entity_table: u64,
    pub client_data: u64,
    pub account_data: u64,
}

impl GlobalOffsets {
    /// Baked offsets for a module loaded at `base`.
    pub fn from_layout(layout: &ClientLayout, base: u64) -> Self {
        Self {
            entity_table: base + layout.entity_table_offset,
            client_data: base + layout.client_data_offset,
            account_data: base + layout.account_data_offset,
        }
    }
}

pub struct OffsetSearcher<'a, R: ReadMemory> {
    reader: &'a R,
}

impl<'a, R: ReadMemory> OffsetSearcher<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Resolve the global addresses for the attached client, preferring
    /// signature hits over the baked layout table.
    pub fn search(&self, module: &ModuleInfo, layout: &ClientLayout) -> GlobalOffsets {
        let mut offsets = GlobalOffsets::from_layout(layout, module.base_address);

        let Some(signatures) = builtin_signatures(layout.is_64bit) else {
            info!("No signatures for this client bitness, using baked offsets");
            return offsets;
        };

        let image = self.read_image(module);
        if image.is_empty() {
            warn!("Could not read module image, using baked offsets");
            return offsets;
        }

        match signatures.entity_table.resolve(&image, module.base_address) {
            Some(address) => {
                info!("Entity table found by signature: {:#x}", address);
                offsets.entity_table = address;
            }
            None => warn!(
                "Entity table signature not found, using baked offset {:#x}",
                offsets.entity_table
            ),
        }

        match signatures.client_data.resolve(&image, module.base_address) {
            Some(address) => {
                info!("Client data found by signature: {:#x}", address);
                offsets.client_data = address;
                offsets.account_data = address;
            }
            None => warn!(
                "Client data signature not found, using baked offset {:#x}",
                offsets.client_data
            ),
        }

        offsets
    }

    fn read_image(&self, module: &ModuleInfo) -> Vec<u8> {
        let size = (module.size as usize).min(MAX_IMAGE_SCAN);
        let mut image = vec![0u8; size];

        let mut offset = 0usize;
        let mut readable = 0usize;
        while offset < size {
            let len = IMAGE_CHUNK.min(size - offset);
            match self.reader.read_bytes(module.base_address + offset as u64, len) {
                Ok(chunk) => {
                    image[offset..offset + len].copy_from_slice(chunk.data());
                    readable += len;
                }
                Err(_) => {
                    // Section gap; the zeroes cannot match any signature.
                }
            }
            offset += len;
        }
        debug!(
            "Read {} of {} module bytes for signature scan",
            readable, size
        );

        if readable == 0 { Vec::new() } else { image }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    const BASE: u64 = 0x14000_0000;

    #[test]
    fn test_baked_offsets_from_layout() {
        let layout = ClientLayout::client_64();
        let offsets = GlobalOffsets::from_layout(&layout, BASE);
        assert_eq!(offsets.entity_table, BASE + 0x1e03738);
        assert_eq!(offsets.client_data, BASE + 0x1dfedc8);
        assert_eq!(offsets.client_data, offsets.account_data);
    }

    #[test]
    fn test_signature_hit_overrides_baked_offset() {
        let layout = ClientLayout::client_64();

        // Client-data store instruction at image offset 0x10
        let mut image = vec![0x90u8; 0x100];
        image[0x10..0x13].copy_from_slice(&[0x48, 0x89, 0x3D]);
        image[0x13..0x17].copy_from_slice(&0x2000i32.to_le_bytes());
        image[0x17..0x1E].copy_from_slice(&[0xB2, 0x01, 0xB9, 0x00, 0x01, 0x00, 0x00]);

        let mock = MockMemoryBuilder::new().bytes(BASE, &image).build();
        let module = ModuleInfo {
            base_address: BASE,
            size: image.len() as u64,
        };

        let offsets = OffsetSearcher::new(&mock).search(&module, &layout);
        assert_eq!(offsets.client_data, BASE + 0x17 + 0x2000);
        assert_eq!(offsets.account_data, offsets.client_data);
        // Entity-table signature absent, baked offset retained
        assert_eq!(offsets.entity_table, BASE + layout.entity_table_offset);
    }

    #[test]
    fn test_unreadable_module_falls_back() {
        let layout = ClientLayout::client_64();
        let mock = MockMemoryBuilder::new().build();
        let module = ModuleInfo {
            base_address: BASE,
            size: 0x1000,
        };

        let offsets = OffsetSearcher::new(&mock).search(&module, &layout);
        assert_eq!(offsets.entity_table, BASE + layout.entity_table_offset);
    }
}
