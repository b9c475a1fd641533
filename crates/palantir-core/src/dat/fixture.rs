//! On-disk archive fixtures for tests.
//!
//! Builds small but format-faithful archives: real superblock, real B-tree
//! nodes stored as block chains, records in the new, fragmented, legacy and
//! compressed encodings.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::NamedTempFile;

use super::entry::{COMPRESSED_FLAG, DIRECTORY_BLOCK_SIZE, DIRECTORY_RAW_SIZE};

pub(crate) const TEST_BLOCK_SIZE: u32 = 8192;
pub(crate) const TEST_MAGIC: u32 = 21570;

/// `(id, offset, size, block_size, flags)` — the tuple `encode_node` takes
/// for one file entry.
pub(crate) type RawEntry = (u64, u64, u32, u32, u16);

/// Encode a raw 2452-byte directory node.
pub(crate) fn encode_node(children: &[(u32, u64)], files: &[RawEntry]) -> Vec<u8> {
    let mut raw = vec![0u8; DIRECTORY_RAW_SIZE];

    for (i, &(block_size, offset)) in children.iter().enumerate() {
        raw[i * 8..i * 8 + 4].copy_from_slice(&block_size.to_le_bytes());
        raw[4 + i * 8..8 + i * 8].copy_from_slice(&(offset as u32).to_le_bytes());
    }

    raw[496..500].copy_from_slice(&(files.len() as u32).to_le_bytes());

    for (i, &(id, offset, size, block_size, flags)) in files.iter().enumerate() {
        let base = 500 + i * 32;
        raw[base..base + 2].copy_from_slice(&flags.to_le_bytes());
        raw[base + 4..base + 8].copy_from_slice(&(id as u32).to_le_bytes());
        raw[base + 8..base + 12].copy_from_slice(&(offset as u32).to_le_bytes());
        raw[base + 12..base + 16].copy_from_slice(&size.to_le_bytes());
        raw[base + 24..base + 28].copy_from_slice(&block_size.to_le_bytes());
    }

    raw
}

pub(crate) struct ArchiveBuilder {
    data: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        // Leave room for the superblock, which lives at byte 320.
        Self {
            data: vec![0u8; 1024],
        }
    }

    fn append(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Append a new-format single-chunk body (zero extra blocks).
    fn append_chunked(&mut self, payload: &[u8]) -> u64 {
        let mut body = Vec::with_capacity(payload.len() + 8);
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(payload);
        self.append(&body)
    }

    /// Store a record in one chunk and return its file-entry tuple.
    pub fn record(&mut self, id: u64, payload: &[u8]) -> RawEntry {
        assert!(payload.len() + 8 <= TEST_BLOCK_SIZE as usize);
        let offset = self.append_chunked(payload);
        (id, offset, payload.len() as u32, TEST_BLOCK_SIZE, 0)
    }

    /// Store a record as a first chunk plus `num_extra` trailing fragments.
    pub fn fragmented_record(&mut self, id: u64, payload: &[u8], num_extra: usize) -> RawEntry {
        let block = TEST_BLOCK_SIZE as usize;
        let first_len = (block - 8 - 8 * num_extra).min(payload.len());
        let fragments: Vec<&[u8]> = payload[first_len..].chunks(block).collect();
        assert_eq!(fragments.len(), num_extra, "fragment count mismatch");

        let fragment_info: Vec<(u32, u64)> = fragments
            .iter()
            .map(|fragment| (TEST_BLOCK_SIZE, self.append(fragment)))
            .collect();

        let mut body = Vec::new();
        body.extend_from_slice(&(num_extra as u32).to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&payload[..first_len]);
        for (block_size, offset) in fragment_info {
            body.extend_from_slice(&block_size.to_le_bytes());
            body.extend_from_slice(&(offset as u32).to_le_bytes());
        }
        let offset = self.append(&body);
        (id, offset, payload.len() as u32, TEST_BLOCK_SIZE, 0)
    }

    /// Store a record as a legacy tail-first block chain with uniform block
    /// size `block_size`.
    pub fn legacy_record(&mut self, id: u64, payload: &[u8], block_size: u32) -> RawEntry {
        let data_per_block = block_size as usize - 8;
        let full_blocks = payload.len() / data_per_block;
        let remainder = payload.len() % data_per_block;

        // Chain offsets are known up front because blocks are appended in
        // chain order.
        let start = self.data.len() as u64;
        let mut offsets = Vec::new();
        let mut cursor = start;
        for _ in 0..full_blocks {
            offsets.push(cursor);
            cursor += 8 + data_per_block as u64;
        }
        offsets.push(cursor); // terminator block

        // Each header announces the size and offset of the block that
        // follows it in the chain; the terminator announces size zero.
        for i in 0..full_blocks {
            let next_offset = offsets[i + 1];
            let tail_start = payload.len() - (i + 1) * data_per_block;
            let mut block = Vec::new();
            block.extend_from_slice(&block_size.to_le_bytes());
            block.extend_from_slice(&(next_offset as u32).to_le_bytes());
            block.extend_from_slice(&payload[tail_start..tail_start + data_per_block]);
            self.append(&block);
        }

        // Terminator: zero next-block header followed by the head bytes.
        let mut block = Vec::new();
        block.extend_from_slice(&0u32.to_le_bytes());
        block.extend_from_slice(&0u32.to_le_bytes());
        block.extend_from_slice(&payload[..remainder]);
        self.append(&block);

        (id, start, payload.len() as u32, block_size, 0)
    }

    /// Store a zlib-compressed record: 4 junk bytes, then the deflate
    /// stream. The entry size is the stored size, not the decoded size.
    pub fn compressed_record(&mut self, id: u64, plain: &[u8]) -> RawEntry {
        let mut payload = vec![0xAA, 0xBB, 0xCC, 0xDD];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plain).unwrap();
        payload.extend_from_slice(&encoder.finish().unwrap());

        let size = payload.len() as u32;
        let offset = self.append_chunked(&payload);
        (id, offset, size, TEST_BLOCK_SIZE, COMPRESSED_FLAG)
    }

    /// Store a directory node; returns the `(block_size, offset)` pair a
    /// parent's child slot needs.
    pub fn node(&mut self, children: &[(u32, u64)], files: &[RawEntry]) -> (u32, u64) {
        let raw = encode_node(children, files);
        let offset = self.append_chunked(&raw);
        (DIRECTORY_BLOCK_SIZE, offset)
    }

    fn write_superblock(&mut self, root_offset: u64) {
        let total = self.data.len() as u32;
        self.data[320..324].copy_from_slice(&TEST_MAGIC.to_le_bytes());
        self.data[324..328].copy_from_slice(&TEST_BLOCK_SIZE.to_le_bytes());
        self.data[328..332].copy_from_slice(&total.to_le_bytes());
        self.data[332..336].copy_from_slice(&0x100u32.to_le_bytes());
        self.data[352..356].copy_from_slice(&(root_offset as u32).to_le_bytes());
        self.data[372..376].copy_from_slice(&1u32.to_le_bytes());
    }

    /// Finish into a temporary file.
    pub fn finish(mut self, root: (u32, u64)) -> NamedTempFile {
        self.write_superblock(root.1);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&self.data).unwrap();
        file.flush().unwrap();
        file
    }

    /// Finish into a named file, for facade tests that glob a directory.
    pub fn finish_at(mut self, root: (u32, u64), path: &Path) {
        self.write_superblock(root.1);
        std::fs::write(path, &self.data).unwrap();
    }
}

/// Encode a string-table record: header, then per-token label parts with
/// empty variable metadata.
pub(crate) fn encode_string_table(table_id: u32, entries: &[(u32, &[&str])]) -> Vec<u8> {
    use super::cursor::{write_prefixed_utf16, write_vle};

    let mut out = Vec::new();
    out.extend_from_slice(&table_id.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.push(0); // reserved tsize byte
    write_vle(&mut out, entries.len() as u32);

    for &(token, parts) in entries {
        out.extend_from_slice(&token.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(parts.len() as u32).to_le_bytes());
        for part in parts {
            write_prefixed_utf16(&mut out, part);
        }
        out.extend_from_slice(&0u32.to_le_bytes()); // variables
        out.push(0); // no variable names
    }

    out
}

/// One definition inside a fixture master record.
pub(crate) struct DefSpec {
    pub id: u32,
    pub name: &'static str,
    pub type_code: u32,
    pub data_id: u32,
    /// Raw bytes of a default value; sets flag 0x08 when present.
    pub default_value: Option<Vec<u8>>,
    pub children: Vec<u32>,
}

impl DefSpec {
    pub fn new(id: u32, name: &'static str, type_code: u32) -> Self {
        Self {
            id,
            name,
            type_code,
            data_id: 0,
            default_value: None,
            children: Vec::new(),
        }
    }

    pub fn with_default(mut self, raw: Vec<u8>) -> Self {
        self.default_value = Some(raw);
        self
    }

    pub fn with_children(mut self, children: Vec<u32>) -> Self {
        self.children = children;
        self
    }
}

/// Encode a master property-definition record from a list of definitions.
pub(crate) fn encode_master_record(record_id: u32, defs: &[DefSpec]) -> Vec<u8> {
    use super::cursor::{write_pascal_string, write_vle};

    let mut out = Vec::new();
    out.extend_from_slice(&record_id.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);

    // Pass 1: names
    out.push(0); // reserved tsize byte
    write_vle(&mut out, defs.len() as u32);
    for def in defs {
        out.extend_from_slice(&def.id.to_le_bytes());
        write_pascal_string(&mut out, def.name);
    }

    out.extend_from_slice(&[0u8; 2]);

    // Pass 2: full definitions
    out.push(0);
    write_vle(&mut out, defs.len() as u32);
    for def in defs {
        out.extend_from_slice(&def.id.to_le_bytes()); // list entry
        out.extend_from_slice(&def.id.to_le_bytes()); // definition header
        out.extend_from_slice(&def.type_code.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // group
        out.extend_from_slice(&0u32.to_le_bytes()); // provider
        out.extend_from_slice(&def.data_id.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // patch flags
        let flags: u32 = if def.default_value.is_some() { 0x08 } else { 0 };
        out.extend_from_slice(&(flags << 8).to_le_bytes());
        if let Some(raw) = &def.default_value {
            out.extend_from_slice(raw);
        }
        out.extend_from_slice(&[0u8; 4]); // prediction timeout
        out.extend_from_slice(&[0u8; 4]); // inheritance/file/propagation/caching
        out.push(0); // padding
        write_vle(&mut out, def.children.len() as u32);
        for &child in &def.children {
            out.extend_from_slice(&child.to_le_bytes());
            out.extend_from_slice(&child.to_le_bytes());
        }
        out.extend_from_slice(&0u32.to_le_bytes()); // required count
        out.extend_from_slice(&0u32.to_le_bytes()); // trailing zero
    }

    out
}
