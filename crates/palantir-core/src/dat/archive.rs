//! Block-level reader for a single DAT archive file.
//!
//! The file is memory-mapped; records are located through a B-tree of
//! directory nodes and reassembled from block chains. All lookup paths are
//! total: malformed nodes or truncated chains abort the lookup with a log
//! line instead of failing the whole archive.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flate2::read::ZlibDecoder;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::entry::{DIRECTORY_BLOCK_SIZE, DIRECTORY_RAW_SIZE, DirectoryNode, FileEntry};

/// Expected superblock magic.
const SUPERBLOCK_MAGIC: u32 = 21570;
/// File offset of the superblock.
const SUPERBLOCK_OFFSET: usize = 320;
/// Size of the superblock.
const SUPERBLOCK_SIZE: usize = 104;
/// Maximum B-tree depth followed before a lookup is abandoned.
const MAX_TREE_DEPTH: usize = 64;
/// Maximum blocks followed in one legacy chain.
const MAX_LEGACY_STEPS: usize = 1000;
/// Hard ceiling on a decompressed record.
const MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Archive superblock.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub magic: u32,
    pub block_size: u32,
    pub file_size: u64,
    pub version: u32,
    pub root_offset: u64,
    pub pack_version: u32,
}

/// An open archive plus its directory-node cache.
///
/// The cache only ever grows and every slot is written once, so sharing an
/// archive between readers is safe as long as the mutex serializes inserts.
pub struct DatArchive {
    path: PathBuf,
    map: memmap2::Mmap,
    superblock: Superblock,
    nodes: Mutex<HashMap<u64, Arc<DirectoryNode>>>,
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

impl DatArchive {
    /// Open an archive and validate its superblock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_failed = || Error::ArchiveOpenFailed(path.clone());

        let file = File::open(&path).map_err(|_| open_failed())?;
        let map = unsafe { memmap2::Mmap::map(&file) }.map_err(|_| open_failed())?;

        let raw = map
            .get(SUPERBLOCK_OFFSET..SUPERBLOCK_OFFSET + SUPERBLOCK_SIZE)
            .ok_or_else(|| open_failed())?;

        let superblock = Superblock {
            magic: u32_at(raw, 0).unwrap_or(0),
            block_size: u32_at(raw, 4).unwrap_or(0),
            file_size: u64::from(u32_at(raw, 8).unwrap_or(0)),
            version: u32_at(raw, 12).unwrap_or(0),
            root_offset: u64::from(u32_at(raw, 32).unwrap_or(0)),
            pack_version: u32_at(raw, 52).unwrap_or(0),
        };

        if superblock.magic != SUPERBLOCK_MAGIC {
            warn!(
                "Archive magic mismatch in {}: got {}, expected {}",
                path.display(),
                superblock.magic,
                SUPERBLOCK_MAGIC
            );
        }
        if superblock.block_size == 0 || superblock.root_offset == 0 {
            return Err(open_failed());
        }

        info!(
            "Opened archive {} (block size {}, version {:#x})",
            path.display(),
            superblock.block_size,
            superblock.version
        );

        Ok(Self {
            path,
            map,
            superblock,
            nodes: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Look up a record id and return its reassembled, decompressed bytes.
    pub fn load(&self, id: u64) -> Option<Vec<u8>> {
        let entry = self.find_entry(id)?;
        self.read_record(&entry)
    }

    /// Look up a record id without reading its payload.
    pub fn find_entry(&self, id: u64) -> Option<FileEntry> {
        let mut offset = self.superblock.root_offset;
        let mut block_size = DIRECTORY_BLOCK_SIZE;

        for _ in 0..MAX_TREE_DEPTH {
            let node = self.node_at(offset, block_size)?;
            match node.files.binary_search_by_key(&id, |f| f.id) {
                Ok(index) => return Some(node.files[index]),
                Err(next) => {
                    let child = node.children.get(next)?;
                    offset = child.offset;
                    block_size = child.block_size;
                }
            }
        }

        warn!("B-tree deeper than {} levels, aborting lookup", MAX_TREE_DEPTH);
        None
    }

    fn node_at(&self, offset: u64, block_size: u32) -> Option<Arc<DirectoryNode>> {
        if offset == 0 {
            return None;
        }
        if let Some(node) = self.nodes.lock().ok()?.get(&offset) {
            return Some(Arc::clone(node));
        }

        let raw = self.read_block_chain(offset, block_size, DIRECTORY_RAW_SIZE)?;
        let node = DirectoryNode::parse(&raw).or_else(|| {
            warn!("Malformed directory node at offset {}", offset);
            None
        })?;

        let node = Arc::new(node);
        self.nodes
            .lock()
            .ok()?
            .entry(offset)
            .or_insert_with(|| Arc::clone(&node));
        Some(node)
    }

    fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let start = usize::try_from(offset).ok()?;
        self.map.get(start..start.checked_add(len)?)
    }

    /// Read a record body: an 8-byte header discriminates between the new
    /// chunked format and the legacy linked-block format.
    fn read_block_chain(&self, offset: u64, block_size: u32, size: usize) -> Option<Vec<u8>> {
        let header = self.slice(offset, 8)?;
        let num_extra = u32_at(header, 0)? as usize;
        let legacy_marker = u32_at(header, 4)?;

        if legacy_marker != 0 {
            return self.read_legacy_chain(offset, block_size, size);
        }

        let first_chunk = block_size as i64 - 8 - 8 * num_extra as i64;
        if first_chunk <= 0 || first_chunk > i64::from(block_size) {
            debug!(
                "Rejecting record at {}: first chunk size {} out of range",
                offset, first_chunk
            );
            return None;
        }
        let first_chunk = (first_chunk as usize).min(size);

        let mut result = vec![0u8; size];
        result[..first_chunk].copy_from_slice(self.slice(offset + 8, first_chunk)?);

        let mut filled = first_chunk;
        if filled < size {
            let extra = self.slice(offset + 8 + first_chunk as u64, num_extra * 8)?;
            for i in 0..num_extra {
                if filled >= size {
                    break;
                }
                let extra_block = u32_at(extra, i * 8)? as usize;
                let extra_offset = u64::from(u32_at(extra, i * 8 + 4)?);
                if extra_block == 0 {
                    break;
                }
                let to_read = extra_block.min(size - filled);
                let chunk = self.slice(extra_offset, to_read)?;
                result[filled..filled + to_read].copy_from_slice(chunk);
                filled += to_read;
            }
        }

        Some(result)
    }

    /// Legacy format: a linked list of blocks filled from the tail of the
    /// output toward its head; a zero-size header terminates the chain and
    /// carries the head bytes.
    fn read_legacy_chain(&self, offset: u64, block_size: u32, size: usize) -> Option<Vec<u8>> {
        let mut result = vec![0u8; size];
        let mut bytes_read = 0usize;
        let mut pos = size;
        let mut cur_offset = offset;
        let mut cur_block = block_size;

        for _ in 0..MAX_LEGACY_STEPS {
            if bytes_read >= size {
                break;
            }
            let header = self.slice(cur_offset, 8)?;
            let next_block = u32_at(header, 0)?;
            let next_offset = u64::from(u32_at(header, 4)?);

            if next_block == 0 {
                let to_read = size - bytes_read;
                let chunk = self.slice(cur_offset + 8, to_read)?;
                result[..to_read].copy_from_slice(chunk);
                return Some(result);
            }

            let to_read = cur_block as i64 - 8;
            if to_read <= 0 || to_read as usize > pos {
                debug!("Rejecting legacy chain at {}: bad block size", cur_offset);
                return None;
            }
            let to_read = to_read as usize;
            pos -= to_read;
            let chunk = self.slice(cur_offset + 8, to_read)?;
            result[pos..pos + to_read].copy_from_slice(chunk);
            bytes_read += to_read;

            cur_offset = next_offset;
            cur_block = next_block;
        }

        Some(result)
    }

    fn read_record(&self, entry: &FileEntry) -> Option<Vec<u8>> {
        let data = self.read_block_chain(entry.offset, entry.block_size, entry.size as usize)?;

        if !entry.is_compressed() {
            return Some(data);
        }

        // Compressed payloads carry a 4-byte prefix before the zlib stream.
        // The decoded size is not recorded, so the decoder grows as needed
        // under a hard ceiling.
        if data.len() <= 4 {
            return None;
        }
        let mut decoded = Vec::with_capacity(
            (entry.size as usize)
                .saturating_mul(10)
                .min(MAX_DECOMPRESSED_SIZE),
        );
        let mut decoder = ZlibDecoder::new(&data[4..]).take(MAX_DECOMPRESSED_SIZE as u64 + 1);
        if let Err(e) = decoder.read_to_end(&mut decoded) {
            warn!("Failed to decompress record {:#x}: {}", entry.id, e);
            return None;
        }
        if decoded.len() > MAX_DECOMPRESSED_SIZE {
            warn!("Record {:#x} exceeds the decompression ceiling", entry.id);
            return None;
        }
        Some(decoded)
    }
}

impl std::fmt::Debug for DatArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatArchive")
            .field("path", &self.path)
            .field("block_size", &self.superblock.block_size)
            .finish()
    }
}
