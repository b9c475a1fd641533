//! Multi-archive facade.
//!
//! Owns every archive opened from the game install directory, loads records
//! by id across all of them, builds the property registry on first use and
//! resolves `(table, token)` string references for the StringInfo decoder.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::archive::DatArchive;
use super::cursor::Cursor;
use super::definitions::decode_master_record;
use super::registry::PropertyRegistry;

/// Record id of the master property-definition record.
pub const PROPERTY_DEFINITIONS_RECORD_ID: u64 = 0x3400_0000;

/// Archive names known to carry the records we need; the game-logic archive
/// holds the property definitions.
const ARCHIVE_PATTERNS: &[&str] = &[
    "client_gamelogic.dat",
    "client_local_*.dat",
    "client_general.dat",
];

/// Upper bound on string-table entry counts.
const MAX_TABLE_ENTRIES: u32 = 100_000;

pub struct DataFacade {
    game_path: PathBuf,
    archives: Vec<DatArchive>,
    registry: OnceLock<PropertyRegistry>,
}

impl DataFacade {
    /// Open every known archive under the game install directory.
    pub fn open<P: AsRef<Path>>(game_path: P) -> Result<Self> {
        let game_path = game_path.as_ref().to_path_buf();

        let mut paths = Vec::new();
        for pattern in ARCHIVE_PATTERNS {
            collect_matches(&game_path, pattern, &mut paths);
        }
        if paths.is_empty() {
            warn!(
                "No known archive names in {}, trying any .dat file",
                game_path.display()
            );
            collect_matches(&game_path, "*.dat", &mut paths);
        }

        let mut archives = Vec::new();
        for path in paths {
            match DatArchive::open(&path) {
                Ok(archive) => archives.push(archive),
                Err(e) => warn!("Skipping archive {}: {}", path.display(), e),
            }
        }

        if archives.is_empty() {
            return Err(Error::ArchiveOpenFailed(game_path));
        }
        info!(
            "Opened {} archive(s) from {}",
            archives.len(),
            game_path.display()
        );

        Ok(Self {
            game_path,
            archives,
            registry: OnceLock::new(),
        })
    }

    pub fn game_path(&self) -> &Path {
        &self.game_path
    }

    pub fn archives(&self) -> &[DatArchive] {
        &self.archives
    }

    /// Load a record by id, trying each archive in discovery order.
    pub fn load_data(&self, id: u64) -> Option<Vec<u8>> {
        for archive in &self.archives {
            if let Some(data) = archive.load(id) {
                return Some(data);
            }
        }
        debug!("Record {:#x} not found in any archive", id);
        None
    }

    /// The property registry, decoded from the master record on first use
    /// and immutable afterwards.
    pub fn registry(&self) -> Result<&PropertyRegistry> {
        if let Some(registry) = self.registry.get() {
            return Ok(registry);
        }
        let data = self
            .load_data(PROPERTY_DEFINITIONS_RECORD_ID)
            .ok_or(Error::RegistryParseFailed)?;
        let built = decode_master_record(&data)?;
        Ok(self.registry.get_or_init(|| built))
    }

    /// Resolve a `(table, token)` string reference by scanning the string
    /// table record for the token and concatenating its label parts.
    pub fn resolve_string(&self, table_id: u32, token_id: u32) -> Option<String> {
        let data = self.load_data(u64::from(table_id))?;
        match scan_string_table(&data, table_id, token_id) {
            Ok(label) => {
                if label.is_none() {
                    debug!("Token {} not found in table {:#x}", token_id, table_id);
                }
                label
            }
            Err(_) => {
                warn!("Malformed string table {:#x}", table_id);
                None
            }
        }
    }
}

fn collect_matches(dir: &Path, pattern: &str, out: &mut Vec<PathBuf>) {
    let Some(full) = dir.join(pattern).to_str().map(str::to_owned) else {
        return;
    };
    let Ok(paths) = glob::glob(&full) else {
        return;
    };
    let mut matched: Vec<PathBuf> = paths.flatten().collect();
    matched.sort();
    for path in matched {
        if !out.contains(&path) {
            out.push(path);
        }
    }
}

fn scan_string_table(data: &[u8], table_id: u32, token_id: u32) -> Result<Option<String>> {
    let mut cursor = Cursor::new(data);

    let record_id = cursor.read_u32()?;
    if record_id != table_id {
        warn!(
            "String table id mismatch: expected {:#x}, got {:#x}",
            table_id, record_id
        );
    }
    cursor.read_u32()?; // reserved
    let entry_count = cursor.read_tsize()?;
    if entry_count > MAX_TABLE_ENTRIES {
        return Err(Error::RegistryParseFailed);
    }

    for _ in 0..entry_count {
        if cursor.is_exhausted() {
            break;
        }
        let token = cursor.read_u32()?;
        cursor.read_u32()?; // reserved
        let part_count = cursor.read_u32()?;
        if part_count > MAX_TABLE_ENTRIES {
            return Err(Error::RegistryParseFailed);
        }

        let matched = token == token_id;
        let mut label = String::new();
        for _ in 0..part_count {
            let part = cursor.read_prefixed_utf16()?;
            if matched {
                label.push_str(&part);
            }
        }

        let variable_count = cursor.read_u32()?;
        if variable_count > MAX_TABLE_ENTRIES {
            return Err(Error::RegistryParseFailed);
        }
        for _ in 0..variable_count {
            cursor.read_u32()?;
        }
        if cursor.read_bool()? {
            let name_count = cursor.read_u32()?;
            if name_count > MAX_TABLE_ENTRIES {
                return Err(Error::RegistryParseFailed);
            }
            for _ in 0..name_count {
                cursor.read_prefixed_utf16()?;
            }
        }

        if matched {
            return Ok(Some(label));
        }
    }

    Ok(None)
}
