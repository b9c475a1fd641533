//! # palantir-core
//!
//! Core library for the Palantir character companion.
//!
//! This crate provides:
//! - Read-only memory access to the running game client (64- and 32-bit)
//! - DAT archive reading: B-tree record lookup, block-chain reassembly,
//!   zlib payload decompression
//! - The property registry decoded from the game's master definition record
//! - Live extraction of the player character into a [`CharacterSnapshot`]
//!
//! ## Feature Flags
//!
//! - `debug-tools`: Enables utilities for dumping raw entity properties.
//!   This feature is intended for CLI tools and development, not production
//!   use.

pub mod dat;
#[cfg(feature = "debug-tools")]
pub mod debug;
pub mod error;
pub mod extract;
pub mod game;
pub mod memory;
pub mod offset;

pub use dat::{DatArchive, DataFacade, PropertyDef, PropertyRegistry, PropertyType};
pub use error::{Error, Result};
pub use extract::{
    CharacterExtractor, EntityScan, PlayerEntity, PropertyReader, ResolvedProperties,
    scan_entity_table,
};
pub use game::{
    AccountType, CharacterClass, CharacterSnapshot, CraftingStatus, FactionStatus, Money, Race,
    ReputationTier, VirtueStatus,
};
pub use memory::{
    ByteBuffer, MemoryReader, ModuleInfo, ProcessHandle, ProcessInfo, ReadMemory, find_client,
    find_processes,
};
pub use offset::{CodeSignature, GlobalOffsets, OffsetSearcher};

// Debug utilities (requires debug-tools feature)
#[cfg(feature = "debug-tools")]
pub use debug::{PropertyDumpEntry, dump_entity_properties};
