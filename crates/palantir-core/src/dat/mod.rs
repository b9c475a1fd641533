//! Reading of the game's DAT content archives.
//!
//! A DAT archive is a blockwise store indexed by a B-tree of 64-bit record
//! ids. This module covers the on-disk format ([`archive`]), the stream
//! decoding primitives shared by record payloads ([`cursor`]), the property
//! definition record ([`definitions`], [`registry`]) and the multi-archive
//! facade the extractor talks to ([`facade`]).

mod archive;
mod cursor;
mod definitions;
mod entry;
mod facade;
mod registry;

#[cfg(test)]
pub(crate) mod fixture;

pub use archive::{DatArchive, Superblock};
pub use cursor::Cursor;
pub use definitions::decode_master_record;
pub use entry::{DirectoryNode, FileEntry};
pub use facade::{DataFacade, PROPERTY_DEFINITIONS_RECORD_ID};
pub use registry::{PropertyDef, PropertyRegistry, PropertyType};
