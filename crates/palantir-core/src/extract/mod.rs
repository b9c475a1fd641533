//! Live extraction of the player character from client memory.
//!
//! [`hashtable`] resolves property ids through the game's separate-chaining
//! hash containers, [`scanner`] finds the player among the tracked world
//! entities, [`values`] decodes typed property values, [`properties`] holds
//! the well-known property-name catalogues, and [`extractor`] assembles the
//! snapshot.

pub mod hashtable;
mod extractor;
mod properties;
mod scanner;
mod values;

pub use extractor::CharacterExtractor;
pub use properties::{
    CurrencySpec, FactionSpec, ProfessionSpec, ResolvedProperties, SlotSpec, VirtueSpec,
    EQUIPMENT_SLOTS, FACTIONS, PROFESSIONS, VIRTUES, WALLET_CURRENCIES,
};
pub use scanner::{EntityScan, PlayerEntity, scan_entity_table};
pub use values::PropertyReader;
