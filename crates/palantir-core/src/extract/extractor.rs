//! The character extractor: attach, snapshot, detach.
//!
//! One extractor owns the archive facade and, while attached, a read handle
//! to the client process. A snapshot is a single bounded pass: resolve
//! property ids, locate the player entity, then read every catalogued
//! property. Individual read failures zero the affected field; only a
//! missing player (or an unreadable name) fails the whole operation.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::dat::{DataFacade, PropertyRegistry, PropertyType};
use crate::error::{Error, Result};
use crate::game::{
    AccountType, CharacterClass, CharacterSnapshot, CraftingStatus, FactionStatus, Money, Race,
    ReputationTier, VirtueStatus,
};
use crate::memory::layout::ClientLayout;
use crate::memory::{MemoryReader, ProcessHandle, ReadMemory, is_plausible_pointer};
use crate::offset::{GlobalOffsets, OffsetSearcher};

use super::properties::{
    EQUIPMENT_SLOTS, FACTIONS, PROFESSIONS, ResolvedProperties, VIRTUES, WALLET_CURRENCIES,
};
use super::scanner::scan_entity_table;
use super::values::PropertyReader;

/// Money totals above this are treated as torn reads of the 64-bit slot.
const MAX_SANE_COPPER: i64 = 100_000_000_000;

/// Live character introspection against one game install.
pub struct CharacterExtractor {
    facade: DataFacade,
    process: Option<ProcessHandle>,
    layout: ClientLayout,
    offsets: Option<GlobalOffsets>,
    resolved: Option<ResolvedProperties>,
    server: Option<String>,
}

impl CharacterExtractor {
    /// Open the game archives under `game_path`. No process is attached
    /// yet; call [`attach`](Self::attach) next.
    pub fn new<P: AsRef<Path>>(game_path: P) -> Result<Self> {
        let facade = DataFacade::open(game_path)?;
        Ok(Self {
            facade,
            process: None,
            layout: ClientLayout::client_64(),
            offsets: None,
            resolved: None,
            server: None,
        })
    }

    /// Open the archives and attach to a running client in one step.
    pub fn attach_to<P: AsRef<Path>>(game_path: P) -> Result<Self> {
        let mut extractor = Self::new(game_path)?;
        extractor.attach()?;
        Ok(extractor)
    }

    /// Find the running client, open a read handle and resolve the global
    /// data addresses. Re-attaching replaces any previous handle.
    pub fn attach(&mut self) -> Result<()> {
        self.detach();

        let process = ProcessHandle::find_and_open()?;
        self.layout = ClientLayout::for_bitness(process.is_64bit());

        let module = process.module(process.client_module_name())?;
        let memory = MemoryReader::new(&process);
        let offsets = OffsetSearcher::new(&memory).search(&module, &self.layout);
        info!(
            "Attached to PID {} (base {:#x}, entity table {:#x})",
            process.pid(),
            module.base_address,
            offsets.entity_table
        );

        // Server name is the cheapest sanity probe of the resolved globals.
        if let Some(server) = read_server_name(&memory, &self.layout, offsets.client_data) {
            info!("Server: {}", server);
            self.server = Some(server);
        } else {
            debug!("Server name not readable yet");
        }

        self.offsets = Some(offsets);
        self.process = Some(process);
        Ok(())
    }

    /// Release the process handle. Safe to call when not attached.
    pub fn detach(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.close();
        }
        self.offsets = None;
        self.server = None;
    }

    pub fn is_attached(&self) -> bool {
        self.process.is_some()
    }

    pub fn facade(&self) -> &DataFacade {
        &self.facade
    }

    /// The property registry (built on first use).
    pub fn registry(&self) -> Result<&PropertyRegistry> {
        self.facade.registry()
    }

    /// Server name seen at the last attach or snapshot.
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Extract a point-in-time snapshot of the player character.
    pub fn snapshot(&mut self) -> Result<CharacterSnapshot> {
        let process = self.process.as_ref().ok_or(Error::NotAttached)?;
        let offsets = self.offsets.ok_or(Error::NotAttached)?;

        let registry = self.facade.registry()?;
        if self.resolved.is_none() {
            self.resolved = Some(ResolvedProperties::resolve(registry));
        }
        let Some(resolved) = self.resolved.as_ref() else {
            return Err(Error::RegistryParseFailed);
        };

        let memory = MemoryReader::new(process);
        let snapshot = build_snapshot(
            &memory,
            &self.layout,
            Some(&self.facade),
            registry,
            resolved,
            &offsets,
        )?;

        if !snapshot.server.is_empty() {
            self.server = Some(snapshot.server.clone());
        }
        info!("Extracted: {}", snapshot.summary());
        Ok(snapshot)
    }
}

impl Drop for CharacterExtractor {
    fn drop(&mut self) {
        self.detach();
    }
}

/// One full snapshot pass over an attached address space.
fn build_snapshot<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    facade: Option<&DataFacade>,
    registry: &PropertyRegistry,
    resolved: &ResolvedProperties,
    offsets: &GlobalOffsets,
) -> Result<CharacterSnapshot> {
    let reader = PropertyReader::new(memory, layout, facade);
    let mut snapshot = CharacterSnapshot::new();

    if let Some(server) = read_server_name(memory, layout, offsets.client_data) {
        snapshot.server = server;
    }
    read_account_scope(memory, layout, &reader, resolved, offsets, &mut snapshot);

    // Player discovery also collects the instance → data id side map the
    // equipment decode needs.
    let scan = scan_entity_table(memory, layout, offsets.entity_table);
    let player = scan.player.ok_or(Error::PlayerNotFound)?;
    let entity = player.address;

    // The name is the one mandatory field; a candidate we cannot even name
    // is not usable as the player.
    match string_property(&reader, registry, entity, resolved.name) {
        Some(name) => snapshot.name = name,
        None => {
            warn!(
                "Name property unreadable on candidate {:#x}",
                player.instance_id
            );
            return Err(Error::PlayerNotFound);
        }
    }

    if let Some(level) = int_property(&reader, entity, resolved.level) {
        snapshot.level = level;
    }
    if let Some(class_code) = int_property(&reader, entity, resolved.class) {
        snapshot.class_code = class_code;
        snapshot.class_name = CharacterClass::name_for(class_code);
    }
    if let Some(race_code) = int_property(&reader, entity, resolved.race) {
        snapshot.race_code = race_code;
        snapshot.race = Race::name_for(race_code);
    }
    if let Some(morale) = float_property(&reader, entity, resolved.morale) {
        snapshot.morale = morale as i32;
    }
    if let Some(power) = float_property(&reader, entity, resolved.power) {
        snapshot.power = power as i32;
    }
    if let Some(raw) = property_value(&reader, entity, resolved.money) {
        snapshot.money = decode_money(raw);
    }

    read_virtues(&reader, registry, entity, &mut snapshot);
    read_factions(&reader, registry, entity, &mut snapshot);
    read_professions(&reader, registry, entity, &mut snapshot);
    read_equipment(&reader, registry, entity, &scan.data_ids, &mut snapshot);
    read_wallet(&reader, registry, entity, &mut snapshot);

    if let Some(raw) = property_value(&reader, entity, resolved.active_title) {
        let title = raw as u32;
        if title != 0 {
            snapshot.titles.push(title);
        }
    }
    if resolved.granted_emotes != -1 {
        if let Some(emotes) = reader.array_property(entity, resolved.granted_emotes as u32) {
            snapshot.emotes = emotes;
        }
    }

    Ok(snapshot)
}

fn read_account_scope<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    reader: &PropertyReader<'_, R>,
    resolved: &ResolvedProperties,
    offsets: &GlobalOffsets,
    snapshot: &mut CharacterSnapshot,
) {
    let Some(table) = account_table_base(memory, layout, offsets.account_data) else {
        debug!("Account property table not reachable");
        return;
    };

    if resolved.account_name != -1 {
        if let Some(mut account) =
            reader.table_string(table, resolved.account_name as u32, PropertyType::String)
        {
            if resolved.subscription_key != -1 {
                if let Some(key) = reader.table_string(
                    table,
                    resolved.subscription_key as u32,
                    PropertyType::String,
                ) {
                    if !key.is_empty() {
                        account = format!("{account} ({key})");
                    }
                }
            }
            snapshot.account = account;
        }
    }

    if resolved.account_type != -1 {
        if let Some(code) = reader.table_int(table, resolved.account_type as u32) {
            snapshot.account_type = AccountType::from_code(code);
        }
    }

    if resolved.destiny_points != -1 {
        if let Some(points) = reader.table_int(table, resolved.destiny_points as u32) {
            snapshot.destiny_points = points;
        }
    } else {
        debug!("Destiny points property not resolved");
    }
}

fn read_virtues<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    registry: &PropertyRegistry,
    entity: u64,
    snapshot: &mut CharacterSnapshot,
) {
    for spec in VIRTUES {
        let mut status = VirtueStatus {
            key: spec.key.to_string(),
            name: spec.name.to_string(),
            rank: 0,
            xp: 0,
        };
        if let Some(rank) = int_property(reader, entity, registry.id_of(&spec.rank_property())) {
            status.rank = rank;
        }
        if let Some(xp) = int_property(reader, entity, registry.id_of(&spec.xp_property())) {
            status.xp = xp;
        }
        snapshot.virtues.push(status);
    }
    debug!("Read {} virtues", snapshot.virtues.len());
}

fn read_factions<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    registry: &PropertyRegistry,
    entity: u64,
    snapshot: &mut CharacterSnapshot,
) {
    for spec in FACTIONS {
        let tier = int_property(reader, entity, registry.id_of(&spec.tier_property()));
        let reputation = int_property(reader, entity, registry.id_of(&spec.reputation_property()));
        let (tier, reputation) = (tier.unwrap_or(0), reputation.unwrap_or(0));
        if tier <= 0 && reputation <= 0 {
            continue;
        }
        snapshot.factions.push(FactionStatus {
            key: spec.key.to_string(),
            name: spec.name.to_string(),
            category: spec.category.to_string(),
            tier,
            tier_name: ReputationTier::name_for(tier),
            reputation,
        });
    }
    debug!("Read {} faction standings", snapshot.factions.len());
}

fn read_professions<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    registry: &PropertyRegistry,
    entity: u64,
    snapshot: &mut CharacterSnapshot,
) {
    for spec in PROFESSIONS {
        let enabled = int_property(reader, entity, registry.id_of(&spec.enabled_property()))
            .is_some_and(|value| value != 0);
        if !enabled {
            continue;
        }

        let mut status = CraftingStatus {
            key: spec.key.to_string(),
            name: spec.name.to_string(),
            tier: 0,
            mastery: 0,
            proficiency_xp: 0,
            mastered: false,
        };
        if let Some(tier) = int_property(reader, entity, registry.id_of(&spec.proficiency_property()))
        {
            status.tier = tier;
        }
        if let Some(mastery) = int_property(reader, entity, registry.id_of(&spec.mastery_property()))
        {
            status.mastery = mastery;
        }
        if let Some(xp) =
            int_property(reader, entity, registry.id_of(&spec.proficiency_xp_property()))
        {
            status.proficiency_xp = xp;
        }
        if let Some(xp) = int_property(reader, entity, registry.id_of(&spec.mastery_xp_property()))
        {
            status.mastered = xp > 0;
        }
        snapshot.professions.push(status);
    }
    debug!("Read {} crafting professions", snapshot.professions.len());
}

fn read_equipment<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    registry: &PropertyRegistry,
    entity: u64,
    data_ids: &std::collections::HashMap<u64, u32>,
    snapshot: &mut CharacterSnapshot,
) {
    for spec in EQUIPMENT_SLOTS {
        let id = registry.id_of(spec.property);
        if id == -1 {
            continue;
        }
        // Slot value → ref-counted wrapper → equipped item's instance id,
        // then the side map turns that into the item template.
        let Some(instance_id) = reader.instance_id_property(entity, id as u32) else {
            continue;
        };
        let Some(&data_id) = data_ids.get(&instance_id) else {
            debug!(
                "Slot {}: instance {:#x} not in the entity side map",
                spec.key, instance_id
            );
            continue;
        };
        snapshot.equipment.insert(spec.key.to_string(), data_id);
    }
    debug!("Read {} equipped items", snapshot.equipment.len());
}

fn read_wallet<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    registry: &PropertyRegistry,
    entity: u64,
    snapshot: &mut CharacterSnapshot,
) {
    for spec in WALLET_CURRENCIES {
        if let Some(amount) = int_property(reader, entity, registry.id_of(spec.property)) {
            if amount > 0 {
                snapshot.wallet.insert(spec.key.to_string(), amount);
            }
        }
    }
}

/// Money can be stored as a 64-bit or a 32-bit total depending on client
/// build; implausible 64-bit totals fall back to the low word.
fn decode_money(raw: u64) -> Money {
    let total = raw as i64;
    if total > 0 && total < MAX_SANE_COPPER {
        return Money::from_copper(total as u64);
    }
    let low = raw as u32;
    if low > 0 {
        return Money::from_copper(u64::from(low));
    }
    Money::default()
}

fn read_server_name<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    client_data_global: u64,
) -> Option<String> {
    let data = memory.read_pointer(client_data_global).ok()?;
    if !is_plausible_pointer(data) {
        return None;
    }
    let name_ptr = memory.read_pointer(data + layout.server_name_offset).ok()?;
    if !is_plausible_pointer(name_ptr) {
        return None;
    }
    let raw = memory.read_utf16(name_ptr, 64).ok()?;

    // The client prefixes the displayed name with a bracketed tag.
    let server = match raw.find(']') {
        Some(index) => raw[index + 1..].trim().to_string(),
        None => raw.trim().to_string(),
    };
    (!server.is_empty()).then_some(server)
}

fn account_table_base<R: ReadMemory>(
    memory: &R,
    layout: &ClientLayout,
    account_data_global: u64,
) -> Option<u64> {
    let data = memory.read_pointer(account_data_global).ok()?;
    if !is_plausible_pointer(data) {
        return None;
    }
    let provider = memory
        .read_pointer(data + layout.account_provider_offset)
        .ok()?;
    if !is_plausible_pointer(provider) {
        return None;
    }
    Some(provider + layout.account_hashtable_offset)
}

fn property_value<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    entity: u64,
    id: i64,
) -> Option<u64> {
    if id == -1 {
        return None;
    }
    reader.property_value(entity, id as u32)
}

fn int_property<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    entity: u64,
    id: i64,
) -> Option<i32> {
    if id == -1 {
        return None;
    }
    reader.int_property(entity, id as u32)
}

fn float_property<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    entity: u64,
    id: i64,
) -> Option<f32> {
    if id == -1 {
        return None;
    }
    reader.float_property(entity, id as u32)
}

fn string_property<R: ReadMemory>(
    reader: &PropertyReader<'_, R>,
    registry: &PropertyRegistry,
    entity: u64,
    id: i64,
) -> Option<String> {
    if id == -1 {
        return None;
    }
    let property_type = match registry.type_of(id as u32) {
        PropertyType::Unknown => PropertyType::StringInfo,
        other => other,
    };
    reader.string_property(entity, id as u32, property_type)
}
