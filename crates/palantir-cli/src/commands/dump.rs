use std::path::Path;

use anyhow::{Context, Result};
use palantir_core::memory::layout::ClientLayout;
use palantir_core::{
    DataFacade, MemoryReader, OffsetSearcher, ProcessHandle, dump_entity_properties,
    scan_entity_table,
};
use tracing::info;

pub fn run(game_path: &Path) -> Result<()> {
    let process = ProcessHandle::find_and_open().context("no running game client")?;
    let layout = ClientLayout::for_bitness(process.is_64bit());
    let module = process.module(process.client_module_name())?;

    let memory = MemoryReader::new(&process);
    let offsets = OffsetSearcher::new(&memory).search(&module, &layout);

    let scan = scan_entity_table(&memory, &layout, offsets.entity_table);
    let player = scan.player.context("player entity not found")?;
    info!(
        "Dumping player entity {:#x} ({} properties)",
        player.instance_id, player.property_count
    );

    // Names are best effort; the dump is still useful without a registry.
    let facade = DataFacade::open(game_path).ok();
    let registry = facade.as_ref().and_then(|f| f.registry().ok());

    let entries = dump_entity_properties(&memory, &layout, registry, player.address);
    println!("{:>12}  {:<12}  {:<48}  value", "id", "type", "name");
    for entry in &entries {
        println!(
            "{:>12}  {:<12}  {:<48}  {:#018x}",
            entry.id,
            entry.property_type.to_string(),
            entry.name,
            entry.value
        );
    }
    println!("{} properties", entries.len());
    Ok(())
}
