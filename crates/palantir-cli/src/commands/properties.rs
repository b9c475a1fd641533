use std::path::Path;

use anyhow::{Context, Result};
use palantir_core::DataFacade;

pub fn run(game_path: &Path, keyword: &str, limit: usize) -> Result<()> {
    let facade = DataFacade::open(game_path).context("failed to open the game archives")?;
    let registry = facade
        .registry()
        .context("failed to decode the property registry")?;

    let hits = registry.search(keyword, limit);
    if hits.is_empty() {
        println!(
            "No properties matching '{}' ({} registered)",
            keyword,
            registry.len()
        );
        return Ok(());
    }

    println!("{:>12}  {:<12}  name", "id", "type");
    for def in &hits {
        println!("{:>12}  {:<12}  {}", def.id, def.property_type.to_string(), def.name);
    }
    if hits.len() == limit {
        println!("(capped at {} results)", limit);
    }
    Ok(())
}
