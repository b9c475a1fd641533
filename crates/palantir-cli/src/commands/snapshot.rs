use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use palantir_core::{CharacterExtractor, CharacterSnapshot};

pub fn run(game_path: &Path, json: bool) -> Result<()> {
    let mut extractor = CharacterExtractor::attach_to(game_path)
        .context("failed to attach to the game client")?;
    let snapshot = extractor.snapshot().context("extraction failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

pub(crate) fn print_snapshot(snapshot: &CharacterSnapshot) {
    println!(
        "{} (level {})",
        snapshot.name.bold(),
        snapshot.level.to_string().cyan()
    );
    println!("  {} {} on {}", snapshot.race, snapshot.class_name, snapshot.server);
    if !snapshot.account.is_empty() {
        println!("  Account: {} [{}]", snapshot.account, snapshot.account_type);
    }
    println!("  Morale {}  Power {}", snapshot.morale, snapshot.power);
    println!(
        "  {}  Destiny points: {}",
        snapshot.money.to_string().yellow(),
        snapshot.destiny_points
    );

    let ranked: Vec<_> = snapshot.virtues.iter().filter(|v| v.rank > 0).collect();
    if !ranked.is_empty() {
        println!("  Virtues:");
        for virtue in ranked {
            println!("    {:<14} rank {:>2}  (xp {})", virtue.name, virtue.rank, virtue.xp);
        }
    }

    if !snapshot.factions.is_empty() {
        println!("  Reputation:");
        for faction in &snapshot.factions {
            println!(
                "    {:<28} {:<13} ({})",
                faction.name, faction.tier_name, faction.reputation
            );
        }
    }

    if !snapshot.professions.is_empty() {
        println!("  Crafting:");
        for profession in &snapshot.professions {
            let mastered = if profession.mastered { " [mastered]" } else { "" };
            println!(
                "    {:<12} tier {} / mastery {}{}",
                profession.name, profession.tier, profession.mastery, mastered
            );
        }
    }

    if !snapshot.equipment.is_empty() {
        println!("  Equipment:");
        for (slot, data_id) in &snapshot.equipment {
            println!("    {:<12} {:#010x}", slot, data_id);
        }
    }

    if !snapshot.wallet.is_empty() {
        println!("  Wallet:");
        for (currency, amount) in &snapshot.wallet {
            println!("    {:<18} {}", currency, amount);
        }
    }

    if !snapshot.titles.is_empty() {
        println!("  Active title id: {}", snapshot.titles[0]);
    }
    if !snapshot.emotes.is_empty() {
        println!("  Emotes granted: {}", snapshot.emotes.len());
    }
}
