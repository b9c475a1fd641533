//! The extracted character snapshot and its component records.
//!
//! A snapshot is a plain value: every field the extractor could not resolve
//! stays at its zero value, and the capture timestamp marks the moment the
//! reads happened. Serialization is the caller's business; the core only
//! derives the serde traits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountType, Money};

/// Standing in one virtue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtueStatus {
    pub key: String,
    pub name: String,
    pub rank: i32,
    pub xp: i32,
}

/// Reputation with one faction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionStatus {
    pub key: String,
    pub name: String,
    pub category: String,
    pub tier: i32,
    pub tier_name: String,
    pub reputation: i32,
}

/// Progress in one crafting profession.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingStatus {
    pub key: String,
    pub name: String,
    /// Proficiency tier.
    pub tier: i32,
    /// Mastery tier.
    pub mastery: i32,
    pub proficiency_xp: i32,
    pub mastered: bool,
}

/// Point-in-time view of the player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub captured_at: DateTime<Utc>,

    // Identity
    pub name: String,
    pub server: String,
    pub account: String,
    pub account_type: AccountType,
    pub level: i32,
    pub class_code: i32,
    pub class_name: String,
    pub race_code: i32,
    pub race: String,

    // Vitals
    pub morale: i32,
    pub power: i32,

    // Currency
    pub money: Money,
    pub destiny_points: i32,

    pub virtues: Vec<VirtueStatus>,
    pub factions: Vec<FactionStatus>,
    pub professions: Vec<CraftingStatus>,
    /// Equipment slot name → item data id.
    pub equipment: BTreeMap<String, u32>,
    /// Wallet currency key → amount.
    pub wallet: BTreeMap<String, i32>,
    /// Active title data ids.
    pub titles: Vec<u32>,
    /// Granted emote ids.
    pub emotes: Vec<u32>,
}

impl CharacterSnapshot {
    pub fn new() -> Self {
        Self {
            captured_at: Utc::now(),
            name: String::new(),
            server: String::new(),
            account: String::new(),
            account_type: AccountType::Unknown,
            level: 0,
            class_code: 0,
            class_name: String::new(),
            race_code: 0,
            race: String::new(),
            morale: 0,
            power: 0,
            money: Money::default(),
            destiny_points: 0,
            virtues: Vec::new(),
            factions: Vec::new(),
            professions: Vec::new(),
            equipment: BTreeMap::new(),
            wallet: BTreeMap::new(),
            titles: Vec::new(),
            emotes: Vec::new(),
        }
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} Lv{} {} {} on {} ({})",
            self.name, self.level, self.race, self.class_name, self.server, self.money
        )
    }
}

impl Default for CharacterSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut snapshot = CharacterSnapshot::new();
        snapshot.name = "Aragorn".into();
        snapshot.level = 120;
        snapshot.money = Money::from_copper(10_050_025);
        snapshot.equipment.insert("HEAD".into(), 0xDEAD_BEEF);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["name"], "Aragorn");
        assert_eq!(json["level"], 120);
        assert_eq!(json["money"]["gold"], 100);
        assert_eq!(json["equipment"]["HEAD"], 0xDEAD_BEEFu32);
    }

    #[test]
    fn test_summary_line() {
        let mut snapshot = CharacterSnapshot::new();
        snapshot.name = "Aragorn".into();
        snapshot.level = 120;
        snapshot.race = "Man".into();
        snapshot.class_name = "Captain".into();
        snapshot.server = "Evernight".into();
        assert!(snapshot.summary().starts_with("Aragorn Lv120 Man Captain"));
    }
}
