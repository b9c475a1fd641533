use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

/// Format an unmapped game code for display.
fn unknown_code(code: i32) -> String {
    format!("Unknown ({code})")
}

/// Character classes, keyed by the code the class property carries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum CharacterClass {
    Guardian = 23,
    Captain = 24,
    Minstrel = 31,
    Burglar = 40,
    Hunter = 162,
    Champion = 172,
    #[strum(serialize = "Lore-master")]
    LoreMaster = 185,
    #[strum(serialize = "Rune-keeper")]
    RuneKeeper = 193,
    Warden = 194,
    Beorning = 214,
    Brawler = 215,
    Mariner = 216,
}

impl CharacterClass {
    pub fn from_code(code: i32) -> Option<Self> {
        u32::try_from(code).ok().and_then(Self::from_repr)
    }

    /// Display name for a class code; unmapped codes become `Unknown (n)`.
    pub fn name_for(code: i32) -> String {
        match Self::from_code(code) {
            Some(class) => class.to_string(),
            None => unknown_code(code),
        }
    }
}

/// Playable races, keyed by the species property code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum Race {
    Man = 23,
    Elf = 65,
    Dwarf = 73,
    Hobbit = 81,
    Beorning = 114,
    #[strum(serialize = "High Elf")]
    HighElf = 151,
    #[strum(serialize = "Stout-axe")]
    StoutAxe = 152,
    #[strum(serialize = "River Hobbit")]
    RiverHobbit = 153,
}

impl Race {
    pub fn from_code(code: i32) -> Option<Self> {
        u32::try_from(code).ok().and_then(Self::from_repr)
    }

    pub fn name_for(code: i32) -> String {
        match Self::from_code(code) {
            Some(race) => race.to_string(),
            None => unknown_code(code),
        }
    }
}

/// Account category, from the billing account-type property.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum AccountType {
    #[default]
    Unknown = 0,
    #[strum(serialize = "Free To Play")]
    FreeToPlay = 1,
    Premium = 3,
    #[strum(serialize = "VIP")]
    Vip = 6,
    Lifetime = 7,
}

impl AccountType {
    pub fn from_code(code: i32) -> Self {
        u32::try_from(code)
            .ok()
            .and_then(Self::from_repr)
            .unwrap_or(Self::Unknown)
    }
}

/// Reputation standing with a faction, ordered by tier ordinal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    IntoStaticStr,
    Display,
)]
#[repr(u32)]
pub enum ReputationTier {
    Enemy = 1,
    Outsider = 2,
    Neutral = 3,
    Acquaintance = 4,
    Friend = 5,
    Ally = 6,
    Kindred = 7,
}

impl ReputationTier {
    pub fn from_code(code: i32) -> Option<Self> {
        u32::try_from(code).ok().and_then(Self::from_repr)
    }

    pub fn name_for(code: i32) -> String {
        match Self::from_code(code) {
            Some(tier) => tier.to_string(),
            None => unknown_code(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_codes() {
        assert_eq!(CharacterClass::name_for(23), "Guardian");
        assert_eq!(CharacterClass::name_for(24), "Captain");
        assert_eq!(CharacterClass::name_for(185), "Lore-master");
        assert_eq!(CharacterClass::name_for(216), "Mariner");
        assert_eq!(CharacterClass::name_for(999), "Unknown (999)");
        assert_eq!(CharacterClass::name_for(-1), "Unknown (-1)");
    }

    #[test]
    fn test_race_codes() {
        assert_eq!(Race::name_for(23), "Man");
        assert_eq!(Race::name_for(151), "High Elf");
        assert_eq!(Race::name_for(153), "River Hobbit");
        assert_eq!(Race::name_for(999), "Unknown (999)");
    }

    #[test]
    fn test_class_and_race_share_code_23() {
        // Same numeric code, different tables.
        assert_eq!(CharacterClass::name_for(23), "Guardian");
        assert_eq!(Race::name_for(23), "Man");
    }

    #[test]
    fn test_account_type_codes() {
        assert_eq!(AccountType::from_code(1), AccountType::FreeToPlay);
        assert_eq!(AccountType::from_code(3), AccountType::Premium);
        assert_eq!(AccountType::from_code(6), AccountType::Vip);
        assert_eq!(AccountType::from_code(7), AccountType::Lifetime);
        assert_eq!(AccountType::from_code(2), AccountType::Unknown);
        assert_eq!(AccountType::from_code(-5), AccountType::Unknown);
        assert_eq!(AccountType::Vip.to_string(), "VIP");
    }

    #[test]
    fn test_reputation_tiers() {
        assert_eq!(ReputationTier::name_for(1), "Enemy");
        assert_eq!(ReputationTier::name_for(4), "Acquaintance");
        assert_eq!(ReputationTier::name_for(7), "Kindred");
        assert_eq!(ReputationTier::name_for(0), "Unknown (0)");
        assert!(ReputationTier::Friend < ReputationTier::Kindred);
    }
}
