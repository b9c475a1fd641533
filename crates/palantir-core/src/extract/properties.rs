//! Well-known property names and their resolution against the registry.
//!
//! Property names drift between client builds, so each core field resolves
//! through an ordered candidate list; the first name present in the
//! registry wins. The catalogues (virtues, factions, professions, slots,
//! currencies) carry the irregular property-name spellings the game
//! actually uses — several virtue rank properties are named after an
//! adjective rather than the virtue itself.

use tracing::{debug, info, warn};

use crate::dat::PropertyRegistry;

pub const NAME_CANDIDATES: &[&str] = &["Name"];
pub const LEVEL_CANDIDATES: &[&str] = &["Advancement_Level", "Level", "AdvTable_Level"];
pub const CLASS_CANDIDATES: &[&str] =
    &["Agent_Class", "AdvTable_Class", "Class", "CharacterClass"];
pub const RACE_CANDIDATES: &[&str] = &[
    "Agent_Species",
    "Agent_Race",
    "AdvTable_Race",
    "AdvTable_Species",
    "Race",
    "Species",
    "CharacterRace",
    "AdvTable_Genus",
    "Agent_Genus",
    "Genus",
];
pub const MORALE_CANDIDATES: &[&str] = &[
    "Health_CurrentLevel",
    "Vital_CurrentMorale",
    "Morale_Current",
    "CurrentMorale",
    "Vital_CurrentHealth",
];
pub const POWER_CANDIDATES: &[&str] = &[
    "Power_CurrentLevel",
    "Vital_CurrentPower",
    "Power_Current",
    "CurrentPower",
];
pub const MONEY_CANDIDATES: &[&str] = &[
    "Currency_Amount",
    "Inventory_Money",
    "Money",
    "Gold_Amount",
    "Wallet_Money",
    "Currency_Total",
];
pub const DESTINY_POINTS_CANDIDATES: &[&str] = &[
    "MonsterPlay_SessionPoints",
    "DestinyPoints",
    "Destiny_Points",
    "Account_DestinyPoints",
];
pub const ACCOUNT_NAME_CANDIDATES: &[&str] = &["Account_BillingName", "Account_Name"];
pub const SUBSCRIPTION_KEY_CANDIDATES: &[&str] = &["Account_GameAccountName"];
pub const ACCOUNT_TYPE_CANDIDATES: &[&str] = &["Billing@Player.AccountType", "Account_Type"];
pub const ACTIVE_TITLE_CANDIDATES: &[&str] = &[
    "Title_ActiveTitleDID",
    "Advancement_CurrentTitle",
    "AdvTable_CurrentTitle",
    "Player_CurrentTitle",
    "Agent_CurrentTitle",
    "CurrentTitle",
];
pub const GRANTED_EMOTES_CANDIDATES: &[&str] = &["Emote_GrantedList"];

/// A virtue and the (sometimes irregular) suffix its trait properties use.
pub struct VirtueSpec {
    pub key: &'static str,
    pub name: &'static str,
    suffix: &'static str,
}

impl VirtueSpec {
    pub fn rank_property(&self) -> String {
        format!("Trait_Virtue_Rank_{}", self.suffix)
    }

    pub fn xp_property(&self) -> String {
        format!("Trait_Virtue_XP_{}", self.suffix)
    }
}

pub const VIRTUES: &[VirtueSpec] = &[
    VirtueSpec { key: "CHARITY", name: "Charity", suffix: "Charity" },
    VirtueSpec { key: "COMPASSION", name: "Compassion", suffix: "Compassionate" },
    VirtueSpec { key: "CONFIDENCE", name: "Confidence", suffix: "Confidence" },
    VirtueSpec { key: "DETERMINATION", name: "Determination", suffix: "Determination" },
    VirtueSpec { key: "DISCIPLINE", name: "Discipline", suffix: "Discipline" },
    VirtueSpec { key: "EMPATHY", name: "Empathy", suffix: "Empathy" },
    VirtueSpec { key: "FIDELITY", name: "Fidelity", suffix: "Fidelity" },
    VirtueSpec { key: "FORTITUDE", name: "Fortitude", suffix: "Fortitude" },
    VirtueSpec { key: "HONESTY", name: "Honesty", suffix: "Honesty" },
    VirtueSpec { key: "HONOUR", name: "Honour", suffix: "Honour" },
    VirtueSpec { key: "IDEALISM", name: "Idealism", suffix: "Idealism" },
    VirtueSpec { key: "INNOCENCE", name: "Innocence", suffix: "Innocence" },
    VirtueSpec { key: "JUSTICE", name: "Justice", suffix: "Just" },
    VirtueSpec { key: "LOYALTY", name: "Loyalty", suffix: "Loyalty" },
    VirtueSpec { key: "MERCY", name: "Mercy", suffix: "Merciful" },
    VirtueSpec { key: "PATIENCE", name: "Patience", suffix: "Patience" },
    VirtueSpec { key: "TOLERANCE", name: "Tolerance", suffix: "Tolerant" },
    VirtueSpec { key: "VALOUR", name: "Valour", suffix: "Valor" },
    VirtueSpec { key: "WISDOM", name: "Wisdom", suffix: "Wisdom" },
    VirtueSpec { key: "WIT", name: "Wit", suffix: "Wit" },
    VirtueSpec { key: "ZEAL", name: "Zeal", suffix: "Zeal" },
];

/// A reputation faction and the property prefix its tier and reputation
/// values hang off.
pub struct FactionSpec {
    pub key: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    prefix: &'static str,
}

impl FactionSpec {
    pub fn tier_property(&self) -> String {
        format!("{}_CurrentTier", self.prefix)
    }

    pub fn reputation_property(&self) -> String {
        format!("{}_EarnedReputation", self.prefix)
    }
}

pub const FACTIONS: &[FactionSpec] = &[
    FactionSpec { key: "BREE", name: "Men of Bree", category: "Eriador", prefix: "Reputation_Faction_Breeland_Men" },
    FactionSpec { key: "SHIRE", name: "The Mathom Society", category: "Eriador", prefix: "Reputation_Faction_Shire_Mathoms" },
    FactionSpec { key: "DWARVES", name: "Thorin's Hall", category: "Eriador", prefix: "Reputation_Faction_Eredluin_Dwarves" },
    FactionSpec { key: "EGLAIN", name: "The Eglain", category: "Eriador", prefix: "Reputation_Faction_Lonelands_Eglain" },
    FactionSpec { key: "ESTELDIN", name: "Rangers of Esteldín", category: "Eriador", prefix: "Reputation_Faction_Northdowns_Esteldin" },
    FactionSpec { key: "RIVENDELL", name: "Elves of Rivendell", category: "Eriador", prefix: "Reputation_Faction_Rivendell_Elves" },
    FactionSpec { key: "ANNUMINAS", name: "The Wardens of Annúminas", category: "Eriador", prefix: "Reputation_Faction_Evendim_Rangers" },
    FactionSpec { key: "COUNCIL_OF_THE_NORTH", name: "Council of the North", category: "Eriador", prefix: "Reputation_Faction_Angmar_Free_People" },
    FactionSpec { key: "LOSSOTH", name: "Lossoth of Forochel", category: "Eriador", prefix: "Reputation_Faction_Forochel_Lossoth" },
    FactionSpec { key: "MORIA_GUARDS", name: "Iron Garrison Guards", category: "Rhovanion", prefix: "Reputation_Faction_Moria_Dwarves_Fast" },
    FactionSpec { key: "MORIA_MINERS", name: "Iron Garrison Miners", category: "Rhovanion", prefix: "Reputation_Faction_Moria_Dwarves_Slow" },
    FactionSpec { key: "GALADHRIM", name: "Galadhrim", category: "Rhovanion", prefix: "Reputation_Faction_Lorien_Elves" },
    FactionSpec { key: "MALLEDHRIM", name: "Malledhrim", category: "Rhovanion", prefix: "Reputation_Faction_Mirkwood_Offensive" },
    FactionSpec { key: "ELVES_OF_FELEGOTH", name: "Elves of Felegoth", category: "Rhovanion", prefix: "Reputation_Faction_Mirkwood_North_Elves" },
    FactionSpec { key: "MEN_OF_DALE", name: "Men of Dale", category: "Rhovanion", prefix: "Reputation_Faction_Mirkwood_North_Men" },
    FactionSpec { key: "DWARVES_OF_EREBOR", name: "Dwarves of Erebor", category: "Rhovanion", prefix: "Reputation_Faction_Mirkwood_North_Dwarves" },
    FactionSpec { key: "GREY_MOUNTAINS_EXPEDITION", name: "Grey Mountains Expedition", category: "Rhovanion", prefix: "Reputation_Faction_Dwarfholds_Eredmithrin" },
    FactionSpec { key: "WILDERFOLK", name: "Wilderfolk", category: "Rhovanion", prefix: "Reputation_Faction_Vales_Of_Anduin" },
    FactionSpec { key: "ALGRAIG", name: "Algraig, Men of Enedwaith", category: "Dunland", prefix: "Reputation_Faction_Enedwaith_Dunlendings" },
    FactionSpec { key: "GREY_COMPANY", name: "The Grey Company", category: "Dunland", prefix: "Reputation_Faction_Enedwaith_Grey_Company" },
    FactionSpec { key: "DUNLAND", name: "Men of Dunland", category: "Dunland", prefix: "Reputation_Faction_Dunland_Dunlendings" },
    FactionSpec { key: "THEODRED_RIDERS", name: "Théodred's Riders", category: "Dunland", prefix: "Reputation_Faction_Dunland_Theodred" },
    FactionSpec { key: "STANGARD_RIDERS", name: "The Riders of Stangard", category: "Rohan", prefix: "Reputation_Faction_Greatriver_Stangard" },
    FactionSpec { key: "WOLD", name: "Men of the Wold", category: "Rohan", prefix: "Reputation_Faction_Rohan_Wold" },
    FactionSpec { key: "NORCROFTS", name: "Men of the Norcrofts", category: "Rohan", prefix: "Reputation_Faction_Rohan_Norcrofts" },
    FactionSpec { key: "ENTWASH_VALE", name: "Men of the Entwash Vale", category: "Rohan", prefix: "Reputation_Faction_Rohan_Entwashvale" },
    FactionSpec { key: "SUTCROFTS", name: "Men of the Sutcrofts", category: "Rohan", prefix: "Reputation_Faction_Rohan_Sutcrofts" },
    FactionSpec { key: "EORLINGAS", name: "The Eorlingas", category: "Rohan", prefix: "Reputation_Faction_Rohan_West_Eorlingas" },
    FactionSpec { key: "HELMINGAS", name: "The Helmingas", category: "Rohan", prefix: "Reputation_Faction_Rohan_West_Helmingas" },
    FactionSpec { key: "FANGORN", name: "The Ents of Fangorn Forest", category: "Rohan", prefix: "Reputation_Faction_Rohan_West_Fangorn" },
    FactionSpec { key: "PEOPLE_WILDERMORE", name: "People of Wildermore", category: "Rohan", prefix: "Reputation_Faction_Wildermore_Basic" },
    FactionSpec { key: "DOL_AMROTH", name: "Dol Amroth", category: "Gondor", prefix: "Reputation_Faction_Gondor_West_Amroth" },
    FactionSpec { key: "PELARGIR", name: "Pelargir", category: "Gondor", prefix: "Reputation_Faction_Gondor_Central_Pelargir" },
    FactionSpec { key: "RANGERS_ITHILIEN", name: "Rangers of Ithilien", category: "Gondor", prefix: "Reputation_Faction_Gondor_East_Rangers" },
    FactionSpec { key: "MINAS_TIRITH", name: "Defenders of Minas Tirith", category: "Gondor", prefix: "Reputation_Faction_Gondor_Minas_Tirith" },
    FactionSpec { key: "HOST_OF_THE_WEST", name: "Host of the West", category: "Mordor", prefix: "Reputation_Faction_Mountains_Shadow_Host_West" },
    FactionSpec { key: "GORGOROTH", name: "Conquest of Gorgoroth", category: "Mordor", prefix: "Reputation_Faction_Mordor_Gorgoroth" },
];

/// A crafting profession; property names derive from the display name.
pub struct ProfessionSpec {
    pub key: &'static str,
    pub name: &'static str,
}

impl ProfessionSpec {
    pub fn enabled_property(&self) -> String {
        format!("Craft_{}_Enabled", self.name)
    }

    pub fn proficiency_property(&self) -> String {
        format!("Craft_{}_ProficiencyLevel", self.name)
    }

    pub fn mastery_property(&self) -> String {
        format!("Craft_{}_MasteryLevel", self.name)
    }

    pub fn proficiency_xp_property(&self) -> String {
        format!("Craft_{}_ProficiencyXP", self.name)
    }

    pub fn mastery_xp_property(&self) -> String {
        format!("Craft_{}_MasteryXP", self.name)
    }
}

pub const PROFESSIONS: &[ProfessionSpec] = &[
    ProfessionSpec { key: "SCHOLAR", name: "Scholar" },
    ProfessionSpec { key: "METALSMITH", name: "Metalsmith" },
    ProfessionSpec { key: "JEWELLER", name: "Jeweller" },
    ProfessionSpec { key: "TAILOR", name: "Tailor" },
    ProfessionSpec { key: "WEAPONSMITH", name: "Weaponsmith" },
    ProfessionSpec { key: "WOODWORKER", name: "Woodworker" },
    ProfessionSpec { key: "COOK", name: "Cook" },
    ProfessionSpec { key: "FARMER", name: "Farmer" },
    ProfessionSpec { key: "FORESTER", name: "Forester" },
    ProfessionSpec { key: "PROSPECTOR", name: "Prospector" },
];

/// An equipment slot and its slot-cache property.
pub struct SlotSpec {
    pub key: &'static str,
    pub property: &'static str,
}

pub const EQUIPMENT_SLOTS: &[SlotSpec] = &[
    SlotSpec { key: "HEAD", property: "Inventory_SlotCache_Eq_Head" },
    SlotSpec { key: "SHOULDERS", property: "Inventory_SlotCache_Eq_Shoulder" },
    SlotSpec { key: "CHEST", property: "Inventory_SlotCache_Eq_Chest" },
    SlotSpec { key: "HANDS", property: "Inventory_SlotCache_Eq_Gloves" },
    SlotSpec { key: "LEGS", property: "Inventory_SlotCache_Eq_Legs" },
    SlotSpec { key: "FEET", property: "Inventory_SlotCache_Eq_Boots" },
    SlotSpec { key: "BACK", property: "Inventory_SlotCache_Eq_Back" },
    SlotSpec { key: "MAIN_HAND", property: "Inventory_SlotCache_Eq_Weapon_Primary" },
    SlotSpec { key: "OFF_HAND", property: "Inventory_SlotCache_Eq_Weapon_Secondary" },
    SlotSpec { key: "RANGED", property: "Inventory_SlotCache_Eq_RangedWeapon" },
    SlotSpec { key: "POCKET", property: "Inventory_SlotCache_Eq_Pocket1" },
    SlotSpec { key: "EAR1", property: "Inventory_SlotCache_Eq_Earring1" },
    SlotSpec { key: "EAR2", property: "Inventory_SlotCache_Eq_Earring2" },
    SlotSpec { key: "NECK", property: "Inventory_SlotCache_Eq_Necklace" },
    SlotSpec { key: "WRIST1", property: "Inventory_SlotCache_Eq_Bracelet1" },
    SlotSpec { key: "WRIST2", property: "Inventory_SlotCache_Eq_Bracelet2" },
    SlotSpec { key: "RING1", property: "Inventory_SlotCache_Eq_Ring1" },
    SlotSpec { key: "RING2", property: "Inventory_SlotCache_Eq_Ring2" },
    SlotSpec { key: "CLASS_SLOT", property: "Inventory_SlotCache_Eq_Class" },
    SlotSpec { key: "CRAFT_TOOL", property: "Inventory_SlotCache_Eq_CraftTool" },
];

/// A wallet currency and its property name.
pub struct CurrencySpec {
    pub key: &'static str,
    pub property: &'static str,
}

pub const WALLET_CURRENCIES: &[CurrencySpec] = &[
    CurrencySpec { key: "Marks", property: "Wallet_Currency_Marks" },
    CurrencySpec { key: "Medallions", property: "Wallet_Currency_Medallions" },
    CurrencySpec { key: "Seals", property: "Wallet_Currency_Seals" },
    CurrencySpec { key: "MithrilCoins", property: "Wallet_Currency_MithrilCoins" },
    CurrencySpec { key: "Commendations", property: "Wallet_Currency_Commendations" },
    CurrencySpec { key: "SkirmishMarks", property: "Wallet_Currency_Skirmish_Marks" },
    CurrencySpec { key: "FateTokens", property: "Wallet_Currency_Fate_Tokens" },
    CurrencySpec { key: "HobbitPresents", property: "Wallet_Currency_Hobbit_Presents" },
    CurrencySpec { key: "SilverTokens", property: "Wallet_Currency_Silver_Tokens" },
    CurrencySpec { key: "GiftMathoms", property: "Wallet_Currency_Gift_Mathom" },
    CurrencySpec { key: "CraftingGuild", property: "Wallet_Currency_Crafting_Guild" },
    CurrencySpec { key: "AnniversaryTokens", property: "Wallet_Currency_AnniversaryTokens" },
    CurrencySpec { key: "FestivalTokens", property: "Wallet_Currency_FestivalTokens" },
    CurrencySpec { key: "Figments", property: "Wallet_Currency_Figments" },
    CurrencySpec { key: "MoriaShards", property: "Wallet_Currency_MoriaShards" },
];

/// Resolve the first candidate name the registry knows; −1 when none hit.
pub fn resolve_first(registry: &PropertyRegistry, candidates: &[&str], what: &str) -> i64 {
    for name in candidates {
        let id = registry.id_of(name);
        if id != -1 {
            debug!("{} resolved: '{}' = {}", what, name, id);
            return id;
        }
    }
    warn!("{} not resolved; tried {:?}", what, candidates);
    -1
}

/// Ids of the core snapshot properties, resolved once per registry.
#[derive(Debug, Clone)]
pub struct ResolvedProperties {
    pub name: i64,
    pub level: i64,
    pub class: i64,
    pub race: i64,
    pub morale: i64,
    pub power: i64,
    pub money: i64,
    pub destiny_points: i64,
    pub account_name: i64,
    pub subscription_key: i64,
    pub account_type: i64,
    pub active_title: i64,
    pub granted_emotes: i64,
}

impl ResolvedProperties {
    pub fn resolve(registry: &PropertyRegistry) -> Self {
        let resolved = Self {
            name: resolve_first(registry, NAME_CANDIDATES, "Name"),
            level: resolve_first(registry, LEVEL_CANDIDATES, "Level"),
            class: resolve_first(registry, CLASS_CANDIDATES, "Class"),
            race: resolve_first(registry, RACE_CANDIDATES, "Race"),
            morale: resolve_first(registry, MORALE_CANDIDATES, "Morale"),
            power: resolve_first(registry, POWER_CANDIDATES, "Power"),
            money: resolve_first(registry, MONEY_CANDIDATES, "Money"),
            destiny_points: resolve_first(registry, DESTINY_POINTS_CANDIDATES, "DestinyPoints"),
            account_name: resolve_first(registry, ACCOUNT_NAME_CANDIDATES, "AccountName"),
            subscription_key: resolve_first(
                registry,
                SUBSCRIPTION_KEY_CANDIDATES,
                "SubscriptionKey",
            ),
            account_type: resolve_first(registry, ACCOUNT_TYPE_CANDIDATES, "AccountType"),
            active_title: resolve_first(registry, ACTIVE_TITLE_CANDIDATES, "ActiveTitle"),
            granted_emotes: resolve_first(registry, GRANTED_EMOTES_CANDIDATES, "GrantedEmotes"),
        };
        info!(
            "Resolved core properties: name={}, level={}, class={}, race={}, money={}",
            resolved.name, resolved.level, resolved.class, resolved.race, resolved.money
        );
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::PropertyRegistry;
    use crate::dat::PropertyDef;

    #[test]
    fn test_resolve_first_prefers_earlier_candidates() {
        let registry = PropertyRegistry::from_defs([
            PropertyDef::named(1, "Level".into()),
            PropertyDef::named(2, "Advancement_Level".into()),
        ]);
        assert_eq!(resolve_first(&registry, LEVEL_CANDIDATES, "Level"), 2);
    }

    #[test]
    fn test_resolve_first_misses_with_minus_one() {
        let registry = PropertyRegistry::from_defs([]);
        assert_eq!(resolve_first(&registry, NAME_CANDIDATES, "Name"), -1);
    }

    #[test]
    fn test_virtue_property_names_use_irregular_suffixes() {
        let compassion = VIRTUES.iter().find(|v| v.key == "COMPASSION").unwrap();
        assert_eq!(compassion.rank_property(), "Trait_Virtue_Rank_Compassionate");
        assert_eq!(compassion.xp_property(), "Trait_Virtue_XP_Compassionate");

        let justice = VIRTUES.iter().find(|v| v.key == "JUSTICE").unwrap();
        assert_eq!(justice.rank_property(), "Trait_Virtue_Rank_Just");

        let valour = VIRTUES.iter().find(|v| v.key == "VALOUR").unwrap();
        assert_eq!(valour.rank_property(), "Trait_Virtue_Rank_Valor");
    }

    #[test]
    fn test_catalogue_sizes() {
        assert_eq!(VIRTUES.len(), 21);
        assert_eq!(FACTIONS.len(), 37);
        assert_eq!(PROFESSIONS.len(), 10);
        assert_eq!(EQUIPMENT_SLOTS.len(), 20);
        assert_eq!(WALLET_CURRENCIES.len(), 15);
    }

    #[test]
    fn test_faction_property_names() {
        let bree = &FACTIONS[0];
        assert_eq!(
            bree.tier_property(),
            "Reputation_Faction_Breeland_Men_CurrentTier"
        );
        assert_eq!(
            bree.reputation_property(),
            "Reputation_Faction_Breeland_Men_EarnedReputation"
        );
    }

    #[test]
    fn test_profession_property_names() {
        let scholar = &PROFESSIONS[0];
        assert_eq!(scholar.enabled_property(), "Craft_Scholar_Enabled");
        assert_eq!(scholar.mastery_property(), "Craft_Scholar_MasteryLevel");
        assert_eq!(
            scholar.proficiency_xp_property(),
            "Craft_Scholar_ProficiencyXP"
        );
    }
}
