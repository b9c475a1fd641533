use serde::{Deserialize, Serialize};

/// In-game money, decomposed from the single copper total the client keeps.
///
/// One gold is 1000 silver; one silver is 100 copper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Money {
    pub gold: u32,
    pub silver: u32,
    pub copper: u32,
    /// Raw copper total the parts were derived from.
    pub total_copper: u64,
}

impl Money {
    pub fn from_copper(total: u64) -> Self {
        Self {
            gold: (total / 100_000) as u32,
            silver: ((total / 100) % 1000) as u32,
            copper: (total % 100) as u32,
            total_copper: total,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.total_copper == 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}g {}s {}c", self.gold, self.silver, self.copper)
    }
}
