use crate::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Highest generation number the engine accepts.
pub const MAX_GENERATION: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GenerationNumber(u8);

impl GenerationNumber {
    pub fn new(num: u8) -> Option<Self> {
        (1..=MAX_GENERATION).contains(&num).then_some(GenerationNumber(num))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The next newer generation, if any.
    pub fn newer(self) -> Option<Self> {
        GenerationNumber::new(self.0 + 1)
    }
}

impl TryFrom<u8> for GenerationNumber {
    type Error = String;

    fn try_from(num: u8) -> Result<Self, Self::Error> {
        GenerationNumber::new(num)
            .ok_or_else(|| format!("generation must be within 1..={}, got {}", MAX_GENERATION, num))
    }
}

impl From<GenerationNumber> for u8 {
    fn from(num: GenerationNumber) -> Self {
        num.0
    }
}

impl fmt::Display for GenerationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Languages a text layer can be published in.
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
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    De,
    En,
    Es,
    Fr,
    Hi,
    It,
    Ja,
    Nl,
    Pl,
    Pt,
    Ru,
    Tr,
    Tw,
    Zh,
}

/// Names a mod, e.g. `"Mix And Mega"` becomes `mixandmega`.
pub type ModId = Identifier;
