//! The manifest says which generations, mods and languages exist and which
//! layer file backs each of them. It is the engine's only configuration and is
//! read once when a [`crate::Generations`] registry is built.
//!
//! ```ron
//! (
//!     aliases: Some("aliases.json"),
//!     generations: [
//!         (num: 6, data: "gen6.json"),
//!         (
//!             num: 7,
//!             data: "gen7.ron",
//!             mods: {"Mix And Mega": "gen7/mixandmega.json"},
//!             languages: {"en": "gen7/text/en.json"},
//!             details: Some("gen7/details.json"),
//!         ),
//!     ],
//! )
//! ```
//!
//! The newest generation's `data` is a full snapshot; every older generation's
//! `data` is a delta that turns the next newer generation into it. `details`
//! follow the same scheme and are optional: a generation can only be composed
//! with details when it and every newer generation publish them.

use crate::compose::CompositionKey;
use crate::errors::{ComposeError, ComposeResult, ConfigError, LoadError, LoadResult};
use crate::layer::{LayerId, LayerRef};
use schema::{GenerationNumber, Language, ModId};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    /// Location of the alias table, if the data set has one.
    #[serde(default)]
    pub aliases: Option<String>,
    /// Oldest first.
    pub generations: Vec<GenerationEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerationEntry {
    pub num: GenerationNumber,
    pub data: String,
    #[serde(default)]
    pub mods: BTreeMap<ModId, String>,
    #[serde(default, deserialize_with = "language_map")]
    pub languages: BTreeMap<Language, String>,
    #[serde(default)]
    pub details: Option<String>,
}

// Language codes are written as plain strings in the manifest
fn language_map<'de, D>(deserializer: D) -> Result<BTreeMap<Language, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(code, path)| {
            Language::from_str(&code)
                .map(|language| (language, path))
                .map_err(|_| serde::de::Error::custom(format!("unknown language '{}'", code)))
        })
        .collect()
}

impl Manifest {
    /// Parse and validate a RON manifest. `source` names it in errors.
    pub fn from_ron(text: &str, source: &str) -> LoadResult<Self> {
        let manifest: Manifest = ron::from_str(text).map_err(|e| LoadError::Ron {
            path: source.to_string(),
            source: e,
        })?;
        Ok(manifest)
    }

    /// Generations must be non-empty and listed oldest first without gaps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generations.is_empty() {
            return Err(ConfigError::EmptyManifest);
        }
        for pair in self.generations.windows(2) {
            let (previous, found) = (pair[0].num, pair[1].num);
            if previous.newer() != Some(found) {
                return Err(ConfigError::GenerationOrder { previous, found });
            }
        }
        Ok(())
    }

    /// The generation whose data is a full snapshot.
    pub fn newest(&self) -> Option<GenerationNumber> {
        self.generations.last().map(|entry| entry.num)
    }

    pub fn entry(&self, generation: GenerationNumber) -> ComposeResult<&GenerationEntry> {
        self.generations
            .iter()
            .find(|entry| entry.num == generation)
            .ok_or(ComposeError::UnknownGeneration(generation))
    }

    /// Generations strictly between `older` (inclusive) and `newer` (exclusive),
    /// newest first: the deltas to fold when walking from `newer` down to `older`.
    pub fn deltas_between(
        &self,
        older: GenerationNumber,
        newer: GenerationNumber,
    ) -> impl Iterator<Item = GenerationNumber> + '_ {
        self.generations
            .iter()
            .rev()
            .map(|entry| entry.num)
            .filter(move |num| *num >= older && *num < newer)
    }

    /// Generations newer than `generation`, oldest first.
    pub fn newer_than(&self, generation: GenerationNumber) -> impl Iterator<Item = GenerationNumber> + '_ {
        self.generations
            .iter()
            .map(|entry| entry.num)
            .filter(move |num| *num > generation)
    }

    /// Check that the generation, mod and every language of `key` are
    /// published, and details too when the key asks for them.
    pub fn check(&self, key: &CompositionKey) -> ComposeResult<()> {
        let generation = key.generation;
        let entry = self.entry(generation)?;
        if let Some(mod_id) = &key.mod_id {
            if !entry.mods.contains_key(mod_id) {
                return Err(ComposeError::UnknownMod {
                    generation,
                    mod_id: mod_id.clone(),
                });
            }
        }
        if let Some(language) = key.languages.iter().find(|l| !entry.languages.contains_key(l)) {
            return Err(ComposeError::UnknownLanguage {
                generation,
                language: *language,
            });
        }
        if key.details {
            let missing = self
                .generations
                .iter()
                .find(|entry| entry.num >= generation && entry.details.is_none());
            if let Some(entry) = missing {
                return Err(ComposeError::DetailsUnavailable(entry.num));
            }
        }
        Ok(())
    }

    /// Resolve a layer id to the location that backs it.
    pub fn layer_ref(&self, id: &LayerId) -> ComposeResult<LayerRef> {
        let path = match id {
            LayerId::Generation(num) => self.entry(*num)?.data.clone(),
            LayerId::Mod(num, mod_id) => self
                .entry(*num)?
                .mods
                .get(mod_id)
                .cloned()
                .ok_or_else(|| ComposeError::UnknownMod {
                    generation: *num,
                    mod_id: mod_id.clone(),
                })?,
            LayerId::Text(num, language) => self
                .entry(*num)?
                .languages
                .get(language)
                .cloned()
                .ok_or(ComposeError::UnknownLanguage {
                    generation: *num,
                    language: *language,
                })?,
            LayerId::Details(num) => self
                .entry(*num)?
                .details
                .clone()
                .ok_or(ComposeError::DetailsUnavailable(*num))?,
        };
        Ok(LayerRef {
            id: id.clone(),
            path,
        })
    }
}
