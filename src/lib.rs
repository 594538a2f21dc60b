// In: src/lib.rs

//! Pokedex Layer Engine
//!
//! Builds per-generation Pokemon datasets by folding generation deltas, mod
//! overlays and per-language text onto the newest generation's snapshot, and
//! serves them as entity views whose cross references resolve lazily.

// --- MODULE DECLARATIONS ---
// This declares the module hierarchy for the crate.
pub mod aliases;
pub mod compose;
pub mod entity;
pub mod errors;
pub mod generation;
pub mod layer;
pub mod loader;
pub mod manifest;
pub mod overlay;
pub mod registry;
pub mod value;

#[cfg(test)]
mod tests;

// --- PUBLIC API RE-EXPORTS ---
// This section defines the public-facing API of the `pokedex-layers` crate,
// making it easy for users to import the most important types directly.

// --- From the `schema` crate ---
// Identifiers and the closed sets of kinds, generations and languages.
pub use schema::{DataKind, GenerationNumber, Identifier, Language, ModId, MAX_GENERATION};

// --- From this crate's modules (`src/`) ---

// Entry point and views.
pub use generation::{Collection, Generation};
pub use registry::Generations;

// Entities and their typed wrappers.
pub use entity::{Ability, DataEntry, Entity, Entry, Item, Move, Species, SpeciesDetails, Type};

// Composition building blocks.
pub use aliases::AliasTable;
pub use compose::{Composer, CompositionKey, Dataset, LayerSource};
pub use layer::{Layer, LayerId, LayerRef, RecordPatch};
pub use loader::{DirectoryLoader, LayerLoader, LayerStore, MemoryLoader};
pub use manifest::{GenerationEntry, Manifest};
pub use overlay::combine;
pub use value::{Fields, Value};

// Crate-specific error and result types.
pub use errors::{ComposeError, ComposeResult, ConfigError, DexError, DexResult, LoadError, LoadResult};
