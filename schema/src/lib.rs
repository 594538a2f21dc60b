// Pokedex Layers Schema - Shared type definitions
// This crate contains the identifier and enum vocabulary that is shared between
// the layer engine and anything that produces layer files for it.

// Re-export the main types
pub use data_kind::*;
pub use generation::*;
pub use identifier::*;

pub mod data_kind;
pub mod generation;
pub mod identifier;
