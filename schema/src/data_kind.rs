use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The kinds of record a layer can carry.
///
/// The strum string form is the collection key used in layer files and alias
/// tables (`"abilities"`, `"items"`, ...).
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
    IntoStaticStr,
    Display,
)]
pub enum DataKind {
    #[strum(serialize = "abilities")]
    Ability,
    #[strum(serialize = "items")]
    Item,
    #[strum(serialize = "moves")]
    Move,
    #[strum(serialize = "species")]
    Species,
    #[strum(serialize = "types")]
    Type,
    /// Per-species details (learnsets, evolution conditions, ...). Only
    /// composed when asked for.
    #[strum(serialize = "details")]
    Details,
}

impl DataKind {
    /// Collection key for this kind, e.g. `"moves"`.
    pub fn key(&self) -> &'static str {
        (*self).into()
    }

    pub fn all() -> impl Iterator<Item = DataKind> {
        DataKind::iter()
    }
}
