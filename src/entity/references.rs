use crate::value::{Fields, Value};
use schema::{DataKind, Identifier};

/// How a reference field stores its identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// A single identifier string.
    One,
    /// A list of identifier strings.
    Many,
    /// An object whose values are identifiers, e.g. ability slots `0`, `1`, `H`.
    Slots,
    /// An object keyed by identifiers, e.g. a type's `damageTaken` table.
    Keys,
}

/// A field whose raw value names records of another (or the same) kind.
///
/// `name` is a dotted path for references nested inside an object field,
/// e.g. `zMove.user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    pub name: &'static str,
    pub target: DataKind,
    pub arity: Arity,
}

const fn reference(name: &'static str, target: DataKind, arity: Arity) -> ReferenceField {
    ReferenceField {
        name,
        target,
        arity,
    }
}

const ITEM_REFERENCES: &[ReferenceField] = &[
    reference("forcedForme", DataKind::Species, Arity::One),
    reference("megaEvolves", DataKind::Species, Arity::One),
    reference("megaStone", DataKind::Species, Arity::One),
    reference("naturalGift.type", DataKind::Type, Arity::One),
    reference("onDrive", DataKind::Type, Arity::One),
    reference("onMemory", DataKind::Type, Arity::One),
    reference("onPlate", DataKind::Type, Arity::One),
    reference("zMove.type", DataKind::Type, Arity::One),
    reference("zMove.move", DataKind::Move, Arity::One),
    reference("zMove.from", DataKind::Move, Arity::One),
    reference("zMove.user", DataKind::Species, Arity::Many),
];

const MOVE_REFERENCES: &[ReferenceField] = &[
    reference("type", DataKind::Type, Arity::One),
    // Either `true` or the one type the move ignores immunity for
    reference("ignoreImmunity", DataKind::Type, Arity::One),
    reference("isZ", DataKind::Item, Arity::One),
    reference("noMetronome", DataKind::Move, Arity::Many),
];

const SPECIES_REFERENCES: &[ReferenceField] = &[
    reference("abilities", DataKind::Ability, Arity::Slots),
    reference("baseForme", DataKind::Species, Arity::One),
    reference("baseSpecies", DataKind::Species, Arity::One),
    reference("cosmeticForms", DataKind::Species, Arity::Many),
    reference("evos", DataKind::Species, Arity::Many),
    reference("otherFormes", DataKind::Species, Arity::Many),
    reference("prevo", DataKind::Species, Arity::One),
    reference("requiredAbility", DataKind::Ability, Arity::One),
    reference("requiredItems", DataKind::Item, Arity::Many),
    reference("requiredMove", DataKind::Move, Arity::One),
    reference("types", DataKind::Type, Arity::Many),
];

const TYPE_REFERENCES: &[ReferenceField] = &[
    reference("damageTaken", DataKind::Type, Arity::Keys),
];

const DETAILS_REFERENCES: &[ReferenceField] = &[
    reference("evoDetails.item", DataKind::Item, Arity::One),
    reference("evoDetails.move", DataKind::Move, Arity::One),
    reference("learnset", DataKind::Move, Arity::Keys),
];

/// Reference fields of `kind`, in a fixed order.
pub fn reference_fields(kind: DataKind) -> &'static [ReferenceField] {
    match kind {
        DataKind::Item => ITEM_REFERENCES,
        DataKind::Move => MOVE_REFERENCES,
        DataKind::Species => SPECIES_REFERENCES,
        DataKind::Type => TYPE_REFERENCES,
        DataKind::Details => DETAILS_REFERENCES,
        DataKind::Ability => &[],
    }
}

impl ReferenceField {
    /// The raw value at this field's path, if every step of it is present.
    pub fn value<'a>(&self, fields: &'a Fields) -> Option<&'a Value> {
        let mut path = self.name.split('.');
        let mut value = fields.get(path.next()?)?;
        for step in path {
            value = value.as_object()?.get(step)?;
        }
        Some(value)
    }

    /// Identifiers stored in this field of `fields`, normalized, in stored
    /// order. Values of the wrong shape and empty identifiers are skipped.
    pub fn identifiers<'a>(&self, fields: &'a Fields) -> impl Iterator<Item = Identifier> + 'a {
        let raw: Box<dyn Iterator<Item = &'a str> + 'a> = match (self.arity, self.value(fields)) {
            (Arity::One, Some(Value::Str(id))) => Box::new(std::iter::once(id.as_str())),
            (Arity::Many, Some(Value::List(items))) => Box::new(items.iter().filter_map(Value::as_str)),
            (Arity::Slots, Some(Value::Object(slots))) => {
                Box::new(slots.values().filter_map(Value::as_str))
            }
            (Arity::Keys, Some(Value::Object(table))) => Box::new(table.keys().map(String::as_str)),
            _ => Box::new(std::iter::empty()),
        };
        raw.map(Identifier::normalize).filter(|id| !id.is_empty())
    }
}
