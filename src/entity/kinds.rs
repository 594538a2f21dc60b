//! Typed wrappers, one per data kind.
//!
//! Every wrapper derefs to [`Entity`] for the shared fields and adds named
//! accessors for its kind's reference fields. [`Entry`] is the sum of all of
//! them, tagged by [`DataKind`].

use super::Entity;
use crate::value::Value;
use schema::{DataKind, Identifier};
use std::ops::Deref;

/// A typed entity wrapper for one data kind.
pub trait DataEntry: Clone + Sized {
    const KIND: DataKind;

    fn from_entity(entity: Entity) -> Self;

    fn entity(&self) -> &Entity;
}

macro_rules! data_entry {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(Entity);

        impl DataEntry for $name {
            const KIND: DataKind = $kind;

            fn from_entity(entity: Entity) -> Self {
                debug_assert_eq!(entity.kind(), $kind);
                $name(entity)
            }

            fn entity(&self) -> &Entity {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = Entity;

            fn deref(&self) -> &Entity {
                &self.0
            }
        }

        impl From<$name> for Entity {
            fn from(entry: $name) -> Entity {
                entry.0
            }
        }
    };
}

data_entry!(
    /// An ability. Abilities carry no references.
    Ability => DataKind::Ability
);
data_entry!(Item => DataKind::Item);
data_entry!(Move => DataKind::Move);
data_entry!(Species => DataKind::Species);
data_entry!(
    /// An elemental type.
    Type => DataKind::Type
);
data_entry!(
    /// Details of the species with the same identifier.
    SpeciesDetails => DataKind::Details
);

fn typed<T: DataEntry>(entities: Vec<Entity>) -> Vec<T> {
    entities.into_iter().map(T::from_entity).collect()
}

impl Item {
    /// The species that mega evolves holding this item.
    pub fn mega_evolves(&self) -> Option<Species> {
        self.0.resolve_one("megaEvolves").map(Species)
    }

    /// The mega forme this item turns its holder into.
    pub fn mega_stone(&self) -> Option<Species> {
        self.0.resolve_one("megaStone").map(Species)
    }

    pub fn forced_forme(&self) -> Option<Species> {
        self.0.resolve_one("forcedForme").map(Species)
    }

    pub fn on_drive(&self) -> Option<Type> {
        self.0.resolve_one("onDrive").map(Type)
    }

    pub fn on_memory(&self) -> Option<Type> {
        self.0.resolve_one("onMemory").map(Type)
    }

    pub fn on_plate(&self) -> Option<Type> {
        self.0.resolve_one("onPlate").map(Type)
    }

    /// Type of Natural Gift when this berry is consumed.
    pub fn natural_gift_type(&self) -> Option<Type> {
        self.0.resolve_one("naturalGift.type").map(Type)
    }

    /// Type whose moves this Z crystal upgrades.
    pub fn z_move_type(&self) -> Option<Type> {
        self.0.resolve_one("zMove.type").map(Type)
    }

    /// Signature Z move this crystal unlocks.
    pub fn z_move(&self) -> Option<Move> {
        self.0.resolve_one("zMove.move").map(Move)
    }

    /// Move that turns into [`Item::z_move`].
    pub fn z_move_from(&self) -> Option<Move> {
        self.0.resolve_one("zMove.from").map(Move)
    }

    pub fn z_move_users(&self) -> Vec<Species> {
        typed(self.0.resolve("zMove.user"))
    }

    pub fn is_berry(&self) -> bool {
        self.0.field("isBerry").and_then(|v| v.as_bool()).unwrap_or(false)
    }
}

impl Move {
    pub fn move_type(&self) -> Option<Type> {
        self.0.resolve_one("type").map(Type)
    }

    /// The Z crystal that powers this move.
    pub fn z_crystal(&self) -> Option<Item> {
        self.0.resolve_one("isZ").map(Item)
    }

    /// The type this move ignores immunities of, when it names one.
    pub fn ignores_immunity_of(&self) -> Option<Type> {
        self.0.resolve_one("ignoreImmunity").map(Type)
    }

    pub fn no_metronome(&self) -> Vec<Move> {
        typed(self.0.resolve("noMetronome"))
    }

    pub fn base_power(&self) -> Option<i64> {
        self.0.field("basePower").and_then(|v| v.as_i64())
    }
}

impl Species {
    pub fn evos(&self) -> Vec<Species> {
        typed(self.0.resolve("evos"))
    }

    pub fn prevo(&self) -> Option<Species> {
        self.0.resolve_one("prevo").map(Species)
    }

    pub fn base_forme(&self) -> Option<Species> {
        self.0.resolve_one("baseForme").map(Species)
    }

    pub fn base_species(&self) -> Option<Species> {
        self.0.resolve_one("baseSpecies").map(Species)
    }

    pub fn other_formes(&self) -> Vec<Species> {
        typed(self.0.resolve("otherFormes"))
    }

    pub fn cosmetic_forms(&self) -> Vec<Species> {
        typed(self.0.resolve("cosmeticForms"))
    }

    pub fn required_items(&self) -> Vec<Item> {
        typed(self.0.resolve("requiredItems"))
    }

    pub fn required_ability(&self) -> Option<Ability> {
        self.0.resolve_one("requiredAbility").map(Ability)
    }

    pub fn required_move(&self) -> Option<Move> {
        self.0.resolve_one("requiredMove").map(Move)
    }

    pub fn types(&self) -> Vec<Type> {
        typed(self.0.resolve("types"))
    }

    /// Abilities in slot order (`0`, `1`, `H`, `S`).
    pub fn abilities(&self) -> Vec<Ability> {
        typed(self.0.resolve("abilities"))
    }

    /// This species' details, when the view was composed with them.
    pub fn details(&self) -> Option<SpeciesDetails> {
        self.0
            .generation()?
            .collection::<SpeciesDetails>()
            .get_by_id(self.0.id())
    }
}

impl Type {
    /// Attacking types listed in this type's damage table, in table order.
    pub fn damage_taken(&self) -> Vec<Type> {
        typed(self.0.resolve("damageTaken"))
    }

    /// Raw effectiveness entry for attacks of `attacking`.
    pub fn effectiveness(&self, attacking: &Type) -> Option<&Value> {
        entry_for(self.0.field("damageTaken")?, attacking.id())
    }
}

impl SpeciesDetails {
    /// Item involved in evolving into this species.
    pub fn evo_item(&self) -> Option<Item> {
        self.0.resolve_one("evoDetails.item").map(Item)
    }

    /// Move that has to be known to evolve into this species.
    pub fn evo_move(&self) -> Option<Move> {
        self.0.resolve_one("evoDetails.move").map(Move)
    }

    /// Learnable moves, in learnset order.
    pub fn learnset(&self) -> Vec<Move> {
        typed(self.0.resolve("learnset"))
    }

    /// Raw learn sources (`"7M"`, `"8L1"`, ...) for `learned`.
    pub fn learn_sources(&self, learned: &Move) -> Option<&Value> {
        entry_for(self.0.field("learnset")?, learned.id())
    }
}

// Keys of identifier-keyed tables are raw names, e.g. "Fire"
fn entry_for<'a>(table: &'a Value, id: &Identifier) -> Option<&'a Value> {
    table
        .as_object()?
        .iter()
        .find(|(key, _)| Identifier::normalize(key) == *id)
        .map(|(_, value)| value)
}

/// Any entity, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Ability(Ability),
    Item(Item),
    Move(Move),
    Species(Species),
    Type(Type),
    Details(SpeciesDetails),
}

impl Entry {
    pub fn kind(&self) -> DataKind {
        self.entity().kind()
    }

    pub fn entity(&self) -> &Entity {
        match self {
            Entry::Ability(e) => e.entity(),
            Entry::Item(e) => e.entity(),
            Entry::Move(e) => e.entity(),
            Entry::Species(e) => e.entity(),
            Entry::Type(e) => e.entity(),
            Entry::Details(e) => e.entity(),
        }
    }
}

impl From<Entity> for Entry {
    fn from(entity: Entity) -> Self {
        match entity.kind() {
            DataKind::Ability => Entry::Ability(Ability(entity)),
            DataKind::Item => Entry::Item(Item(entity)),
            DataKind::Move => Entry::Move(Move(entity)),
            DataKind::Species => Entry::Species(Species(entity)),
            DataKind::Type => Entry::Type(Type(entity)),
            DataKind::Details => Entry::Details(SpeciesDetails(entity)),
        }
    }
}

impl Deref for Entry {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        self.entity()
    }
}
