//! Resolved entities.
//!
//! An [`Entity`] is a read-only view of one record in a composed dataset. Its
//! reference fields (a species' `evos`, an item's `megaEvolves`, ...) hold raw
//! identifiers; they are turned into entities only when read, and each field
//! is resolved at most once per entity instance.
//!
//! Resolved targets are memoized as weak handles. The owning
//! [`Generation`](crate::Generation) keeps the strong ones, so entities that
//! point at each other (an evolution line, a mega stone and its species) never
//! form an ownership cycle.

mod kinds;
mod references;

pub use kinds::{Ability, DataEntry, Entry, Item, Move, Species, SpeciesDetails, Type};
pub use references::{reference_fields, Arity, ReferenceField};

use crate::compose::TEXT_FIELDS;
use crate::generation::{Generation, GenerationInner};
use crate::value::{Fields, Value};
use once_cell::sync::OnceCell;
use schema::{DataKind, Identifier, Language};
use std::fmt;
use std::sync::{Arc, Weak};

type Resolved = Vec<Weak<EntityInner>>;

pub(crate) struct EntityInner {
    kind: DataKind,
    id: Identifier,
    fields: Arc<Fields>,
    view: Weak<GenerationInner>,
    /// One cell per entry of `reference_fields(kind)`, same order.
    references: Box<[OnceCell<Resolved>]>,
}

impl EntityInner {
    pub(crate) fn new(
        kind: DataKind,
        id: Identifier,
        fields: Arc<Fields>,
        view: Weak<GenerationInner>,
    ) -> Self {
        let references = reference_fields(kind).iter().map(|_| OnceCell::new()).collect();
        EntityInner {
            kind,
            id,
            fields,
            view,
            references,
        }
    }
}

/// Cheap, clonable handle to one resolved record.
#[derive(Clone)]
pub struct Entity {
    inner: Arc<EntityInner>,
}

impl Entity {
    pub(crate) fn from_inner(inner: Arc<EntityInner>) -> Self {
        Entity { inner }
    }

    pub fn kind(&self) -> DataKind {
        self.inner.kind
    }

    pub fn id(&self) -> &Identifier {
        &self.inner.id
    }

    /// Display name, falling back to the identifier.
    pub fn name(&self) -> &str {
        self.field("name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.inner.id.as_str())
    }

    pub fn num(&self) -> Option<i64> {
        self.field("num").and_then(Value::as_i64)
    }

    pub fn is_nonstandard(&self) -> Option<&str> {
        self.field("isNonstandard").and_then(Value::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.inner.fields.get(name)
    }

    pub fn fields(&self) -> &Fields {
        &self.inner.fields
    }

    /// The view this entity was looked up in, while it is still alive.
    pub fn generation(&self) -> Option<Generation> {
        self.inner.view.upgrade().map(Generation::from_inner)
    }

    pub fn desc(&self, language: Language) -> Option<&str> {
        self.text(language, "desc")
    }

    pub fn short_desc(&self, language: Language) -> Option<&str> {
        self.text(language, "shortDesc")
    }

    fn text(&self, language: Language, field: &str) -> Option<&str> {
        debug_assert!(TEXT_FIELDS.contains(&field));
        self.field("text")?
            .as_object()?
            .get(language.to_string().as_str())?
            .as_object()?
            .get(field)?
            .as_str()
    }

    /// Entities named by reference field `field`, resolved on first access
    /// and memoized on this instance.
    ///
    /// Identifiers that do not resolve in the view are skipped. Fields that
    /// are not reference fields of this kind yield nothing.
    pub fn resolve(&self, field: &str) -> Vec<Entity> {
        let fields = reference_fields(self.inner.kind);
        let Some(index) = fields.iter().position(|r| r.name == field) else {
            return Vec::new();
        };
        let spec = &fields[index];

        let resolved = self.inner.references[index].get_or_init(|| {
            let Some(view) = self.inner.view.upgrade() else {
                return Vec::new();
            };
            spec.identifiers(&self.inner.fields)
                .filter_map(|id| {
                    let target = view.entity_by_id(spec.target, &id);
                    if target.is_none() {
                        tracing::trace!(
                            kind = %self.inner.kind,
                            id = %self.inner.id,
                            field = spec.name,
                            target = %id,
                            "dangling reference"
                        );
                    }
                    target
                })
                .map(|target| Arc::downgrade(&target.inner))
                .collect()
        });

        resolved
            .iter()
            .filter_map(Weak::upgrade)
            .map(Entity::from_inner)
            .collect()
    }

    /// First entity of a single-valued reference field.
    pub fn resolve_one(&self, field: &str) -> Option<Entity> {
        self.resolve(field).into_iter().next()
    }

    /// Whether `field` has been resolved on this instance yet.
    pub fn is_resolved(&self, field: &str) -> bool {
        reference_fields(self.inner.kind)
            .iter()
            .position(|r| r.name == field)
            .is_some_and(|index| self.inner.references[index].get().is_some())
    }

    /// Every reference field present on the record, resolved. Nested fields
    /// are reported by their dotted path.
    pub fn resolve_references(&self) -> Vec<(&'static str, Vec<Entry>)> {
        reference_fields(self.inner.kind)
            .iter()
            .filter(|spec| spec.value(&self.inner.fields).is_some())
            .map(|spec| {
                let entries = self.resolve(spec.name).into_iter().map(Entry::from).collect();
                (spec.name, entries)
            })
            .collect()
    }

    /// Exportable form: the raw record with identifiers, not entities.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("id".to_string(), self.inner.id.as_str().into());
        map.insert("kind".to_string(), self.inner.kind.key().into());
        for (name, value) in self.inner.fields.iter() {
            map.insert(name.clone(), value.into());
        }
        serde_json::Value::Object(map)
    }

    /// Whether both handles are the same instance from the same view.
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.inner.kind == other.inner.kind
            && self.inner.id == other.inner.id
            && self.inner.fields == other.inner.fields
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.inner.kind)
            .field("id", &self.inner.id)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
