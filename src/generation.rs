use crate::aliases::AliasTable;
use crate::compose::Dataset;
use crate::entity::{
    Ability, DataEntry, Entity, EntityInner, Entry, Item, Move, Species, SpeciesDetails, Type,
};
use parking_lot::RwLock;
use schema::{DataKind, GenerationNumber, Identifier, Language, ModId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) struct GenerationInner {
    dataset: Arc<Dataset>,
    aliases: Arc<AliasTable>,
    /// Strong owner of every entity handed out by this view.
    entities: RwLock<HashMap<(DataKind, Identifier), Arc<EntityInner>>>,
}

impl GenerationInner {
    /// Alias-aware lookup of an identifier.
    pub(crate) fn entity_by_id(self: &Arc<Self>, kind: DataKind, id: &Identifier) -> Option<Entity> {
        self.entity(kind, self.aliases.resolve(kind, id))
    }

    /// Lookup of a canonical identifier, creating the entity on first use.
    fn entity(self: &Arc<Self>, kind: DataKind, id: &Identifier) -> Option<Entity> {
        let cache_key = (kind, id.clone());
        if let Some(inner) = self.entities.read().get(&cache_key) {
            return Some(Entity::from_inner(Arc::clone(inner)));
        }

        let fields = Arc::clone(self.dataset.get(kind, id.as_str())?);
        let mut entities = self.entities.write();
        let inner = entities.entry(cache_key).or_insert_with(|| {
            Arc::new(EntityInner::new(kind, id.clone(), fields, Arc::downgrade(self)))
        });
        Some(Entity::from_inner(Arc::clone(inner)))
    }
}

/// Read-only view of one composed dataset: the entity collections for one
/// `(generation, mod, languages)` combination.
///
/// Cloning is cheap and clones share the same entity instances, so a
/// reference resolved through one clone stays resolved for the others.
#[derive(Clone)]
pub struct Generation {
    inner: Arc<GenerationInner>,
}

impl Generation {
    pub fn new(dataset: Arc<Dataset>, aliases: Arc<AliasTable>) -> Self {
        Generation {
            inner: Arc::new(GenerationInner {
                dataset,
                aliases,
                entities: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<GenerationInner>) -> Self {
        Generation { inner }
    }

    pub fn num(&self) -> GenerationNumber {
        self.inner.dataset.key().generation
    }

    pub fn mod_id(&self) -> Option<&ModId> {
        self.inner.dataset.key().mod_id.as_ref()
    }

    pub fn languages(&self) -> &BTreeSet<Language> {
        &self.inner.dataset.key().languages
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.inner.dataset
    }

    pub fn abilities(&self) -> Collection<Ability> {
        self.collection()
    }

    pub fn items(&self) -> Collection<Item> {
        self.collection()
    }

    pub fn moves(&self) -> Collection<Move> {
        self.collection()
    }

    pub fn species(&self) -> Collection<Species> {
        self.collection()
    }

    pub fn types(&self) -> Collection<Type> {
        self.collection()
    }

    /// Empty unless the view was composed with species details.
    pub fn details(&self) -> Collection<SpeciesDetails> {
        self.collection()
    }

    pub fn has_details(&self) -> bool {
        self.inner.dataset.key().details
    }

    pub fn collection<T: DataEntry>(&self) -> Collection<T> {
        Collection {
            view: Arc::clone(&self.inner),
            _entry: PhantomData,
        }
    }

    /// Untyped lookup by kind and free-form name.
    pub fn get(&self, kind: DataKind, name: &str) -> Option<Entry> {
        self.inner
            .entity_by_id(kind, &Identifier::normalize(name))
            .map(Entry::from)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation")
            .field("key", self.inner.dataset.key())
            .finish()
    }
}

/// The entities of one kind in a [`Generation`].
pub struct Collection<T> {
    view: Arc<GenerationInner>,
    _entry: PhantomData<fn() -> T>,
}

impl<T: DataEntry> Collection<T> {
    /// Look up by free-form name: normalized, then alias-resolved.
    /// Returns `None` for anything not in the dataset.
    pub fn get(&self, name: &str) -> Option<T> {
        self.get_by_id(&Identifier::normalize(name))
    }

    /// Look up by identifier, skipping normalization. Aliases still apply.
    pub fn get_by_id(&self, id: &Identifier) -> Option<T> {
        self.view.entity_by_id(T::KIND, id).map(T::from_entity)
    }

    pub fn len(&self) -> usize {
        self.view.dataset.len(T::KIND)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entity of this kind in dataset order. Each call starts over.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            view: Arc::clone(&self.view),
            index: 0,
            _entry: PhantomData,
        }
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Collection {
            view: Arc::clone(&self.view),
            _entry: PhantomData,
        }
    }
}

impl<T: DataEntry> IntoIterator for &Collection<T> {
    type Item = T;
    type IntoIter = Iter<T>;

    fn into_iter(self) -> Iter<T> {
        self.iter()
    }
}

pub struct Iter<T> {
    view: Arc<GenerationInner>,
    index: usize,
    _entry: PhantomData<fn() -> T>,
}

impl<T: DataEntry> Iterator for Iter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let (id, _) = self.view.dataset.get_index(T::KIND, self.index)?;
        self.index += 1;
        // Dataset ids are already canonical
        let id = id.clone();
        self.view.entity(T::KIND, &id).map(T::from_entity)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.dataset.len(T::KIND).saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
