//! Layer chain composition.
//!
//! A dataset for `(generation, mod, languages)` is built as:
//!
//! 1. the newest generation's snapshot, folded with each older generation's
//!    delta down to the requested one;
//! 2. species details, only when asked for: the details snapshot folded with
//!    older details deltas the same way, laid over the result of step 1;
//! 3. the mod's delta for that generation, if any;
//! 4. one text layer per requested language, in sorted order.
//!
//! Each step's result is cached under its own key, so a mod or language view
//! reuses the plain generation dataset, and a plain generation reuses the
//! nearest newer generation that is already cached instead of starting from
//! the snapshot again. The fold is the same either way, so the result does not
//! depend on what was requested before.

mod cache;
mod text;

pub use cache::CompositionCache;
pub use text::TEXT_FIELDS;

use crate::errors::{ComposeError, ComposeResult};
use crate::layer::{Layer, LayerId, LayerRef, RecordPatch, RecordSet};
use crate::manifest::Manifest;
use crate::overlay::Combiner;
use crate::value::{Fields, Value};
use indexmap::IndexMap;
use schema::{DataKind, GenerationNumber, Identifier, Language, ModId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Identifies one composed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositionKey {
    pub generation: GenerationNumber,
    pub mod_id: Option<ModId>,
    pub languages: BTreeSet<Language>,
    pub details: bool,
}

impl CompositionKey {
    pub fn new(generation: GenerationNumber) -> Self {
        CompositionKey {
            generation,
            mod_id: None,
            languages: BTreeSet::new(),
            details: false,
        }
    }

    pub fn with_mod(mut self, mod_id: ModId) -> Self {
        self.mod_id = Some(mod_id);
        self
    }

    pub fn with_languages(mut self, languages: impl IntoIterator<Item = Language>) -> Self {
        self.languages.extend(languages);
        self
    }

    pub fn with_details(mut self) -> Self {
        self.details = true;
        self
    }

    /// The key this one is built on: languages are stripped first, then the
    /// mod, then details.
    fn parent(&self) -> Option<CompositionKey> {
        if !self.languages.is_empty() {
            Some(CompositionKey {
                languages: BTreeSet::new(),
                ..self.clone()
            })
        } else if self.mod_id.is_some() {
            Some(CompositionKey {
                mod_id: None,
                ..self.clone()
            })
        } else if self.details {
            Some(CompositionKey::new(self.generation))
        } else {
            None
        }
    }
}

impl fmt::Display for CompositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.generation)?;
        if self.details {
            write!(f, "(details)")?;
        }
        if let Some(mod_id) = &self.mod_id {
            write!(f, "+{}", mod_id)?;
        }
        for language in &self.languages {
            write!(f, "[{}]", language)?;
        }
        Ok(())
    }
}

/// Where the composer gets already-loaded layers from.
pub trait LayerSource {
    fn layer(&self, id: &LayerId) -> Option<Arc<Layer>>;
}

impl LayerSource for HashMap<LayerId, Arc<Layer>> {
    fn layer(&self, id: &LayerId) -> Option<Arc<Layer>> {
        self.get(id).cloned()
    }
}

/// A fully folded record set for one key. Contains no removals and no
/// deletion sentinels at any depth; records keep the order of the final fold.
/// Species details are only present when the key asks for them.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    key: CompositionKey,
    kinds: BTreeMap<DataKind, IndexMap<Identifier, Arc<Fields>>>,
}

impl Dataset {
    fn finalize(key: CompositionKey, layer: Layer) -> Self {
        let (_, layer_kinds) = layer.into_parts();
        let kinds = layer_kinds
            .into_iter()
            .filter(|(kind, _)| key.details || *kind != DataKind::Details)
            .map(|(kind, records)| {
                let records = records
                    .into_iter()
                    .filter_map(|(id, patch)| match patch {
                        RecordPatch::Fields(fields) if fields.values().any(Value::contains_delete) => {
                            let kept = fields
                                .iter()
                                .filter(|(_, v)| !v.is_delete())
                                .map(|(k, v)| (k.clone(), v.clone().without_deletes()))
                                .collect();
                            Some((id, Arc::new(kept)))
                        }
                        RecordPatch::Fields(fields) => Some((id, fields)),
                        RecordPatch::Removed => None,
                    })
                    .collect();
                (kind, records)
            })
            .collect();
        Dataset { key, kinds }
    }

    pub fn key(&self) -> &CompositionKey {
        &self.key
    }

    pub fn get(&self, kind: DataKind, id: &str) -> Option<&Arc<Fields>> {
        self.kinds.get(&kind)?.get(id)
    }

    pub fn records(&self, kind: DataKind) -> impl Iterator<Item = (&Identifier, &Arc<Fields>)> {
        self.kinds.get(&kind).into_iter().flat_map(|records| records.iter())
    }

    pub fn get_index(&self, kind: DataKind, index: usize) -> Option<(&Identifier, &Arc<Fields>)> {
        self.kinds.get(&kind)?.get_index(index)
    }

    pub fn len(&self, kind: DataKind) -> usize {
        self.kinds.get(&kind).map_or(0, |records| records.len())
    }

    /// View this dataset as a layer so it can seed a further fold.
    pub fn to_layer(&self) -> Layer {
        let kinds = self
            .kinds
            .iter()
            .map(|(kind, records)| {
                let set: RecordSet = records
                    .iter()
                    .map(|(id, fields)| (id.clone(), RecordPatch::Fields(Arc::clone(fields))))
                    .collect();
                (*kind, set)
            })
            .collect();
        Layer::from_parts(self.key.to_string(), kinds)
    }
}

/// Folds layer chains into datasets, through a [`CompositionCache`].
#[derive(Debug)]
pub struct Composer {
    manifest: Arc<Manifest>,
    combiner: Combiner,
    cache: CompositionCache,
}

impl Composer {
    pub fn new(manifest: Arc<Manifest>) -> Self {
        Composer {
            manifest,
            combiner: Combiner::new(),
            cache: CompositionCache::new(),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of pairwise combinations run so far.
    pub fn combinations(&self) -> u64 {
        self.combiner.combinations()
    }

    pub fn cached(&self, key: &CompositionKey) -> Option<Arc<Dataset>> {
        self.cache.get(key)
    }

    /// Drop every cached dataset.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Compose the dataset for `key`, or return the cached one.
    ///
    /// Fails atomically: on error nothing is cached for `key` and a later call
    /// composes again.
    pub fn compose(&self, source: &dyn LayerSource, key: &CompositionKey) -> ComposeResult<Arc<Dataset>> {
        self.manifest.check(key)?;
        self.cache
            .get_or_try_insert_with(key, || self.build(source, key))
    }

    /// Layers that composing `key` would read, given what is already cached.
    pub fn plan(&self, key: &CompositionKey) -> ComposeResult<Vec<LayerRef>> {
        self.manifest.check(key)?;

        let mut ids = Vec::new();
        let mut next = Some(key.clone());
        while let Some(current) = next {
            if self.cache.get(&current).is_some() {
                break;
            }
            if !current.languages.is_empty() {
                ids.extend(
                    current
                        .languages
                        .iter()
                        .map(|language| LayerId::Text(current.generation, *language)),
                );
            } else if let Some(mod_id) = &current.mod_id {
                ids.push(LayerId::Mod(current.generation, mod_id.clone()));
            } else if current.details {
                let newest = self.newest(current.generation)?;
                ids.push(LayerId::Details(newest));
                ids.extend(
                    self.manifest
                        .deltas_between(current.generation, newest)
                        .map(LayerId::Details),
                );
            } else {
                let (start, reused) = self.chain_start(current.generation)?;
                if reused.is_none() {
                    ids.push(LayerId::Generation(start));
                }
                ids.extend(
                    self.manifest
                        .deltas_between(current.generation, start)
                        .map(LayerId::Generation),
                );
            }
            next = current.parent();
        }

        ids.into_iter().map(|id| self.manifest.layer_ref(&id)).collect()
    }

    fn build(&self, source: &dyn LayerSource, key: &CompositionKey) -> ComposeResult<Dataset> {
        let layer = match key.parent() {
            Some(parent) => {
                let base = self.compose(source, &parent)?;
                if !key.languages.is_empty() {
                    self.apply_text(source, key, &base)?
                } else if key.mod_id.is_some() {
                    self.apply_mod(source, key, &base)?
                } else {
                    self.apply_details(source, key, &base)?
                }
            }
            None => self.build_generation(source, key.generation)?,
        };

        let dataset = Dataset::finalize(key.clone(), layer);
        info!(key = %key, "composed dataset");
        Ok(dataset)
    }

    fn apply_mod(
        &self,
        source: &dyn LayerSource,
        key: &CompositionKey,
        base: &Dataset,
    ) -> ComposeResult<Layer> {
        let Some(mod_id) = &key.mod_id else {
            return Ok(base.to_layer());
        };
        let delta = load(source, &LayerId::Mod(key.generation, mod_id.clone()))?;
        debug!(key = %key, layer = delta.name(), "folding mod layer");
        self.combiner.combine(&base.to_layer(), &delta)
    }

    fn apply_details(
        &self,
        source: &dyn LayerSource,
        key: &CompositionKey,
        base: &Dataset,
    ) -> ComposeResult<Layer> {
        let newest = self.newest(key.generation)?;
        let mut details = details_layer(load(source, &LayerId::Details(newest))?)?;
        for delta_gen in self.manifest.deltas_between(key.generation, newest) {
            let delta = details_layer(load(source, &LayerId::Details(delta_gen))?)?;
            debug!(generation = %delta_gen, "folding details delta");
            details = Arc::new(self.combiner.combine(&details, &delta)?);
        }
        self.combiner.combine(&base.to_layer(), &details)
    }

    fn apply_text(
        &self,
        source: &dyn LayerSource,
        key: &CompositionKey,
        base: &Dataset,
    ) -> ComposeResult<Layer> {
        let mut layer = base.to_layer();
        for language in &key.languages {
            let texts = load(source, &LayerId::Text(key.generation, *language))?;
            debug!(key = %key, language = %language, "folding text layer");
            layer = text::apply(&layer, *language, &texts)?;
        }
        Ok(layer)
    }

    fn build_generation(
        &self,
        source: &dyn LayerSource,
        generation: GenerationNumber,
    ) -> ComposeResult<Layer> {
        let (start, reused) = self.chain_start(generation)?;
        let mut layer = match reused {
            Some(dataset) => {
                debug!(from = %start, to = %generation, "reusing cached generation as base");
                dataset.to_layer()
            }
            None => Layer::clone(&*load(source, &LayerId::Generation(start))?),
        };

        for delta_gen in self.manifest.deltas_between(generation, start) {
            let delta = load(source, &LayerId::Generation(delta_gen))?;
            debug!(generation = %delta_gen, "folding generation delta");
            layer = self.combiner.combine(&layer, &delta)?;
        }
        Ok(layer)
    }

    /// Where the chain for `generation` starts: the nearest cached newer
    /// generation if there is one, otherwise the newest snapshot.
    fn chain_start(
        &self,
        generation: GenerationNumber,
    ) -> ComposeResult<(GenerationNumber, Option<Arc<Dataset>>)> {
        for newer in self.manifest.newer_than(generation) {
            if let Some(dataset) = self.cache.get(&CompositionKey::new(newer)) {
                return Ok((newer, Some(dataset)));
            }
        }
        Ok((self.newest(generation)?, None))
    }

    fn newest(&self, generation: GenerationNumber) -> ComposeResult<GenerationNumber> {
        self.manifest
            .newest()
            .ok_or(ComposeError::UnknownGeneration(generation))
    }
}

/// A details layer may only carry the `details` collection.
fn details_layer(layer: Arc<Layer>) -> ComposeResult<Arc<Layer>> {
    let stray = layer
        .kinds()
        .map(|(kind, _)| kind)
        .find(|kind| *kind != DataKind::Details);
    match stray {
        Some(kind) => Err(ComposeError::MalformedLayer {
            layer: layer.name().to_string(),
            details: format!("details layer carries '{}' records", kind),
        }),
        None => Ok(layer),
    }
}

fn load(source: &dyn LayerSource, id: &LayerId) -> ComposeResult<Arc<Layer>> {
    source
        .layer(id)
        .ok_or_else(|| ComposeError::MissingLayer(id.clone()))
}
