use crate::aliases::AliasTable;
use crate::compose::{Composer, CompositionKey};
use crate::errors::DexResult;
use crate::generation::Generation;
use crate::loader::{LayerLoader, LayerStore};
use crate::manifest::Manifest;
use schema::{GenerationNumber, Language, ModId};
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point: hands out [`Generation`] views for any published
/// `(generation, mod, languages)` combination.
///
/// Layers are fetched through the loader on first need and composed datasets
/// are cached, so requesting the same combination again (or concurrently)
/// does no further loading or folding. Views built from the same cached
/// dataset are independent; entity identity is per view.
pub struct Generations<L> {
    loader: L,
    layers: LayerStore,
    composer: Composer,
    aliases: Arc<AliasTable>,
}

impl<L: LayerLoader> Generations<L> {
    /// Validate the manifest and load the alias table. Nothing else is read
    /// until a generation is requested.
    pub async fn new(manifest: Manifest, loader: L) -> DexResult<Self> {
        manifest.validate()?;
        let aliases = match &manifest.aliases {
            Some(path) => AliasTable::from_json(loader.load_aliases(path).await?)?,
            None => AliasTable::default(),
        };
        info!(
            generations = manifest.generations.len(),
            aliases = aliases.len(),
            "registry ready"
        );

        Ok(Generations {
            loader,
            layers: LayerStore::new(),
            composer: Composer::new(Arc::new(manifest)),
            aliases: Arc::new(aliases),
        })
    }

    pub fn manifest(&self) -> &Manifest {
        self.composer.manifest()
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// View for `generation`, optionally with a mod and text languages.
    /// The mod name is normalized like any identifier.
    pub async fn get(
        &self,
        generation: GenerationNumber,
        mod_name: Option<&str>,
        languages: &[Language],
    ) -> DexResult<Generation> {
        self.get_key(&request_key(generation, mod_name, languages)).await
    }

    /// Like [`Generations::get`], with species details folded in. Details
    /// layers are only fetched by this call.
    pub async fn get_with_details(
        &self,
        generation: GenerationNumber,
        mod_name: Option<&str>,
        languages: &[Language],
    ) -> DexResult<Generation> {
        let key = request_key(generation, mod_name, languages).with_details();
        self.get_key(&key).await
    }

    pub async fn get_key(&self, key: &CompositionKey) -> DexResult<Generation> {
        let dataset = match self.composer.cached(key) {
            Some(dataset) => dataset,
            None => {
                let needed = self.composer.plan(key)?;
                debug!(key = %key, layers = needed.len(), "loading layers");
                for layer in &needed {
                    self.layers.ensure(&self.loader, layer).await?;
                }
                self.composer.compose(&self.layers, key)?
            }
        };
        Ok(Generation::new(dataset, Arc::clone(&self.aliases)))
    }
}

fn request_key(
    generation: GenerationNumber,
    mod_name: Option<&str>,
    languages: &[Language],
) -> CompositionKey {
    let key = CompositionKey::new(generation).with_languages(languages.iter().copied());
    match mod_name {
        Some(name) => key.with_mod(ModId::normalize(name)),
        None => key,
    }
}
