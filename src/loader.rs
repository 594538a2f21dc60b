//! Fetching raw layers.
//!
//! A [`LayerLoader`] turns a manifest location into a decoded layer body. The
//! engine only needs the same location to always decode to equivalent
//! content. [`LayerStore`] sits in front of a loader and makes sure each layer
//! is fetched once, however many requests need it at the same time.

use crate::compose::LayerSource;
use crate::errors::{LoadError, LoadResult};
use crate::layer::{Layer, LayerId, LayerRef};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

pub trait LayerLoader: Send + Sync {
    fn load_layer(&self, layer: &LayerRef) -> impl Future<Output = LoadResult<Layer>> + Send;

    /// Raw alias table body, decoded by [`crate::AliasTable::from_json`].
    fn load_aliases(&self, path: &str) -> impl Future<Output = LoadResult<serde_json::Value>> + Send;
}

/// Reads layer files below a root directory. `.ron` files are parsed with
/// `ron`, `.json` files with `serde_json`.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_body(&self, path: &str) -> LoadResult<serde_json::Value> {
        let full = self.root.join(path);
        let text = tokio::fs::read_to_string(&full).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(full.display().to_string())
            } else {
                LoadError::Io {
                    path: full.display().to_string(),
                    source: e,
                }
            }
        })?;

        match full.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => ron::from_str(&text).map_err(|e| LoadError::Ron {
                path: path.to_string(),
                source: e,
            }),
            Some("json") => serde_json::from_str(&text).map_err(|e| LoadError::Json {
                path: path.to_string(),
                source: e,
            }),
            _ => Err(LoadError::UnsupportedFormat(path.to_string())),
        }
    }
}

impl LayerLoader for DirectoryLoader {
    async fn load_layer(&self, layer: &LayerRef) -> LoadResult<Layer> {
        debug!(layer = %layer.id, path = %layer.path, "reading layer file");
        let body = self.read_body(&layer.path).await?;
        Ok(Layer::from_json(layer.id.to_string(), body)?)
    }

    async fn load_aliases(&self, path: &str) -> LoadResult<serde_json::Value> {
        self.read_body(path).await
    }
}

/// Layer bodies held in memory, keyed by manifest location.
///
/// Bodies can be added after construction, so a location that failed to load
/// can succeed on a later attempt.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    bodies: RwLock<HashMap<String, serde_json::Value>>,
    loads: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, path: impl Into<String>, body: serde_json::Value) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&self, path: impl Into<String>, body: serde_json::Value) {
        self.bodies.write().insert(path.into(), body);
    }

    /// How many load requests reached this loader.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn body(&self, path: &str) -> LoadResult<serde_json::Value> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // Give concurrent requests a chance to interleave, like real I/O would
        tokio::task::yield_now().await;
        self.bodies
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))
    }
}

impl LayerLoader for MemoryLoader {
    async fn load_layer(&self, layer: &LayerRef) -> LoadResult<Layer> {
        let body = self.body(&layer.path).await?;
        Ok(Layer::from_json(layer.id.to_string(), body)?)
    }

    async fn load_aliases(&self, path: &str) -> LoadResult<serde_json::Value> {
        self.body(path).await
    }
}

/// Loaded layers by id, each fetched at most once.
///
/// Concurrent requests for the same layer wait on one load. A failed load
/// leaves the slot empty so the next request tries again.
#[derive(Debug, Default)]
pub struct LayerStore {
    slots: Mutex<HashMap<LayerId, Arc<OnceCell<Arc<Layer>>>>>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ensure<L: LayerLoader>(&self, loader: &L, layer: &LayerRef) -> LoadResult<Arc<Layer>> {
        let slot = Arc::clone(self.slots.lock().entry(layer.id.clone()).or_default());
        slot.get_or_try_init(|| async { loader.load_layer(layer).await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LayerSource for LayerStore {
    fn layer(&self, id: &LayerId) -> Option<Arc<Layer>> {
        self.slots.lock().get(id)?.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::gen;
    use schema::DataKind;
    use serde_json::json;

    fn gen7_ref(path: &str) -> LayerRef {
        LayerRef {
            id: LayerId::Generation(gen(7)),
            path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_directory_loader_reads_ron_and_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gen7.ron"),
            r#"{"items": {"Leftovers": {"num": 234, "fling": ()}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("gen6.json"),
            r#"{"items": {"leftovers": {"num": 1}}}"#,
        )
        .unwrap();

        let loader = DirectoryLoader::new(dir.path());
        let ron_layer = loader.load_layer(&gen7_ref("gen7.ron")).await.unwrap();
        let leftovers = ron_layer.get(DataKind::Item, "leftovers").unwrap().fields().unwrap();
        assert!(leftovers["fling"].is_delete());
        assert_eq!(ron_layer.name(), "gen7");

        let json_layer = loader.load_layer(&gen7_ref("gen6.json")).await.unwrap();
        assert!(json_layer.get(DataKind::Item, "leftovers").is_some());
    }

    #[tokio::test]
    async fn test_directory_loader_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("layer.yaml"), "items: {}").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("natures.json"), r#"{"natures": {}}"#).unwrap();
        let loader = DirectoryLoader::new(dir.path());

        assert!(matches!(
            loader.load_layer(&gen7_ref("missing.json")).await,
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(
            loader.load_layer(&gen7_ref("layer.yaml")).await,
            Err(LoadError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            loader.load_layer(&gen7_ref("broken.json")).await,
            Err(LoadError::Json { .. })
        ));
        assert!(matches!(
            loader.load_layer(&gen7_ref("natures.json")).await,
            Err(LoadError::Layer(_))
        ));
    }

    #[tokio::test]
    async fn test_store_loads_once() {
        let loader = MemoryLoader::new().with_body("gen7.json", json!({"items": {}}));
        let store = LayerStore::new();
        let layer = gen7_ref("gen7.json");

        let (a, b) = tokio::join!(store.ensure(&loader, &layer), store.ensure(&loader, &layer));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        store.ensure(&loader, &layer).await.unwrap();

        assert_eq!(loader.loads(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.layer(&LayerId::Generation(gen(7))).is_some());
    }

    #[tokio::test]
    async fn test_store_retries_after_failure() {
        let loader = MemoryLoader::new();
        let store = LayerStore::new();
        let layer = gen7_ref("gen7.json");

        assert!(store.ensure(&loader, &layer).await.is_err());
        assert!(store.layer(&layer.id).is_none());
        assert!(store.is_empty());

        loader.insert("gen7.json", json!({"items": {}}));
        assert!(store.ensure(&loader, &layer).await.is_ok());
        assert_eq!(loader.loads(), 2);
    }
}
