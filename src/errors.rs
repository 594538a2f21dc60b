use crate::layer::LayerId;
use schema::{DataKind, GenerationNumber, Identifier, Language, ModId};
use thiserror::Error;

/// Main error type for the pokedex layer engine
#[derive(Debug, Error)]
pub enum DexError {
    /// Manifest or alias table is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Folding the layer chain failed
    #[error("Composition error: {0}")]
    Compose(#[from] ComposeError),
    /// A layer could not be fetched or decoded
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

/// Errors detected while reading the manifest or building the alias table.
/// These surface before any composition runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The manifest lists no generations at all
    #[error("manifest lists no generations")]
    EmptyManifest,
    /// Generations must be listed oldest first without gaps
    #[error("manifest generations out of order: {found} follows {previous}")]
    GenerationOrder {
        previous: GenerationNumber,
        found: GenerationNumber,
    },
    /// Alias table names a collection that does not exist
    #[error("alias table has unknown kind '{0}'")]
    UnknownAliasKind(String),
    /// An alias maps onto itself
    #[error("alias '{alias}' in {kind} points at itself")]
    SelfAlias { kind: DataKind, alias: Identifier },
    /// Two alias spellings normalize to the same identifier
    #[error("alias '{alias}' in {kind} is listed more than once")]
    DuplicateAlias { kind: DataKind, alias: Identifier },
    /// An alias target is itself an alias, which would need more than one hop
    #[error("alias '{alias}' in {kind} resolves to '{target}', which is also an alias")]
    AliasChain {
        kind: DataKind,
        alias: Identifier,
        target: Identifier,
    },
    /// Alias file body is not a kind -> {alias: target} mapping
    #[error("malformed alias table: {0}")]
    MalformedAliases(String),
}

/// Errors raised while folding layers into a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    /// Generation is not listed in the manifest
    #[error("unknown generation {0}")]
    UnknownGeneration(GenerationNumber),
    /// Mod is not published for the generation
    #[error("mod '{mod_id}' is not available for {generation}")]
    UnknownMod {
        generation: GenerationNumber,
        mod_id: ModId,
    },
    /// Language is not published for the generation
    #[error("language '{language}' is not available for {generation}")]
    UnknownLanguage {
        generation: GenerationNumber,
        language: Language,
    },
    /// Layer body names a collection that does not exist
    #[error("layer '{layer}' has unknown kind '{kind}'")]
    UnknownKind { layer: String, kind: String },
    /// Species details were requested but a generation in the chain has none
    #[error("species details are not available for {0}")]
    DetailsUnavailable(GenerationNumber),
    /// Layer body is not shaped as kind -> id -> record
    #[error("layer '{layer}' is malformed: {details}")]
    MalformedLayer { layer: String, details: String },
    /// The chain needs a layer that has not been loaded
    #[error("layer {0} is not loaded")]
    MissingLayer(LayerId),
    /// Overlay replaces a value with one of a different shape
    #[error("{kind} '{id}' field '{field}' changes shape from {base} to {overlay}")]
    ShapeMismatch {
        kind: DataKind,
        id: Identifier,
        field: String,
        base: &'static str,
        overlay: &'static str,
    },
    /// Text layer tries to write a gameplay field
    #[error("text layer '{layer}' sets non-text field '{field}' on {kind} '{id}'")]
    TextField {
        layer: String,
        kind: DataKind,
        id: Identifier,
        field: String,
    },
    /// Text layer describes a record that is not in the dataset
    #[error("text layer '{layer}' describes unknown {kind} '{id}'")]
    OrphanText {
        layer: String,
        kind: DataKind,
        id: Identifier,
    },
}

/// Errors raised by a layer loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing is stored at the requested location
    #[error("no layer data at '{0}'")]
    NotFound(String),
    /// Reading the backing file failed
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The backing file is not valid RON
    #[error("failed to parse RON in '{path}': {source}")]
    Ron {
        path: String,
        #[source]
        source: ron::error::SpannedError,
    },
    /// The backing file is not valid JSON
    #[error("failed to parse JSON in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// File extension is neither `.ron` nor `.json`
    #[error("unsupported layer format for '{0}'")]
    UnsupportedFormat(String),
    /// Decoded body is not a valid layer
    #[error(transparent)]
    Layer(#[from] ComposeError),
}

/// Type alias for Results using DexError
pub type DexResult<T> = Result<T, DexError>;

/// Type alias for Results using ComposeError
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Type alias for Results using LoadError
pub type LoadResult<T> = Result<T, LoadError>;
