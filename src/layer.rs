use crate::errors::{ComposeError, ComposeResult};
use crate::value::{Fields, Value};
use indexmap::IndexMap;
use schema::{DataKind, GenerationNumber, Identifier, Language, ModId};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One record's entry in a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordPatch {
    /// Fields to add or override. In a full snapshot this is the whole record.
    Fields(Arc<Fields>),
    /// Drop the record entirely.
    Removed,
}

impl RecordPatch {
    pub fn fields(&self) -> Option<&Fields> {
        match self {
            RecordPatch::Fields(fields) => Some(fields),
            RecordPatch::Removed => None,
        }
    }
}

/// Records of one kind, in file order.
pub type RecordSet = IndexMap<Identifier, RecordPatch>;

/// An immutable set of per-kind records: a generation snapshot, a delta toward
/// an older generation, a mod delta, or a language's text.
///
/// Layers are never mutated after construction. Combining two layers builds a
/// new one; records nobody touched are shared through their `Arc`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    name: String,
    kinds: BTreeMap<DataKind, RecordSet>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Layer {
            name: name.into(),
            kinds: BTreeMap::new(),
        }
    }

    pub fn from_parts(name: impl Into<String>, kinds: BTreeMap<DataKind, RecordSet>) -> Self {
        Layer {
            name: name.into(),
            kinds,
        }
    }

    /// Decode a layer body shaped as `{ kind-key: { id: record | null } }`.
    ///
    /// Record keys are normalized to identifiers. A `null` record is a
    /// whole-record removal; `null` fields are deletion sentinels.
    pub fn from_json(name: impl Into<String>, body: serde_json::Value) -> ComposeResult<Self> {
        let name = name.into();
        let malformed = |details: String| ComposeError::MalformedLayer {
            layer: name.clone(),
            details,
        };

        let serde_json::Value::Object(collections) = body else {
            return Err(malformed("top level must be a map of collections".to_string()));
        };

        let mut kinds = BTreeMap::new();
        for (key, records) in collections {
            let kind = DataKind::from_str(&key).map_err(|_| ComposeError::UnknownKind {
                layer: name.clone(),
                kind: key.clone(),
            })?;
            let serde_json::Value::Object(records) = records else {
                return Err(malformed(format!("collection '{}' must be a map of records", key)));
            };

            let mut set = RecordSet::with_capacity(records.len());
            for (raw_id, record) in records {
                let patch = match Value::from(record) {
                    Value::Delete => RecordPatch::Removed,
                    Value::Object(fields) => RecordPatch::Fields(Arc::new(decode_fields(fields))),
                    _ => {
                        return Err(malformed(format!(
                            "record '{}' in '{}' must be a map or null",
                            raw_id, key
                        )))
                    }
                };
                let id = Identifier::normalize(&raw_id);
                if set.insert(id.clone(), patch).is_some() {
                    return Err(malformed(format!(
                        "record '{}' in '{}' collides with another record named '{}'",
                        raw_id, key, id
                    )));
                }
            }
            kinds.insert(kind, set);
        }

        Ok(Layer { name, kinds })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self, kind: DataKind) -> Option<&RecordSet> {
        self.kinds.get(&kind)
    }

    pub fn get(&self, kind: DataKind, id: &str) -> Option<&RecordPatch> {
        self.kinds.get(&kind)?.get(id)
    }

    pub fn kinds(&self) -> impl Iterator<Item = (DataKind, &RecordSet)> {
        self.kinds.iter().map(|(kind, set)| (*kind, set))
    }

    pub fn len(&self) -> usize {
        self.kinds.values().map(|records| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builder used by fixtures and embedders: set one record's patch.
    pub fn with_record(mut self, kind: DataKind, id: &str, patch: RecordPatch) -> Self {
        self.kinds
            .entry(kind)
            .or_default()
            .insert(Identifier::normalize(id), patch);
        self
    }

    pub(crate) fn into_parts(self) -> (String, BTreeMap<DataKind, RecordSet>) {
        (self.name, self.kinds)
    }
}

/// Only a field's own `null` is a deletion sentinel; `null`s nested inside
/// a field's value are dropped.
fn decode_fields(fields: Fields) -> Fields {
    fields
        .into_iter()
        .map(|(name, value)| match value {
            Value::Delete => (name, Value::Delete),
            value => (name, value.without_deletes()),
        })
        .collect()
}

/// Names a layer the manifest can publish.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    /// Newest generation: full snapshot. Older generations: delta from the next newer one.
    Generation(GenerationNumber),
    Mod(GenerationNumber, ModId),
    Text(GenerationNumber, Language),
    /// Species details. Chained like `Generation`, but only read on request.
    Details(GenerationNumber),
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Generation(num) => write!(f, "{}", num),
            LayerId::Mod(num, mod_id) => write!(f, "{}/{}", num, mod_id),
            LayerId::Text(num, language) => write!(f, "{}/text/{}", num, language),
            LayerId::Details(num) => write!(f, "{}/details", num),
        }
    }
}

/// A layer id together with the location the manifest maps it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    pub id: LayerId,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_normalizes_and_marks_removals() {
        let layer = Layer::from_json(
            "gen7",
            json!({
                "species": {
                    "Charmander": {"evos": ["charmeleon"]},
                    "missingno": null
                }
            }),
        )
        .unwrap();

        assert!(matches!(
            layer.get(DataKind::Species, "charmander"),
            Some(RecordPatch::Fields(_))
        ));
        assert_eq!(
            layer.get(DataKind::Species, "missingno"),
            Some(&RecordPatch::Removed)
        );
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_unknown_kind() {
        let err = Layer::from_json("bad", json!({"natures": {}})).unwrap_err();
        assert_eq!(
            err,
            ComposeError::UnknownKind {
                layer: "bad".to_string(),
                kind: "natures".to_string()
            }
        );
    }

    #[test]
    fn test_from_json_rejects_scalar_record() {
        let err = Layer::from_json("bad", json!({"items": {"leftovers": 3}})).unwrap_err();
        assert!(matches!(err, ComposeError::MalformedLayer { .. }));
    }

    #[test]
    fn test_from_json_rejects_colliding_records() {
        let err = Layer::from_json(
            "gen7",
            json!({"items": {"Leftovers": {"num": 1}, "leftovers": {"num": 2}}}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ComposeError::MalformedLayer { ref layer, ref details }
                if layer == "gen7" && details.contains("leftovers")
        ));
    }

    #[test]
    fn test_from_json_drops_nested_nulls() {
        let layer = Layer::from_json(
            "gen6",
            json!({"items": {"leftovers": {"fling": {"basePower": 10, "status": null}, "num": null}}}),
        )
        .unwrap();
        let fields = layer.get(DataKind::Item, "leftovers").unwrap().fields().unwrap();

        // Field-level null stays a sentinel
        assert!(fields["num"].is_delete());
        assert_eq!(
            serde_json::Value::from(&fields["fling"]),
            json!({"basePower": 10})
        );
    }

    #[test]
    fn test_layer_id_display() {
        let gen = GenerationNumber::new(4).unwrap();
        assert_eq!(LayerId::Generation(gen).to_string(), "gen4");
        assert_eq!(
            LayerId::Mod(gen, ModId::normalize("Mix And Mega")).to_string(),
            "gen4/mixandmega"
        );
        assert_eq!(LayerId::Text(gen, Language::Fr).to_string(), "gen4/text/fr");
        assert_eq!(LayerId::Details(gen).to_string(), "gen4/details");
    }
}
