//! Localized text overlay.
//!
//! Text layers are folded after all gameplay layers. They may only write the
//! fields in [`TEXT_FIELDS`], and only for records that exist. Each language
//! lands in its own slot under the record's `text` object, so several
//! languages can be composed into one dataset without overwriting each other:
//!
//! ```text
//! leftovers: { num: 234, text: { en: { shortDesc: "..." }, fr: { ... } } }
//! ```

use crate::errors::{ComposeError, ComposeResult};
use crate::layer::{Layer, RecordPatch};
use crate::value::{Fields, Shape, Value};
use schema::Language;
use std::sync::Arc;

/// Fields a text layer is allowed to set.
pub const TEXT_FIELDS: &[&str] = &["desc", "shortDesc"];

/// Record field holding the per-language text slots.
pub(crate) const TEXT_SLOT: &str = "text";

pub(crate) fn apply(base: &Layer, language: Language, texts: &Layer) -> ComposeResult<Layer> {
    let (name, mut kinds) = base.clone().into_parts();

    for (kind, records) in texts.kinds() {
        let target = kinds.entry(kind).or_default();
        for (id, patch) in records {
            let orphan = || ComposeError::OrphanText {
                layer: texts.name().to_string(),
                kind,
                id: id.clone(),
            };
            let RecordPatch::Fields(text_fields) = patch else {
                return Err(orphan());
            };
            let Some(RecordPatch::Fields(fields)) = target.get(id) else {
                return Err(orphan());
            };

            if let Some(field) = text_fields.keys().find(|f| !TEXT_FIELDS.contains(&f.as_str())) {
                return Err(ComposeError::TextField {
                    layer: texts.name().to_string(),
                    kind,
                    id: id.clone(),
                    field: field.clone(),
                });
            }

            let mut slots = match fields.get(TEXT_SLOT) {
                Some(Value::Object(slots)) => slots.clone(),
                Some(other) => {
                    return Err(ComposeError::ShapeMismatch {
                        kind,
                        id: id.clone(),
                        field: TEXT_SLOT.to_string(),
                        base: other.shape().map_or("deletion", Shape::name),
                        overlay: Shape::Object.name(),
                    })
                }
                None => Fields::new(),
            };
            let code = language.to_string();
            let mut entry = match slots.get(code.as_str()) {
                Some(Value::Object(entry)) => entry.clone(),
                _ => Fields::new(),
            };
            for (field, value) in text_fields.iter() {
                if value.is_delete() {
                    entry.shift_remove(field);
                } else {
                    entry.insert(field.clone(), value.clone());
                }
            }
            slots.insert(code, Value::Object(entry));

            let mut updated = Fields::clone(fields);
            updated.insert(TEXT_SLOT.to_string(), Value::Object(slots));
            target.insert(id.clone(), RecordPatch::Fields(Arc::new(updated)));
        }
    }

    Ok(Layer::from_parts(name, kinds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::layer;
    use schema::DataKind;
    use serde_json::json;

    fn slot<'a>(layer: &'a Layer, id: &str, language: &str) -> Option<&'a Fields> {
        layer
            .get(DataKind::Move, id)?
            .fields()?
            .get(TEXT_SLOT)?
            .as_object()?
            .get(language)?
            .as_object()
    }

    #[test]
    fn test_text_is_written_per_language() {
        let base = layer("gen7", json!({"moves": {"tackle": {"basePower": 40}}}));
        let en = layer("en", json!({"moves": {"tackle": {"shortDesc": "No additional effect."}}}));
        let de = layer("de", json!({"moves": {"tackle": {"shortDesc": "Kein Zusatzeffekt."}}}));

        let with_en = apply(&base, Language::En, &en).unwrap();
        let with_both = apply(&with_en, Language::De, &de).unwrap();

        assert_eq!(
            slot(&with_both, "tackle", "en").unwrap()["shortDesc"],
            Value::from("No additional effect.")
        );
        assert_eq!(
            slot(&with_both, "tackle", "de").unwrap()["shortDesc"],
            Value::from("Kein Zusatzeffekt.")
        );
        // Gameplay fields untouched, inputs untouched
        let tackle = with_both.get(DataKind::Move, "tackle").unwrap().fields().unwrap();
        assert_eq!(tackle["basePower"], Value::Int(40));
        assert!(slot(&base, "tackle", "en").is_none());
    }

    #[test]
    fn test_non_text_field_rejected() {
        let base = layer("gen7", json!({"moves": {"tackle": {"basePower": 40}}}));
        let bad = layer("en", json!({"moves": {"tackle": {"desc": "ok", "basePower": 9000}}}));

        let err = apply(&base, Language::En, &bad).unwrap_err();
        assert_eq!(
            err,
            ComposeError::TextField {
                layer: "en".to_string(),
                kind: DataKind::Move,
                id: "tackle".into(),
                field: "basePower".to_string()
            }
        );
    }

    #[test]
    fn test_text_for_unknown_record_rejected() {
        let base = layer("gen7", json!({"moves": {"tackle": {}}}));
        let bad = layer("en", json!({"moves": {"hyperbeam": {"desc": "..."}}}));
        assert!(matches!(
            apply(&base, Language::En, &bad),
            Err(ComposeError::OrphanText { .. })
        ));
    }
}
