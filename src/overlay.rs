//! Pairwise layer combination.
//!
//! Per field of every record present in either layer:
//! - absent in the overlay: inherited from the base unchanged
//! - concrete in the overlay: replaces the base value wholesale, including
//!   nested objects and lists
//! - [`Value::Delete`] in the overlay: removed from the result
//!
//! Sentinels nested inside a value are dropped before it is written.
//!
//! Records only in the overlay are appended, records only in the base are
//! carried through, and [`RecordPatch::Removed`] drops the record.

use crate::errors::{ComposeError, ComposeResult};
use crate::layer::{Layer, RecordPatch, RecordSet};
use crate::value::{Fields, Value};
use schema::{DataKind, Identifier};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Combine `overlay` on top of `base` into a new layer.
///
/// Neither input is modified. The result takes the overlay's name.
pub fn combine(base: &Layer, overlay: &Layer) -> ComposeResult<Layer> {
    let (_, mut kinds) = base.clone().into_parts();

    for (kind, overlay_records) in overlay.kinds() {
        let records = kinds.entry(kind).or_default();
        merge_records(kind, records, overlay_records)?;
    }

    Ok(Layer::from_parts(overlay.name(), kinds))
}

fn merge_records(kind: DataKind, records: &mut RecordSet, overlay: &RecordSet) -> ComposeResult<()> {
    for (id, patch) in overlay {
        match patch {
            RecordPatch::Removed => {
                // shift_remove keeps the remaining records in order
                records.shift_remove(id);
            }
            RecordPatch::Fields(overlay_fields) => {
                let merged = match records.get(id) {
                    Some(RecordPatch::Fields(base_fields)) => {
                        merge_fields(kind, id, base_fields, overlay_fields)?
                    }
                    Some(RecordPatch::Removed) | None => strip_deletes(overlay_fields),
                };
                // insert keeps an existing record's position and appends new ones
                records.insert(id.clone(), RecordPatch::Fields(Arc::new(merged)));
            }
        }
    }
    Ok(())
}

fn merge_fields(
    kind: DataKind,
    id: &Identifier,
    base: &Fields,
    overlay: &Fields,
) -> ComposeResult<Fields> {
    let mut merged = base.clone();
    for (field, value) in overlay {
        if value.is_delete() {
            merged.shift_remove(field);
            continue;
        }
        if let Some(existing) = merged.get(field) {
            check_shape(kind, id, field, existing, value)?;
        }
        merged.insert(field.clone(), value.clone().without_deletes());
    }
    Ok(merged)
}

fn strip_deletes(fields: &Fields) -> Fields {
    fields
        .iter()
        .filter(|(_, value)| !value.is_delete())
        .map(|(field, value)| (field.clone(), value.clone().without_deletes()))
        .collect()
}

fn check_shape(
    kind: DataKind,
    id: &Identifier,
    field: &str,
    base: &Value,
    overlay: &Value,
) -> ComposeResult<()> {
    match (base.shape(), overlay.shape()) {
        (Some(b), Some(o)) if b != o => Err(ComposeError::ShapeMismatch {
            kind,
            id: id.clone(),
            field: field.to_string(),
            base: b.name(),
            overlay: o.name(),
        }),
        _ => Ok(()),
    }
}

/// Stateful front for [`combine`] that counts how many combinations ran.
///
/// The counter is what lets callers observe that a cached composition did
/// not redo any work.
#[derive(Debug, Default)]
pub struct Combiner {
    combinations: AtomicU64,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn combine(&self, base: &Layer, overlay: &Layer) -> ComposeResult<Layer> {
        self.combinations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(base = base.name(), overlay = overlay.name(), "combining layers");
        combine(base, overlay)
    }

    pub fn combinations(&self) -> u64 {
        self.combinations.load(Ordering::Relaxed)
    }
}
