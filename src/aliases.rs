use crate::errors::ConfigError;
use schema::{DataKind, Identifier};
use std::collections::HashMap;
use std::str::FromStr;

/// Maps alternate and historical identifiers to the current canonical one,
/// per data kind.
///
/// Every alias resolves in exactly one hop. Tables where a target is itself an
/// alias (including cycles) are rejected when the table is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    kinds: HashMap<DataKind, HashMap<Identifier, Identifier>>,
}

impl AliasTable {
    pub fn new(
        raw: impl IntoIterator<Item = (DataKind, Vec<(Identifier, Identifier)>)>,
    ) -> Result<Self, ConfigError> {
        let mut kinds: HashMap<DataKind, HashMap<Identifier, Identifier>> = HashMap::new();
        for (kind, entries) in raw {
            let table = kinds.entry(kind).or_default();
            for (alias, target) in entries {
                if alias == target {
                    return Err(ConfigError::SelfAlias { kind, alias });
                }
                if table.contains_key(&alias) {
                    return Err(ConfigError::DuplicateAlias { kind, alias });
                }
                table.insert(alias, target);
            }
        }

        for (kind, table) in &kinds {
            // Sorted so the reported offender does not depend on hash order
            let mut aliases: Vec<&Identifier> = table.keys().collect();
            aliases.sort();
            for alias in aliases {
                let target = &table[alias];
                if table.contains_key(target) {
                    return Err(ConfigError::AliasChain {
                        kind: *kind,
                        alias: alias.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(AliasTable { kinds })
    }

    /// Decode an alias file body shaped as `{ kind-key: { alias: target } }`.
    /// Both sides are normalized.
    pub fn from_json(body: serde_json::Value) -> Result<Self, ConfigError> {
        let serde_json::Value::Object(collections) = body else {
            return Err(ConfigError::MalformedAliases(
                "top level must be a map of collections".to_string(),
            ));
        };

        let mut raw = Vec::with_capacity(collections.len());
        for (key, entries) in collections {
            let kind =
                DataKind::from_str(&key).map_err(|_| ConfigError::UnknownAliasKind(key.clone()))?;
            let serde_json::Value::Object(entries) = entries else {
                return Err(ConfigError::MalformedAliases(format!(
                    "'{}' must map aliases to targets",
                    key
                )));
            };
            let mut pairs = Vec::with_capacity(entries.len());
            for (alias, target) in entries {
                let Some(target) = target.as_str() else {
                    return Err(ConfigError::MalformedAliases(format!(
                        "alias '{}' in '{}' must map to a string",
                        alias, key
                    )));
                };
                pairs.push((Identifier::normalize(&alias), Identifier::normalize(target)));
            }
            raw.push((kind, pairs));
        }

        AliasTable::new(raw)
    }

    /// Canonical identifier for `id`, or `id` itself when it is not an alias.
    pub fn resolve<'a>(&'a self, kind: DataKind, id: &'a Identifier) -> &'a Identifier {
        self.kinds
            .get(&kind)
            .and_then(|table| table.get(id))
            .unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.kinds.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
