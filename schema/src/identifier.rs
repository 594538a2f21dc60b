use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical key naming one record within one data kind.
///
/// Identifiers are produced by [`Identifier::normalize`], which lowercases the
/// input and drops everything that is not an ASCII letter or digit, so
/// `"Mr. Mime"` and `"mrmime"` name the same record. The empty identifier is
/// valid and means "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn normalize(name: &str) -> Self {
        Identifier(
            name.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_ascii_alphanumeric())
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::normalize(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::normalize(&name)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
