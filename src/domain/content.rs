use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schemaless CMS payload: an arbitrarily nested tree of scalars, arrays and objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ContentValue>),
    Object(BTreeMap<String, ContentValue>),
}

impl Default for ContentValue {
    fn default() -> Self {
        Self::Object(BTreeMap::new())
    }
}

impl ContentValue {
    /// Look up a nested value by a dotted path (`hero.title`, `faq.0.answer`)
    pub fn pointer(&self, path: &str) -> Option<&ContentValue> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |value, segment| match value {
                Self::Object(map) => map.get(segment),
                Self::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// Nesting depth of the tree, scalars count as one level
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Object(map) => 1 + map.values().map(Self::depth).max().unwrap_or(0),
            _ => 1,
        }
    }
}

/// Key under which a content document is stored (`home`, `pricing.plans`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey(String);

impl std::str::FromStr for ContentKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err("Content key cannot be empty".into());
        }
        if value.len() > 128 {
            return Err("Content key too long".into());
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err("Content key contains invalid characters".into());
        }
        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for ContentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
