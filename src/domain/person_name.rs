use std::collections::HashSet;
use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 256;

/// A user supplied display name, used for inbound leads
#[derive(Debug, Clone, PartialEq)]
pub struct PersonName(String);

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PersonName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref INVALID_CHARS: HashSet<char> = vec!['/', '(', ')', '"', '<', '>', '\\', '{', '}']
                .into_iter()
                .collect();
        }

        let value = value.trim();

        if value.is_empty() {
            return Err("Name cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("Name too long".into());
        }
        if value.chars().any(|c| INVALID_CHARS.contains(&c)) {
            return Err("Name contains invalid characters".into());
        }
        Ok(Self(value.to_string()))
    }
}
