use std::fmt;
use std::str::FromStr;

use regex::Regex;

use serde::{Deserialize, Serialize};

const MAX_LEN: usize = 200;

/// URL-safe identifier for a published page (`refund-policy`, `line-cook-2024`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl FromStr for Slug {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
        }

        // Normalize
        let value = value.trim().to_lowercase();

        if value.is_empty() {
            return Err("Slug cannot be empty".into());
        }
        if value.len() > MAX_LEN {
            return Err("Slug too long".into());
        }
        if !SLUG_REGEX.is_match(&value) {
            return Err("Slug may only contain letters, digits and single hyphens".into());
        }

        Ok(Self(value))
    }
}

impl TryFrom<String> for Slug {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> String {
        value.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
