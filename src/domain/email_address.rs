use std::fmt;
use std::str::FromStr;

use regex::Regex;

use unicode_segmentation::UnicodeSegmentation;

const MAX_LEN: usize = 256;

/// A user supplied email-address, normalized to lowercase
#[derive(Debug, PartialEq, Clone)]
pub struct EmailAddress(String);

impl FromStr for EmailAddress {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lazy_static::lazy_static! {
            static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").unwrap();
        }

        let value = value.trim();

        if value.is_empty() {
            return Err("Email address cannot be empty".into());
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err("Email address too long".into());
        }
        if !EMAIL_REGEX.is_match(value) {
            return Err("Email address of incorrect format".into());
        }

        // Normalize
        let value = value.to_lowercase();

        Ok(Self(value))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
