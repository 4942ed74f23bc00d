use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Publication state of an editable row
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl FromStr for PublishStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(format!("{} is not a valid status", other)),
        }
    }
}
