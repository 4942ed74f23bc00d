use serde::{Deserialize, Serialize};

use crate::domain::{localize, Language, LocalizedFields};
use crate::repo::Pagination;

pub mod analytics;
pub mod auth;
pub mod blog;
pub mod careers;
pub mod content;
pub mod integrations;
pub mod leads;
pub mod policies;
pub mod testimonials;

/// Query string accepted by the public listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    lang: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
    /// Blog and integration listings
    category: Option<String>,
    /// Career listings
    department: Option<String>,
}

impl ListQuery {
    pub fn language(&self) -> Language {
        Language::resolve(self.lang.as_deref())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    pub fn department(&self) -> Option<&str> {
        non_blank(self.department.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Trim an optional form field, treating blank input as absent
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(str::to_string)
}

/// Trim a required form field
pub(crate) fn required_text(value: &str, field: &str, max_len: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if value.chars().count() > max_len {
        return Err(format!("{} is too long", field));
    }
    Ok(value.to_string())
}

/// One page of a public listing
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            limit: pagination.limit,
        }
    }

    /// Cut a page out of a fully loaded listing
    pub fn slice(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit as usize)
            .collect();
        Self::new(items, total, pagination)
    }
}

/// Public view of a translatable row: its metadata plus title and content resolved for `lang`
#[derive(Debug, Serialize)]
pub struct Localized<T> {
    #[serde(flatten)]
    pub item: T,
    pub title: String,
    pub content: String,
    pub lang: Language,
}

impl<T> Localized<T> {
    pub fn new(item: T, fields: &LocalizedFields, lang: Language) -> Self {
        let text = localize(fields, lang);
        Self {
            item,
            title: text.title,
            content: text.content,
            lang,
        }
    }
}
