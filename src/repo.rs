use serde::{Deserialize, Serialize};

use sqlx::migrate::Migrator;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::domain::LocalizedFields;

mod analytics;
mod blog_posts;
mod careers;
mod content_blocks;
mod integrations;
mod leads;
mod policies;
mod testimonials;
mod users;

pub use analytics::{
    AnalyticsRepo, DailyCount, DashboardStats, NewEvent, NewPageview, NamedCount, RealtimeStats,
    RecentEvent,
};
pub use blog_posts::{BlogPost, BlogPostRepo, NewBlogPost};
pub use careers::{CareerListing, CareerListingRepo, NewCareerListing};
pub use content_blocks::{ContentBlock, ContentBlockRepo, ContentWrite};
pub use integrations::{Integration, IntegrationRepo, NewIntegration};
pub use leads::{Lead, LeadRepo, NewLead};
pub use policies::{NewPolicyPage, PolicyPage, PolicyPageRepo};
pub use testimonials::{NewTestimonial, Testimonial, TestimonialRepo};
pub use users::{NewUser, User, UserCredentials, UsersRepo};

/// Schema migrations, embedded at compile time from `./migrations`
pub static MIGRATOR: Migrator = sqlx::migrate!();

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// One-based page window over a listing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Clamp user supplied values into a usable window
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind the eight per-language columns, in `title_*` then `content_*` order (en, ar, es, pt)
pub(crate) fn bind_localized<'q>(query: SqliteQuery<'q>, fields: &'q LocalizedFields) -> SqliteQuery<'q> {
    query
        .bind(&fields.title_en)
        .bind(&fields.title_ar)
        .bind(&fields.title_es)
        .bind(&fields.title_pt)
        .bind(&fields.content_en)
        .bind(&fields.content_ar)
        .bind(&fields.content_es)
        .bind(&fields.content_pt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let page = Pagination::default();
        assert_eq!(1, page.page);
        assert_eq!(20, page.limit);
        assert_eq!(0, page.offset());
    }

    #[test]
    fn pagination_is_clamped() {
        let page = Pagination::new(Some(0), Some(10_000));
        assert_eq!(1, page.page);
        assert_eq!(100, page.limit);

        let page = Pagination::new(Some(3), Some(0));
        assert_eq!(1, page.limit);
        assert_eq!(2, page.offset());
    }
}
