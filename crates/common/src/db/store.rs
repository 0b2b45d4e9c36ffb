//! Store accessor used by the news read path
//!
//! The query service and relation assembler only see this trait, so the
//! Postgres repository and the in-memory store are interchangeable.

use crate::db::models::{self, MediaType};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Half-open range on the ordering timestamp: `after < ts <= until`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub after: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.after && ts <= self.until
    }
}

/// Which articles `select_articles` returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    /// Restrict to `is_published = true`
    pub published_only: bool,

    /// Ordering timestamp must fall in this window
    pub window: Option<DateWindow>,

    /// Article must have this platform association
    pub platform: Option<String>,

    /// Full-text match on title/content/metadata, or substring match on a tag
    pub text: Option<String>,

    /// Exact slug
    pub slug: Option<String>,
}

impl ArticleFilter {
    /// Filter matching every published article
    pub fn published() -> Self {
        Self {
            published_only: true,
            ..Self::default()
        }
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn on_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn matching(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Result ordering for `select_articles`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleOrder {
    /// Ordering timestamp descending
    NewestFirst,
}

/// Article row as seen by the read path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub keywords: Vec<String>,
    pub metadata: Option<String>,
    pub is_published: bool,
    /// Ordering timestamp (the row's creation time)
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub event_date_en: Option<NaiveDate>,
    pub event_date_np: Option<String>,
    pub og_image: Option<String>,
}

impl From<models::Article> for ArticleRow {
    fn from(model: models::Article) -> Self {
        Self {
            id: model.id,
            title: model.title,
            content: model.content,
            slug: model.slug,
            keywords: model.keywords.unwrap_or_default(),
            metadata: model.metadata,
            is_published: model.is_published,
            published_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
            event_date_en: model.event_date_en,
            event_date_np: model.event_date_np,
            og_image: model.og_image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub article_id: Uuid,
    pub media_type: MediaType,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub article_id: Uuid,
    pub label: Option<String>,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct TagRow {
    pub article_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct AuthorRow {
    pub article_id: Uuid,
    pub name: String,
    pub portfolio_link: Option<String>,
}

/// One sitemap `<url>` entry
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult, Serialize, Deserialize)]
pub struct SitemapRow {
    pub slug: String,
    pub updated_at: DateTime<Utc>,
}

/// Typed query interface over the article tables
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Articles matching `filter`, ordered, optionally capped
    async fn select_articles(
        &self,
        filter: &ArticleFilter,
        order: ArticleOrder,
        limit: Option<u64>,
    ) -> Result<Vec<ArticleRow>>;

    /// Media for any of `ids`
    async fn select_media_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRow>>;

    /// Links for any of `ids`
    async fn select_links_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<LinkRow>>;

    /// Tag names for any of `ids`
    async fn select_tags_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<TagRow>>;

    /// Resolved authors for any of `ids`
    async fn select_authors_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRow>>;

    /// Published articles created at or after `since`, newest first
    async fn select_sitemap_entries(&self, since: DateTime<Utc>) -> Result<Vec<SitemapRow>>;

    /// Connectivity check
    async fn ping(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_is_half_open() {
        let until = Utc::now();
        let after = until - Duration::days(5);
        let window = DateWindow { after, until };

        assert!(window.contains(until));
        assert!(window.contains(after + Duration::seconds(1)));
        assert!(!window.contains(after));
        assert!(!window.contains(until + Duration::seconds(1)));
    }

    #[test]
    fn test_filter_builder() {
        let filter = ArticleFilter::published()
            .on_platform("facebook")
            .matching("flood");

        assert!(filter.published_only);
        assert_eq!(filter.platform.as_deref(), Some("facebook"));
        assert_eq!(filter.text.as_deref(), Some("flood"));
        assert!(filter.window.is_none());
        assert!(filter.slug.is_none());
    }
}
