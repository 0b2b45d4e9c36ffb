//! In-memory store
//!
//! Implements `NewsStore` over plain vectors. Text search approximates the
//! Postgres `simple` configuration: every query word must appear among the
//! document words, case-insensitively. Child rows come back in insertion
//! order, not `sort_order`, and every query is counted so callers can check
//! how many round trips an operation made.

use crate::db::models::MediaType;
use crate::db::store::{
    ArticleFilter, ArticleOrder, ArticleRow, AuthorRow, LinkRow, MediaRow, NewsStore,
    SitemapRow, TagRow,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tables the in-memory store can be queried on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Article,
    Media,
    Link,
    Tag,
    Author,
}

#[derive(Default)]
struct Tables {
    articles: Vec<ArticleRow>,
    platforms: Vec<(Uuid, String)>,
    media: Vec<MediaRow>,
    links: Vec<LinkRow>,
    tags: Vec<TagRow>,
    authors: Vec<AuthorRow>,
}

#[derive(Default)]
struct QueryCounts {
    article: AtomicUsize,
    media: AtomicUsize,
    link: AtomicUsize,
    tag: AtomicUsize,
    author: AtomicUsize,
}

/// `NewsStore` backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    counts: QueryCounts,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_article(&self, article: ArticleRow) {
        self.tables.write().await.articles.push(article);
    }

    pub async fn add_platform(&self, article_id: Uuid, platform: &str) {
        self.tables
            .write()
            .await
            .platforms
            .push((article_id, platform.to_string()));
    }

    pub async fn add_media(&self, article_id: Uuid, media_type: MediaType, url: &str, sort_order: i32) {
        self.tables.write().await.media.push(MediaRow {
            article_id,
            media_type,
            url: url.to_string(),
            sort_order,
        });
    }

    pub async fn add_link(&self, article_id: Uuid, label: Option<&str>, url: &str, sort_order: i32) {
        self.tables.write().await.links.push(LinkRow {
            article_id,
            label: label.map(str::to_string),
            url: url.to_string(),
            sort_order,
        });
    }

    pub async fn add_tag(&self, article_id: Uuid, name: &str) {
        self.tables.write().await.tags.push(TagRow {
            article_id,
            name: name.to_lowercase(),
        });
    }

    pub async fn add_author(&self, article_id: Uuid, name: &str, portfolio_link: Option<&str>) {
        self.tables.write().await.authors.push(AuthorRow {
            article_id,
            name: name.to_string(),
            portfolio_link: portfolio_link.map(str::to_string),
        });
    }

    /// Make every subsequent query fail like a dropped connection
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of queries issued against `table` so far
    pub fn query_count(&self, table: Table) -> usize {
        let counter = match table {
            Table::Article => &self.counts.article,
            Table::Media => &self.counts.media,
            Table::Link => &self.counts.link,
            Table::Tag => &self.counts.tag,
            Table::Author => &self.counts.author,
        };
        counter.load(Ordering::SeqCst)
    }

    fn begin(&self, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseConnection {
                message: "memory store is failing".to_string(),
            });
        }
        Ok(())
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn matches_text(tables: &Tables, article: &ArticleRow, query: &str) -> bool {
    let document: HashSet<String> = words(&article.title)
        .chain(words(&article.content))
        .chain(words(article.metadata.as_deref().unwrap_or("")))
        .collect();

    let mut terms = words(query).peekable();
    if terms.peek().is_some() && terms.all(|t| document.contains(&t)) {
        return true;
    }

    let needle = query.trim().to_lowercase();
    tables
        .tags
        .iter()
        .any(|t| t.article_id == article.id && t.name.to_lowercase().contains(&needle))
}

fn matches(tables: &Tables, article: &ArticleRow, filter: &ArticleFilter) -> bool {
    if filter.published_only && !article.is_published {
        return false;
    }
    if let Some(window) = filter.window {
        if !window.contains(article.published_at) {
            return false;
        }
    }
    if let Some(ref platform) = filter.platform {
        let associated = tables
            .platforms
            .iter()
            .any(|(id, p)| *id == article.id && p == platform);
        if !associated {
            return false;
        }
    }
    if let Some(ref slug) = filter.slug {
        if article.slug != *slug {
            return false;
        }
    }
    if let Some(ref text) = filter.text {
        if !matches_text(tables, article, text) {
            return false;
        }
    }
    true
}

#[async_trait]
impl NewsStore for MemoryStore {
    async fn select_articles(
        &self,
        filter: &ArticleFilter,
        order: ArticleOrder,
        limit: Option<u64>,
    ) -> Result<Vec<ArticleRow>> {
        self.begin(&self.counts.article)?;
        let tables = self.tables.read().await;

        let mut rows: Vec<ArticleRow> = tables
            .articles
            .iter()
            .filter(|a| matches(&tables, a, filter))
            .cloned()
            .collect();

        match order {
            ArticleOrder::NewestFirst => rows.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        }

        if let Some(limit) = limit {
            rows.truncate(limit as usize);
        }

        Ok(rows)
    }

    async fn select_media_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRow>> {
        self.begin(&self.counts.media)?;
        let tables = self.tables.read().await;
        Ok(tables
            .media
            .iter()
            .filter(|m| ids.contains(&m.article_id))
            .cloned()
            .collect())
    }

    async fn select_links_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<LinkRow>> {
        self.begin(&self.counts.link)?;
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| ids.contains(&l.article_id))
            .cloned()
            .collect())
    }

    async fn select_tags_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<TagRow>> {
        self.begin(&self.counts.tag)?;
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .iter()
            .filter(|t| ids.contains(&t.article_id))
            .cloned()
            .collect())
    }

    async fn select_authors_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRow>> {
        self.begin(&self.counts.author)?;
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .iter()
            .filter(|a| ids.contains(&a.article_id))
            .cloned()
            .collect())
    }

    async fn select_sitemap_entries(&self, since: DateTime<Utc>) -> Result<Vec<SitemapRow>> {
        self.begin(&self.counts.article)?;
        let tables = self.tables.read().await;

        let mut rows: Vec<&ArticleRow> = tables
            .articles
            .iter()
            .filter(|a| a.is_published && a.published_at >= since)
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        Ok(rows
            .into_iter()
            .map(|a| SitemapRow {
                slug: a.slug.clone(),
                updated_at: a.updated_at,
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseConnection {
                message: "memory store is failing".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, content: &str) -> ArticleRow {
        let now = Utc::now();
        ArticleRow {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            keywords: vec![],
            metadata: None,
            is_published: true,
            published_at: now,
            updated_at: now,
            event_date_en: None,
            event_date_np: None,
            og_image: None,
        }
    }

    #[tokio::test]
    async fn test_text_match_requires_every_word() {
        let store = MemoryStore::new();
        store
            .insert_article(article("Flood warning", "<p>Rivers rising in Kathmandu.</p>"))
            .await;

        let hit = ArticleFilter::published().matching("flood kathmandu");
        let miss = ArticleFilter::published().matching("flood Pokhara");

        assert_eq!(store.select_articles(&hit, ArticleOrder::NewestFirst, None).await.unwrap().len(), 1);
        assert!(store.select_articles(&miss, ArticleOrder::NewestFirst, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_substring_match() {
        let store = MemoryStore::new();
        let row = article("Viral image", "An old photo resurfaces.");
        let id = row.id;
        store.insert_article(row).await;
        store.add_tag(id, "Elections-2026").await;

        let filter = ArticleFilter::published().matching("ELECTION");
        let rows = store.select_articles(&filter, ArticleOrder::NewestFirst, None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_store_counts_and_errors() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let err = store.select_media_by_article_ids(&[Uuid::new_v4()]).await.unwrap_err();
        assert!(err.is_server_error());
        assert_eq!(store.query_count(Table::Media), 1);
        assert!(store.ping().await.is_err());
    }
}
