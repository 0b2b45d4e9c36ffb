//! News query service
//!
//! Cache-aside reads over the store:
//! - Timeline pages, each a fixed window of days counted back from `now`
//! - Keyword search, capped and unpaginated
//! - Article detail by slug
//!
//! Only published articles are ever returned. Store failures propagate;
//! cache failures only cost a round trip to the store.

use super::assembler::RelationAssembler;
use super::model::{NewsDetail, NewsSummary};
use crate::cache::{generate_key, ResponseCache};
use crate::config::NewsConfig;
use crate::db::{ArticleFilter, ArticleOrder, DateWindow, NewsStore, SitemapRow};
use crate::errors::Result;
use crate::metrics::record_news_query;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Cache key prefix for timeline pages
pub const NEWS_LIST: &str = "news_list";
/// Cache key prefix for search results
pub const NEWS_SEARCH: &str = "news_search";
/// Cache key prefix for article detail
pub const NEWS_DETAIL: &str = "news_detail";

/// Platform key used when the timeline is not filtered
const ALL_PLATFORMS: &str = "all";

/// Window covered by timeline `page`: `(now - (page+1)*days, now - page*days]`.
///
/// `None` when the window lies outside the representable time range.
pub fn page_window(now: DateTime<Utc>, page: u32, days: u32) -> Option<DateWindow> {
    let until_days = i64::from(days).checked_mul(i64::from(page))?;
    let after_days = until_days.checked_add(i64::from(days))?;

    let until = now.checked_sub_signed(Duration::try_days(until_days)?)?;
    let after = now.checked_sub_signed(Duration::try_days(after_days)?)?;

    Some(DateWindow { after, until })
}

/// Read operations of the public news reader
#[derive(Clone)]
pub struct NewsService {
    store: Arc<dyn NewsStore>,
    assembler: RelationAssembler,
    cache: ResponseCache,
    config: NewsConfig,
}

impl NewsService {
    pub fn new(store: Arc<dyn NewsStore>, cache: ResponseCache, config: NewsConfig) -> Self {
        Self {
            assembler: RelationAssembler::new(store.clone()),
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Timeline page `page` (0 is the most recent window), newest first.
    ///
    /// An empty page is not an error. Clients treat it as the end of the
    /// feed, even though older windows may still hold articles.
    #[instrument(skip(self, now))]
    pub async fn paginated_news(
        &self,
        page: u32,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<NewsSummary>> {
        let start = Instant::now();
        let platform = platform.filter(|p| !p.is_empty());

        let key = generate_key(
            NEWS_LIST,
            &[
                ("page", page.to_string()),
                ("platform", platform.unwrap_or(ALL_PLATFORMS).to_string()),
            ],
        );

        let results = self
            .cache
            .get_or_load(&key, || self.load_page(page, platform, now))
            .await?;

        record_news_query(NEWS_LIST, start.elapsed().as_secs_f64(), results.len());
        Ok(results)
    }

    /// Published articles matching every word of `query` in title, content
    /// or metadata, or having a tag that contains `query`. Newest first.
    #[instrument(skip(self))]
    pub async fn search_news(&self, query: &str) -> Result<Vec<NewsSummary>> {
        let start = Instant::now();

        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        // Raw query text: differently cased queries get their own entries
        let key = generate_key(NEWS_SEARCH, &[("q", query.to_string())]);

        let results = self
            .cache
            .get_or_load(&key, || self.load_search(query.trim()))
            .await?;

        record_news_query(NEWS_SEARCH, start.elapsed().as_secs_f64(), results.len());
        Ok(results)
    }

    /// Published article with `slug`. Missing and unpublished articles are
    /// both `None`, and neither is cached.
    #[instrument(skip(self))]
    pub async fn news_by_slug(&self, slug: &str) -> Result<Option<NewsDetail>> {
        let start = Instant::now();
        let key = generate_key(NEWS_DETAIL, &[("slug", slug.to_string())]);

        if let Some(cached) = self.cache.get::<NewsDetail>(&key).await {
            record_news_query(NEWS_DETAIL, start.elapsed().as_secs_f64(), 1);
            return Ok(Some(cached));
        }

        let filter = ArticleFilter::published().with_slug(slug);
        let Some(row) = self
            .store
            .select_articles(&filter, ArticleOrder::NewestFirst, Some(1))
            .await?
            .into_iter()
            .next()
        else {
            record_news_query(NEWS_DETAIL, start.elapsed().as_secs_f64(), 0);
            return Ok(None);
        };

        let rel = self
            .assembler
            .load(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        let detail = NewsDetail {
            title: row.title,
            content: row.content,
            slug: row.slug,
            keywords: row.keywords,
            tags: rel.tags,
            authors: rel.authors,
            metadata: row.metadata.unwrap_or_default(),
            published_at: row.published_at,
            event_date_en: row.event_date_en,
            event_date_np: row.event_date_np,
            media: rel.media,
            links: rel.links,
            og_image: row.og_image,
        };

        self.cache.set(&key, &detail).await;

        record_news_query(NEWS_DETAIL, start.elapsed().as_secs_f64(), 1);
        Ok(Some(detail))
    }

    async fn load_page(
        &self,
        page: u32,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<NewsSummary>> {
        let Some(window) = page_window(now, page, self.config.window_days) else {
            debug!(page, "Page window out of range");
            return Ok(Vec::new());
        };

        let mut filter = ArticleFilter::published().within(window);
        if let Some(platform) = platform {
            filter = filter.on_platform(platform);
        }

        let rows = self
            .store
            .select_articles(&filter, ArticleOrder::NewestFirst, None)
            .await?;
        let results = self.assembler.attach(rows).await?;

        debug!(page, count = results.len(), "Timeline page loaded");
        Ok(results)
    }

    async fn load_search(&self, query: &str) -> Result<Vec<NewsSummary>> {
        let filter = ArticleFilter::published().matching(query);
        let rows = self
            .store
            .select_articles(&filter, ArticleOrder::NewestFirst, Some(self.config.search_limit))
            .await?;
        let results = self.assembler.attach(rows).await?;

        debug!(count = results.len(), "Search completed");
        Ok(results)
    }

    /// Slugs of articles published in the last `sitemap_days` days
    #[instrument(skip(self))]
    pub async fn sitemap_entries(&self, now: DateTime<Utc>) -> Result<Vec<SitemapRow>> {
        let since = Duration::try_days(i64::from(self.config.sitemap_days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        self.store.select_sitemap_entries(since).await
    }

    /// Store connectivity. Requests cannot be served without it.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Cache connectivity. A down cache only costs store round trips.
    pub async fn ping_cache(&self) -> Result<()> {
        self.cache.ping().await
    }
}
