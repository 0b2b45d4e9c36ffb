//! Postgres implementation of the store accessor
//!
//! Every read goes to the replica when one is configured.

use crate::db::models::*;
use crate::db::store::{
    ArticleFilter, ArticleOrder, ArticleRow, AuthorRow, LinkRow, MediaRow, NewsStore,
    SitemapRow, TagRow,
};
use crate::db::DbPool;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use uuid::Uuid;

/// Full-text match over title, content and metadata, or a tag name substring.
/// `$1` is the raw query text, `$2` an escaped ILIKE pattern.
const SEARCH_CONDITION: &str = r#"(
    to_tsvector('simple', coalesce("article"."title", '') || ' ' || coalesce("article"."content", '') || ' ' || coalesce("article"."metadata", ''))
        @@ plainto_tsquery('simple', $1)
    OR EXISTS (
        SELECT 1 FROM "article_tag"
        INNER JOIN "tag" ON "article_tag"."tag_id" = "tag"."id"
        WHERE "article_tag"."article_id" = "article"."id"
          AND "tag"."name" ILIKE $2 ESCAPE '\'
    )
)"#;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }
}

/// Pattern matching `text` as a literal, case-insensitive substring
pub(crate) fn substring_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Article select for `filter`, in `order`, capped at `limit`
pub(crate) fn articles_query(
    filter: &ArticleFilter,
    order: ArticleOrder,
    limit: Option<u64>,
) -> Select<ArticleEntity> {
    let mut query = ArticleEntity::find();

    if filter.published_only {
        query = query.filter(ArticleColumn::IsPublished.eq(true));
    }

    if let Some(window) = filter.window {
        query = query
            .filter(ArticleColumn::CreatedAt.gt(window.after))
            .filter(ArticleColumn::CreatedAt.lte(window.until));
    }

    if let Some(ref platform) = filter.platform {
        // Platform is a Postgres enum; compare as text so unknown values match nothing
        query = query.filter(
            ArticleColumn::Id.in_subquery(
                Query::select()
                    .column(ArticlePlatformColumn::ArticleId)
                    .from(ArticlePlatformEntity)
                    .and_where(Expr::cust_with_values(
                        r#""article_platform"."platform"::text = $1"#,
                        [platform.clone()],
                    ))
                    .to_owned(),
            ),
        );
    }

    if let Some(ref text) = filter.text {
        query = query.filter(Expr::cust_with_values(
            SEARCH_CONDITION,
            [text.clone(), substring_pattern(text)],
        ));
    }

    if let Some(ref slug) = filter.slug {
        query = query.filter(ArticleColumn::Slug.eq(slug.as_str()));
    }

    query = match order {
        ArticleOrder::NewestFirst => query.order_by_desc(ArticleColumn::CreatedAt),
    };

    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    query
}

#[async_trait]
impl NewsStore for Repository {
    async fn select_articles(
        &self,
        filter: &ArticleFilter,
        order: ArticleOrder,
        limit: Option<u64>,
    ) -> Result<Vec<ArticleRow>> {
        let rows = articles_query(filter, order, limit)
            .all(self.read_conn())
            .await?;
        Ok(rows.into_iter().map(ArticleRow::from).collect())
    }

    async fn select_media_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<MediaRow>> {
        let rows = ArticleMediaEntity::find()
            .filter(ArticleMediaColumn::ArticleId.is_in(ids.iter().copied()))
            .order_by_asc(ArticleMediaColumn::SortOrder)
            .order_by_asc(ArticleMediaColumn::CreatedAt)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|m| MediaRow {
                article_id: m.article_id,
                media_type: m.media_type,
                url: m.url,
                sort_order: m.sort_order,
            })
            .collect())
    }

    async fn select_links_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<LinkRow>> {
        let rows = ArticleLinkEntity::find()
            .filter(ArticleLinkColumn::ArticleId.is_in(ids.iter().copied()))
            .order_by_asc(ArticleLinkColumn::SortOrder)
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|l| LinkRow {
                article_id: l.article_id,
                label: l.label,
                url: l.url,
                sort_order: l.sort_order,
            })
            .collect())
    }

    async fn select_tags_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<TagRow>> {
        ArticleTagEntity::find()
            .select_only()
            .column(ArticleTagColumn::ArticleId)
            .column_as(TagColumn::Name, "name")
            .inner_join(TagEntity)
            .filter(ArticleTagColumn::ArticleId.is_in(ids.iter().copied()))
            .into_model::<TagRow>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn select_authors_by_article_ids(&self, ids: &[Uuid]) -> Result<Vec<AuthorRow>> {
        ArticleAuthorEntity::find()
            .select_only()
            .column(ArticleAuthorColumn::ArticleId)
            .column_as(ReporterColumn::Name, "name")
            .column_as(ReporterColumn::PortfolioLink, "portfolio_link")
            .inner_join(ReporterEntity)
            .filter(ArticleAuthorColumn::ArticleId.is_in(ids.iter().copied()))
            .into_model::<AuthorRow>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn select_sitemap_entries(&self, since: DateTime<Utc>) -> Result<Vec<SitemapRow>> {
        ArticleEntity::find()
            .select_only()
            .column(ArticleColumn::Slug)
            .column(ArticleColumn::UpdatedAt)
            .filter(ArticleColumn::IsPublished.eq(true))
            .filter(ArticleColumn::CreatedAt.gte(since))
            .order_by_desc(ArticleColumn::CreatedAt)
            .into_model::<SitemapRow>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
