//! Relation assembler
//!
//! Fetches media, links, tags and authors for a batch of articles with one
//! query per relation, then groups the rows back onto their articles.

use super::model::{Author, LinkItem, MediaItem, NewsSummary};
use crate::db::{ArticleRow, NewsStore};
use crate::errors::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Child collections of one article, ids stripped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    pub media: Vec<MediaItem>,
    pub links: Vec<LinkItem>,
    pub tags: Vec<String>,
    pub authors: Vec<Author>,
}

#[derive(Clone)]
pub struct RelationAssembler {
    store: Arc<dyn NewsStore>,
}

impl RelationAssembler {
    pub fn new(store: Arc<dyn NewsStore>) -> Self {
        Self { store }
    }

    /// Relations for every id in `ids`. Ids without children map to empty
    /// collections; an empty batch issues no queries.
    pub async fn load(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Relations>> {
        let mut grouped: HashMap<Uuid, Relations> =
            ids.iter().map(|id| (*id, Relations::default())).collect();

        if ids.is_empty() {
            return Ok(grouped);
        }

        let (media, links, tags, authors) = tokio::try_join!(
            self.store.select_media_by_article_ids(ids),
            self.store.select_links_by_article_ids(ids),
            self.store.select_tags_by_article_ids(ids),
            self.store.select_authors_by_article_ids(ids),
        )?;

        debug!(
            articles = ids.len(),
            media = media.len(),
            links = links.len(),
            tags = tags.len(),
            authors = authors.len(),
            "Loaded article relations"
        );

        for m in media {
            if let Some(r) = grouped.get_mut(&m.article_id) {
                r.media.push(MediaItem {
                    media_type: m.media_type,
                    url: m.url,
                    sort_order: m.sort_order,
                });
            }
        }

        for l in links {
            if let Some(r) = grouped.get_mut(&l.article_id) {
                r.links.push(LinkItem {
                    label: l.label,
                    url: l.url,
                    sort_order: l.sort_order,
                });
            }
        }

        for t in tags {
            if let Some(r) = grouped.get_mut(&t.article_id) {
                r.tags.push(t.name);
            }
        }

        for a in authors {
            if let Some(r) = grouped.get_mut(&a.article_id) {
                r.authors.push(Author {
                    name: a.name,
                    portfolio_link: a.portfolio_link,
                });
            }
        }

        // Stable: equal sort orders keep fetch order
        for r in grouped.values_mut() {
            r.media.sort_by_key(|m| m.sort_order);
            r.links.sort_by_key(|l| l.sort_order);
        }

        Ok(grouped)
    }

    /// Summaries for `rows`, in the same order
    pub async fn attach(&self, rows: Vec<ArticleRow>) -> Result<Vec<NewsSummary>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut relations = self.load(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let rel = relations.remove(&row.id).unwrap_or_default();
                NewsSummary {
                    title: row.title,
                    slug: row.slug,
                    content: row.content,
                    metadata: row.metadata,
                    published_at: row.published_at,
                    event_date_en: row.event_date_en,
                    event_date_np: row.event_date_np,
                    media: rel.media,
                    links: rel.links,
                    tags: rel.tags,
                    authors: rel.authors,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::Table;
    use crate::db::models::MediaType;
    use crate::db::MemoryStore;
    use chrono::Utc;

    fn row(slug: &str) -> ArticleRow {
        let now = Utc::now();
        ArticleRow {
            id: Uuid::new_v4(),
            title: slug.to_uppercase(),
            content: String::new(),
            slug: slug.to_string(),
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
    async fn test_one_query_per_relation() {
        let store = Arc::new(MemoryStore::new());
        let rows: Vec<ArticleRow> = (0..5).map(|i| row(&format!("a{}", i))).collect();
        for r in &rows {
            store.add_media(r.id, MediaType::Image, "/x.jpg", 1).await;
            store.add_link(r.id, None, "https://example.com", 1).await;
            store.add_tag(r.id, "politics").await;
            store.add_author(r.id, "Hari", None).await;
        }

        let assembler = RelationAssembler::new(store.clone());
        let summaries = assembler.attach(rows).await.unwrap();

        assert_eq!(summaries.len(), 5);
        assert!(summaries.iter().all(|s| s.media.len() == 1 && s.tags == vec!["politics"]));
        for table in [Table::Media, Table::Link, Table::Tag, Table::Author] {
            assert_eq!(store.query_count(table), 1);
        }
    }

    #[tokio::test]
    async fn test_groups_and_sorts_per_article() {
        let store = Arc::new(MemoryStore::new());
        let a = row("a");
        let b = row("b");
        for order in [3, 1, 2] {
            store
                .add_media(a.id, MediaType::Image, &format!("/a{}.jpg", order), order)
                .await;
        }
        store.add_link(b.id, Some("second"), "https://two", 2).await;
        store.add_link(b.id, Some("first"), "https://one", 1).await;
        store.add_author(b.id, "Gita", Some("https://gita.dev")).await;

        let assembler = RelationAssembler::new(store);
        let relations = assembler.load(&[a.id, b.id]).await.unwrap();

        let orders: Vec<i32> = relations[&a.id].media.iter().map(|m| m.sort_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert!(relations[&a.id].links.is_empty());

        let labels: Vec<_> = relations[&b.id].links.iter().map(|l| l.label.clone()).collect();
        assert_eq!(labels, vec![Some("first".to_string()), Some("second".to_string())]);
        assert_eq!(relations[&b.id].authors[0].portfolio_link.as_deref(), Some("https://gita.dev"));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let store = Arc::new(MemoryStore::new());
        let assembler = RelationAssembler::new(store.clone());

        assert!(assembler.attach(vec![]).await.unwrap().is_empty());
        assert_eq!(store.query_count(Table::Media), 0);
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let assembler = RelationAssembler::new(store);

        assert!(assembler.attach(vec![row("a")]).await.is_err());
    }
}
