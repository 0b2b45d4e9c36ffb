//! News JSON handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::AppState;
use factcheck_common::{
    errors::{AppError, Result},
    news::{NewsDetail, NewsSummary},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Parsed leniently: anything that isn't a non-negative integer is page 0
    pub page: Option<String>,
    pub platform: Option<String>,
}

impl ListParams {
    fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub q: String,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Timeline page
pub async fn list_news(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<NewsSummary>>> {
    let results = state
        .news
        .paginated_news(params.page(), params.platform.as_deref(), Utc::now())
        .await?;

    Ok(Json(results))
}

/// Keyword search
pub async fn search_news(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<NewsSummary>>> {
    params.validate().map_err(|_| AppError::Validation {
        message: "Search query is required".to_string(),
        field: Some("q".to_string()),
    })?;

    let results = state.news.search_news(&params.q).await?;
    Ok(Json(results))
}

/// Article detail
pub async fn get_news(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<NewsDetail>> {
    state
        .news
        .news_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(AppError::NewsNotFound { slug })
}

#[cfg(test)]
mod tests {
    use crate::testing::*;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use factcheck_common::db::models::MediaType;
    use factcheck_common::db::{ArticleRow, MemoryStore};
    use serde_json::Value;
    use std::sync::Arc;
    use uuid::Uuid;

    fn article(slug: &str, title: &str, age: Duration, published: bool) -> ArticleRow {
        let at = Utc::now() - age;
        ArticleRow {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "<p>Claim reviewed by the desk.</p>".to_string(),
            slug: slug.to_string(),
            keywords: vec!["claim".to_string()],
            metadata: Some("Verdict: false".to_string()),
            is_published: published,
            published_at: at,
            updated_at: at,
            event_date_en: None,
            event_date_np: None,
            og_image: None,
        }
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let photo = article("flood-photo", "Flood photo is old", Duration::hours(2), true);
        let id = photo.id;
        store.insert_article(photo).await;
        store
            .insert_article(article("draft", "Flood draft", Duration::hours(1), false))
            .await;
        store
            .insert_article(article("older", "Older claim", Duration::days(7), true))
            .await;
        store.add_media(id, MediaType::Image, "/b.jpg", 2).await;
        store.add_media(id, MediaType::Image, "/a.jpg", 1).await;
        store.add_platform(id, "facebook").await;
        store.add_tag(id, "flood").await;
        store
    }

    async fn json(router: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = get(router, uri).await;
        let status = response.status();
        let body = body_string(response).await;
        (status, serde_json::from_str(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_news_pages() {
        let router = test_router(seeded().await, test_config("/nonexistent"));

        let (status, page0) = json(router.clone(), "/api/news").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page0.as_array().unwrap().len(), 1);
        assert_eq!(page0[0]["slug"], "flood-photo");
        assert_eq!(page0[0]["media"][0]["url"], "/a.jpg");
        assert!(page0[0].get("id").is_none());

        let (_, page1) = json(router.clone(), "/api/news?page=1").await;
        assert_eq!(page1[0]["slug"], "older");

        let (_, lenient) = json(router, "/api/news?page=abc").await;
        assert_eq!(lenient, page0);
    }

    #[tokio::test]
    async fn test_list_news_platform_filter() {
        let router = test_router(seeded().await, test_config("/nonexistent"));

        let (_, facebook) = json(router.clone(), "/api/news?platform=facebook").await;
        assert_eq!(facebook.as_array().unwrap().len(), 1);

        let (_, youtube) = json(router, "/api/news?platform=youtube").await;
        assert!(youtube.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let router = test_router(seeded().await, test_config("/nonexistent"));

        for uri in ["/api/news/search", "/api/news/search?q=", "/api/news/search?q=%20%20"] {
            let (status, body) = json(router.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["details"]["field"], "q");
            assert!(body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Search query is required"));
        }
    }

    #[tokio::test]
    async fn test_search_matches_published_only() {
        let router = test_router(seeded().await, test_config("/nonexistent"));

        let (status, hits) = json(router, "/api/news/search?q=flood").await;
        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<_> = hits
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["slug"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(slugs, vec!["flood-photo"]);
    }

    #[tokio::test]
    async fn test_get_news_detail_and_not_found() {
        let router = test_router(seeded().await, test_config("/nonexistent"));

        let (status, detail) = json(router.clone(), "/api/news/flood-photo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["keywords"][0], "claim");
        assert_eq!(detail["tags"][0], "flood");
        assert!(detail.get("ogImage").is_some());

        let (missing, _) = json(router.clone(), "/api/news/nope").await;
        let (hidden, _) = json(router, "/api/news/draft").await;
        assert_eq!(missing, StatusCode::NOT_FOUND);
        assert_eq!(hidden, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let store = seeded().await;
        store.set_failing(true);
        let router = test_router(store, test_config("/nonexistent"));

        let (status, body) = json(router, "/api/news").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "Internal Server Error");
    }
}
