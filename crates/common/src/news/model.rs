//! Response shapes of the news read path
//!
//! These are what the reader serializes to clients and what the response
//! cache stores, so field names are the public camelCase ones.

use crate::db::models::MediaType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkItem {
    pub label: Option<String>,
    pub url: String,
    pub sort_order: i32,
}

/// Resolved article author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub portfolio_link: Option<String>,
}

/// Timeline and search entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSummary {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub metadata: Option<String>,
    pub published_at: DateTime<Utc>,
    pub event_date_en: Option<NaiveDate>,
    pub event_date_np: Option<String>,
    pub media: Vec<MediaItem>,
    pub links: Vec<LinkItem>,
    pub tags: Vec<String>,
    pub authors: Vec<Author>,
}

/// Full article as shown on its own page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsDetail {
    pub title: String,
    pub content: String,
    pub slug: String,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
    pub authors: Vec<Author>,
    /// Empty string when the article has none
    pub metadata: String,
    pub published_at: DateTime<Utc>,
    pub event_date_en: Option<NaiveDate>,
    pub event_date_np: Option<String>,
    pub media: Vec<MediaItem>,
    pub links: Vec<LinkItem>,
    pub og_image: Option<String>,
}

impl NewsDetail {
    /// Image for share previews: the override, else the first media item
    pub fn preview_image(&self) -> Option<&str> {
        self.og_image
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.media.first().map(|m| m.url.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = NewsSummary {
            title: "t".into(),
            slug: "s".into(),
            content: "c".into(),
            metadata: None,
            published_at: Utc::now(),
            event_date_en: NaiveDate::from_ymd_opt(2026, 1, 2),
            event_date_np: Some("२०८२-०९-१८".into()),
            media: vec![MediaItem {
                media_type: MediaType::VideoUrl,
                url: "https://youtu.be/x".into(),
                sort_order: 1,
            }],
            links: vec![],
            tags: vec!["flood".into()],
            authors: vec![Author {
                name: "Sita".into(),
                portfolio_link: None,
            }],
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("publishedAt").is_some());
        assert_eq!(json["eventDateEn"], "2026-01-02");
        assert_eq!(json["media"][0]["type"], "video_url");
        assert_eq!(json["media"][0]["sortOrder"], 1);
        assert!(json["authors"][0].get("portfolioLink").is_some());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_preview_image_fallback() {
        let mut detail = NewsDetail {
            title: "t".into(),
            content: String::new(),
            slug: "s".into(),
            keywords: vec![],
            tags: vec![],
            authors: vec![],
            metadata: String::new(),
            published_at: Utc::now(),
            event_date_en: None,
            event_date_np: None,
            media: vec![MediaItem {
                media_type: MediaType::Image,
                url: "/uploads/a.jpg".into(),
                sort_order: 1,
            }],
            links: vec![],
            og_image: Some(String::new()),
        };
        assert_eq!(detail.preview_image(), Some("/uploads/a.jpg"));

        detail.og_image = Some("https://cdn/og.png".into());
        assert_eq!(detail.preview_image(), Some("https://cdn/og.png"));

        detail.og_image = None;
        detail.media.clear();
        assert_eq!(detail.preview_image(), None);
    }
}
