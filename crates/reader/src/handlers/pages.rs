//! HTML pages and the sitemap
//!
//! The reader frontend is a static single-page app. Article pages get their
//! share metadata filled in server side so link previews work without
//! running any script.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use std::path::Path as FsPath;

use crate::AppState;
use factcheck_common::{config::ServerConfig, errors::Result, news::NewsDetail};

const DEFAULT_TITLE: &str = "Kantipur | Fact Checker";
const NOT_FOUND_TITLE: &str = "News Not Found | Kantipur";
const NOT_FOUND_DESCRIPTION: &str = "The requested news could not be found.";
const FALLBACK_IMAGE: &str = "/og_image.png";

/// Escape text for HTML attribute and element content
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_absolute_url(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve `url` against `origin`. Protocol-relative URLs become https.
pub fn to_absolute_url(url: &str, origin: &str) -> String {
    if url.is_empty() || is_absolute_url(url) {
        return url.to_string();
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if origin.is_empty() {
        return url.to_string();
    }
    if url.starts_with('/') {
        format!("{}{}", origin, url)
    } else {
        format!("{}/{}", origin, url)
    }
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_string()
}

fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Public origin for absolute links: configured origin first, then the
/// forwarding headers of a proxy, then `Host`
pub fn request_origin(server: &ServerConfig, headers: &HeaderMap) -> String {
    let configured = server
        .public_origin
        .as_deref()
        .or_else(|| server.allowed_origins.first().map(String::as_str))
        .map(normalize_origin)
        .filter(|o| !o.is_empty());
    if let Some(origin) = configured {
        return origin;
    }

    if let (Some(proto), Some(host)) = (
        first_header_value(headers, "x-forwarded-proto"),
        first_header_value(headers, "x-forwarded-host"),
    ) {
        return normalize_origin(&format!("{}://{}", proto, host));
    }

    match first_header_value(headers, header::HOST.as_str()) {
        Some(host) => normalize_origin(&format!("http://{}", host)),
        None => String::new(),
    }
}

/// Values substituted into the article page template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareMeta {
    pub title: String,
    pub description: String,
    pub image: String,
    pub url: String,
}

impl ShareMeta {
    fn for_article(news: Option<&NewsDetail>, origin: &str, page_url: &str) -> Self {
        let fallback_image = format!("{}{}", origin, FALLBACK_IMAGE);

        match news {
            Some(news) => {
                let title = if news.title.is_empty() {
                    DEFAULT_TITLE.to_string()
                } else {
                    news.title.clone()
                };
                let raw_image = news.preview_image().unwrap_or(&fallback_image);
                Self {
                    title,
                    description: news.title.clone(),
                    image: to_absolute_url(raw_image, origin),
                    url: page_url.to_string(),
                }
            }
            None => Self {
                title: NOT_FOUND_TITLE.to_string(),
                description: NOT_FOUND_DESCRIPTION.to_string(),
                image: to_absolute_url(&fallback_image, origin),
                url: page_url.to_string(),
            },
        }
    }

    /// Fill the `__META_*__` placeholders of `template`
    pub fn render(&self, template: &str) -> String {
        template
            .replace("__META_TITLE__", &escape_html(&self.title))
            .replace("__META_DESCRIPTION__", &escape_html(&self.description))
            .replace("__META_IMAGE__", &escape_html(&self.image))
            .replace("__META_URL__", &escape_html(&self.url))
    }
}

async fn read_static(dir: &str, file: &str) -> std::io::Result<String> {
    tokio::fs::read_to_string(FsPath::new(dir).join(file)).await
}

fn no_store(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Frontend entry page
pub async fn index(State(state): State<AppState>) -> Response {
    match read_static(&state.config.server.static_dir, "index.html").await {
        Ok(html) => no_store(Html(html)),
        Err(_) => "Reader API is running".into_response(),
    }
}

async fn render_news_page(state: &AppState, slug: &str, origin: &str) -> Result<String> {
    let news = state.news.news_by_slug(slug).await?;
    let template = read_static(&state.config.server.static_dir, "news.html").await?;

    let page_url = if origin.is_empty() {
        String::new()
    } else {
        format!("{}/n/{}", origin, slug)
    };

    Ok(ShareMeta::for_article(news.as_ref(), origin, &page_url).render(&template))
}

/// Article page with share metadata injected
pub async fn news_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let origin = request_origin(&state.config.server, &headers);

    match render_news_page(&state, &slug, &origin).await {
        Ok(html) => no_store(Html(html)),
        Err(e) => {
            tracing::error!(error = %e, slug = %slug, "Share metadata injection failed");
            match read_static(&state.config.server.static_dir, "index.html").await {
                Ok(html) => Html(html).into_response(),
                Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
            }
        }
    }
}

/// Sitemap of the home page and recent articles
pub async fn sitemap(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let entries = match state.news.sitemap_entries(Utc::now()).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(error = %e, "Sitemap generation failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error generating sitemap").into_response();
        }
    };

    let base = escape_html(&request_origin(&state.config.server, &headers));

    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    ));
    xml.push_str(&format!(
        "  <url>\n    <loc>{}/</loc>\n    <changefreq>daily</changefreq>\n    <priority>1.0</priority>\n  </url>\n",
        base
    ));
    for entry in entries {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}/n/{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>weekly</changefreq>\n    <priority>0.8</priority>\n  </url>\n",
            base,
            escape_html(&entry.slug),
            entry.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        ));
    }
    xml.push_str("</urlset>");

    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

/// Client-side routes get the frontend; API paths and asset-like paths don't
pub async fn spa_fallback(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();
    if path.starts_with("/api") || path.contains('.') {
        return StatusCode::NOT_FOUND.into_response();
    }

    match read_static(&state.config.server.static_dir, "index.html").await {
        Ok(html) => no_store(Html(html)),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
