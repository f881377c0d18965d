//! External book catalog gateway.
//!
//! Wraps the public volumes API used for book discovery. Results are
//! flattened into [`BookSummary`], the snapshot type stored alongside
//! user records so they stay stable if the catalog entry changes.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Cover image URLs for a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageLinks {
    /// Regular thumbnail URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Small thumbnail URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_thumbnail: Option<String>,
}

/// Book metadata as exposed to the rest of the application.
///
/// Also used as the frozen snapshot stored with progress entries,
/// reviews, list entries and exchange offers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSummary {
    /// External catalog ID.
    pub id: String,
    /// Book title.
    pub title: String,
    /// Authors.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Publication date (free-form, as the catalog reports it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Page count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Categories / genres.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Cover image URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_links: Option<ImageLinks>,
    /// Language code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Average rating reported by the catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    /// Publisher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

/// Result page of a catalog search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Books on this page.
    pub items: Vec<BookSummary>,
    /// Total matches reported by the catalog.
    pub total_items: u32,
}

// Wire types for the upstream volumes API.

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
    #[serde(default, rename = "totalItems")]
    total_items: u32,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    description: Option<String>,
    published_date: Option<String>,
    page_count: Option<u32>,
    #[serde(default)]
    categories: Vec<String>,
    image_links: Option<WireImageLinks>,
    language: Option<String>,
    average_rating: Option<f64>,
    publisher: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl Volume {
    fn into_summary(self) -> BookSummary {
        let info = self.volume_info;
        BookSummary {
            id: self.id,
            title: info.title.unwrap_or_else(|| "Unknown".to_string()),
            authors: info.authors,
            description: info.description,
            published_date: info.published_date,
            page_count: info.page_count,
            categories: info.categories,
            image_links: info.image_links.map(|l| ImageLinks {
                thumbnail: l.thumbnail,
                small_thumbnail: l.small_thumbnail,
            }),
            language: info.language,
            average_rating: info.average_rating,
            publisher: info.publisher,
        }
    }
}

/// Client for the external book catalog.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// A missing API key degrades the upstream rate limits but does not
    /// block operation.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            tracing::warn!("No catalog API key configured, requests may be rate limited");
        }

        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Search the catalog.
    ///
    /// An empty or whitespace-only query returns an empty result page
    /// without touching the network.
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        start_index: u32,
        language: Option<&str>,
    ) -> Result<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResults {
                items: Vec::new(),
                total_items: 0,
            });
        }

        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("maxResults", max_results.to_string()),
            ("startIndex", start_index.to_string()),
        ];

        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            params.push(("langRestrict", lang.to_string()));
        }

        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self
            .http
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Catalog search request failed");
                AppError::Upstream("Could not search the book catalog".to_string())
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Catalog search returned an error");
            return Err(AppError::Upstream(
                "Could not search the book catalog".to_string(),
            ));
        }

        let body: VolumesResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Catalog search response was malformed");
            AppError::Upstream("Could not search the book catalog".to_string())
        })?;

        Ok(SearchResults {
            items: body.items.into_iter().map(Volume::into_summary).collect(),
            total_items: body.total_items,
        })
    }

    /// Fetch a single book by its catalog ID.
    pub async fn get_book(&self, book_id: &str) -> Result<BookSummary> {
        let url = format!("{}/{}", self.base_url, book_id);

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, book_id, "Catalog lookup request failed");
            AppError::Upstream("Could not fetch book details".to_string())
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("book {}", book_id)));
        }

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), book_id, "Catalog lookup returned an error");
            return Err(AppError::Upstream(
                "Could not fetch book details".to_string(),
            ));
        }

        let volume: Volume = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, book_id, "Catalog lookup response was malformed");
            AppError::Upstream("Could not fetch book details".to_string())
        })?;

        Ok(volume.into_summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CatalogClient {
        CatalogClient::new("http://127.0.0.1:1/volumes", None)
    }

    #[test]
    fn empty_query_short_circuits() {
        // Base URL points nowhere, so any network call would fail.
        let results = tokio_test::block_on(client().search("", 20, 0, None)).unwrap();
        assert!(results.items.is_empty());
        assert_eq!(results.total_items, 0);

        let results = tokio_test::block_on(client().search("   ", 20, 0, None)).unwrap();
        assert!(results.items.is_empty());
    }

    #[test]
    fn volume_flattening() {
        let json = r#"{
            "items": [{
                "id": "abc123",
                "volumeInfo": {
                    "title": "The Hobbit",
                    "authors": ["J. R. R. Tolkien"],
                    "pageCount": 310,
                    "categories": ["Fantasy"],
                    "imageLinks": {"thumbnail": "http://example/t.jpg"},
                    "language": "en",
                    "averageRating": 4.5
                }
            }],
            "totalItems": 1
        }"#;

        let parsed: VolumesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.total_items, 1);

        let book = parsed.items.into_iter().next().unwrap().into_summary();
        assert_eq!(book.id, "abc123");
        assert_eq!(book.title, "The Hobbit");
        assert_eq!(book.page_count, Some(310));
        assert_eq!(book.categories, vec!["Fantasy"]);
        assert_eq!(
            book.image_links.unwrap().thumbnail.as_deref(),
            Some("http://example/t.jpg")
        );
    }

    #[test]
    fn missing_items_field_is_empty() {
        let parsed: VolumesResponse = serde_json::from_str(r#"{"totalItems": 0}"#).unwrap();
        assert!(parsed.items.is_empty());
    }
}
