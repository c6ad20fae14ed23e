//! Test fixtures with sample data.
//!
//! This module provides pre-built CMS payloads for use in tests.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Sample CMS article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SampleArticle {
    /// Article id
    pub id: u64,
    /// Title
    pub title: String,
    /// URL slug
    pub slug: String,
    /// Publication time
    pub published_at: Option<DateTime<Utc>>,
}

impl SampleArticle {
    /// A published article.
    #[must_use]
    pub fn published() -> Self {
        Self {
            id: 1,
            title: "Hello world".to_string(),
            slug: "hello-world".to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).single(),
        }
    }

    /// An unpublished draft.
    #[must_use]
    pub fn draft() -> Self {
        Self {
            id: 2,
            title: "Work in progress".to_string(),
            slug: "work-in-progress".to_string(),
            published_at: None,
        }
    }
}

/// Collection envelope as returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleCollection<T> {
    /// Items
    pub data: Vec<T>,
    /// Paging information
    pub meta: SamplePagination,
}

/// Paging information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SamplePagination {
    /// Current page
    pub page: u32,
    /// Items per page
    pub page_size: u32,
    /// Total items
    pub total: u64,
}

/// Both sample articles in a single page.
#[must_use]
pub fn article_collection() -> SampleCollection<SampleArticle> {
    SampleCollection {
        data: vec![SampleArticle::published(), SampleArticle::draft()],
        meta: SamplePagination {
            page: 1,
            page_size: 25,
            total: 2,
        },
    }
}

/// Validation error body returned with a 400.
#[must_use]
pub fn validation_error_body() -> Value {
    json!({
        "error": {
            "status": 400,
            "name": "ValidationError",
            "message": "title must be defined",
            "details": { "path": ["title"] }
        }
    })
}

/// Body returned with a 503.
#[must_use]
pub fn unavailable_body() -> Value {
    json!({ "error": { "status": 503, "name": "ServiceUnavailable" } })
}

/// Login metadata carrying credentials that must never reach a log sink.
#[must_use]
pub fn login_metadata() -> Value {
    json!({
        "userId": 42,
        "password": "hunter2",
        "session": {
            "accessToken": "eyJhbGciOi...",
            "refresh_token": "r-123",
            "expiresIn": 3600
        },
        "devices": [
            { "name": "laptop", "apiKey": "k-1" },
            { "name": "phone", "pin": "0000" }
        ]
    })
}
