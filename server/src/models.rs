//! Wire types for the broadsheet API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use broadsheet::Issue;

/// Query parameters for `/newspaper/date`.
#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// Query parameters for `/newspaper/dates`.
#[derive(Debug, Deserialize)]
pub struct DatesQuery {
    pub month: Option<String>,
    pub year: Option<String>,
}

/// Query parameters for the paginated listing endpoints. Values arrive as
/// raw strings; malformed numbers fall back to defaults.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    #[serde(rename = "includeFuture")]
    pub include_future: Option<String>,
}

/// Summary block returned by a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewspaperDetails {
    pub id: String,
    pub title: String,
    pub page_count: u32,
    pub date: DateTime<Utc>,
    pub is_published: bool,
}

impl From<&Issue> for NewspaperDetails {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            title: issue.title.clone(),
            page_count: issue.total_pages,
            date: issue.publication_date,
            is_published: issue.is_published,
        }
    }
}

/// Response for a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub newspaper_details: NewspaperDetails,
}

/// Envelope for single-payload responses.
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

/// One calendar day carrying a published issue.
#[derive(Debug, Clone, Serialize)]
pub struct DayEntry {
    pub date: String,
    pub id: String,
}

/// Pagination block for the one-issue-per-page listing endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_newspapers: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Response for the paginated listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub success: bool,
    pub data: Vec<Issue>,
    pub pagination: Pagination,
}

/// Plain confirmation response.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
