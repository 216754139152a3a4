//! HTTP handlers for the broadsheet API

use std::sync::Arc;

use axum::{
    extract::multipart::{Field, MultipartError},
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, Utc};

use broadsheet::db::issue_repo;
use broadsheet::{Issue, UploadJob};

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Ingest one uploaded PDF issue.
///
/// Expects a multipart form with the file under `pdf` and optional text
/// fields `title`, `publicationDate` (RFC 3339 or `YYYY-MM-DD`) and
/// `externalVideoLink`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file = None;
    let mut title = None;
    let mut publication_date = None;
    let mut external_video_link = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf" => {
                let filename = field
                    .file_name()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "upload.pdf".to_string());
                let content_type = field.content_type().map(|c| c.to_string());
                let data = field.bytes().await.map_err(bad_multipart)?;
                file = Some((data, filename, content_type));
            }
            "title" => title = Some(read_text(field, "title").await?),
            "publicationDate" => {
                let raw = read_text(field, "publicationDate").await?;
                publication_date = Some(parse_publication_date(&raw, &state.display_offset)?);
            }
            "externalVideoLink" => {
                external_video_link = Some(read_text(field, "externalVideoLink").await?);
            }
            _ => {}
        }
    }

    let (bytes, filename, content_type) = file.ok_or_else(|| {
        ApiError::BadRequest("No PDF file was uploaded (expected form field 'pdf')".to_string())
    })?;

    let job = UploadJob {
        bytes,
        filename,
        content_type,
        title,
        publication_date,
        external_video_link,
    };

    let (result, _ctx) = state.pipeline.run(job).await;
    let issue = result?;

    Ok(Json(UploadResponse {
        success: true,
        message: "Newspaper uploaded successfully".to_string(),
        newspaper_details: NewspaperDetails::from(&issue),
    }))
}

/// Latest published issue.
pub async fn latest(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Issue>>, ApiError> {
    let issue = issue_repo::find_latest_published(&state.db)?
        .ok_or_else(|| ApiError::NotFound("No published newspaper available".to_string()))?;

    Ok(Json(DataResponse {
        success: true,
        data: issue,
    }))
}

/// Published issue for one calendar day.
pub async fn by_date(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<DataResponse<Issue>>, ApiError> {
    let raw = query
        .date
        .ok_or_else(|| ApiError::BadRequest("Missing 'date' query parameter".to_string()))?;

    let day = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{raw}': expected YYYY-MM-DD")))?
        .format("%Y-%m-%d")
        .to_string();

    let issue = issue_repo::find_by_day(&state.db, &day)?
        .ok_or_else(|| ApiError::NotFound(format!("No newspaper found for {day}")))?;

    Ok(Json(DataResponse {
        success: true,
        data: issue,
    }))
}

/// Calendar days with a published issue, optionally scoped to one month.
pub async fn dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatesQuery>,
) -> Result<Json<DataResponse<Vec<DayEntry>>>, ApiError> {
    let month = match query.month.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.parse::<u32>()
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("Invalid month '{raw}': expected 1-12"))
                })?,
        ),
    };
    let year = match query.year.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.parse::<i32>()
                .ok()
                .filter(|y| *y >= 0)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid year '{raw}'")))?,
        ),
    };

    let data = issue_repo::list_days(&state.db, month, year)?
        .into_iter()
        .map(|(date, id)| DayEntry { date, id })
        .collect();

    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}

/// One published issue per page, newest first.
pub async fn page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>, ApiError> {
    paginated(&state, &query, false)
}

/// Like [`page`], but `includeFuture=true` widens the listing to issues
/// whose publication date has not arrived yet.
pub async fn future(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>, ApiError> {
    let include_future = query.include_future.as_deref() == Some("true");
    paginated(&state, &query, include_future)
}

/// Delete an issue and its stored page images.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let issue = issue_repo::find_by_id(&state.db, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("No newspaper with id {id}")))?;

    // Storage cleanup is best effort; a missing or unreachable object
    // must not block removal of the record.
    for url in &issue.page_image_urls {
        if let Err(error) = state.media.delete_by_url(url).await {
            tracing::warn!(%error, %url, "could not delete stored page image");
        }
    }

    if !issue_repo::delete(&state.db, &id)? {
        return Err(ApiError::NotFound(format!("No newspaper with id {id}")));
    }

    tracing::info!(issue_id = %id, "newspaper deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Newspaper deleted successfully".to_string(),
    }))
}

fn paginated(
    state: &AppState,
    query: &PageQuery,
    include_future: bool,
) -> Result<Json<PageResponse>, ApiError> {
    let current_page = query
        .page
        .as_deref()
        .and_then(|p| p.parse::<u64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);

    let (issue, total) = issue_repo::find_page(&state.db, current_page, include_future)?;

    // One issue per page, so the page count equals the issue count.
    let pagination = Pagination {
        current_page,
        total_pages: total,
        total_newspapers: total,
        has_next_page: current_page < total,
        has_previous_page: current_page > 1,
    };

    Ok(Json(PageResponse {
        success: true,
        data: issue.into_iter().collect(),
        pagination,
    }))
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Could not read form field '{name}': {e}")))
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Malformed multipart body: {e}"))
}

/// Accepts full RFC 3339 stamps or bare `YYYY-MM-DD` days; a bare day
/// means midnight in the portal's display timezone.
fn parse_publication_date(raw: &str, offset: &FixedOffset) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.with_timezone(&Utc));
    }

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            if let LocalResult::Single(local) = midnight.and_local_timezone(*offset) {
                return Ok(local.with_timezone(&Utc));
            }
        }
    }

    Err(ApiError::BadRequest(format!(
        "Invalid publicationDate '{raw}': expected RFC 3339 or YYYY-MM-DD"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use broadsheet::db::NewIssue;
    use broadsheet::{
        ConversionWorkspace, Database, IngestPipeline, MediaStore, StorageConfig,
    };
    use http_body_util::BodyExt;
    use lopdf::{dictionary, Document, Object, Stream};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "broadsheet-test-boundary";
    const PUBLIC_URL: &str = "http://localhost:3000/uploads";

    /// Builds a minimal valid PDF with the given number of pages.
    fn pdf_with_pages(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for n in 1..=count {
            let content = format!("BT /F1 12 Tf 50 700 Td (Page {}) Tj ET", n);
            let content_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {},
                content.into_bytes(),
            )));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes).unwrap();
        pdf_bytes
    }

    struct Harness {
        app: Router,
        db: Database,
        bucket: TempDir,
        _scratch: TempDir,
    }

    fn harness() -> Harness {
        let scratch = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();

        let workspace = ConversionWorkspace::new(scratch.path());
        let storage = StorageConfig::local(bucket.path().to_str().unwrap());
        let media = MediaStore::from_config(&storage, PUBLIC_URL).unwrap();
        let db = Database::open_in_memory().unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();

        let pipeline = IngestPipeline::new(workspace, media.clone(), db.clone(), offset);
        let state = AppState {
            pipeline,
            db: db.clone(),
            media,
            display_offset: offset,
            local_media_root: storage.local_root(),
        };

        Harness {
            app: crate::app(Arc::new(state)),
            db,
            bucket,
            _scratch: scratch,
        }
    }

    /// Multipart body with optional text fields followed by the `pdf` file.
    fn multipart_body(pdf: Option<&[u8]>, fields: &[(&str, &str)], filename: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(pdf) = pdf {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf\"; \
                     filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(pdf);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_upload(
        app: &Router,
        pdf: Option<&[u8]>,
        fields: &[(&str, &str)],
        filename: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/newspaper/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(pdf, fields, filename)))
            .unwrap();
        send(app, request).await
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        send(app, request).await
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn seed_issue(db: &Database, title: &str, date: &str) -> broadsheet::Issue {
        let new_issue = NewIssue {
            title: title.to_string(),
            original_filename: format!("{title}.pdf"),
            page_image_urls: vec![format!("{PUBLIC_URL}/newspapers/{title}-1.jpg")],
            publication_date: date.parse().unwrap(),
            external_video_link: None,
        };
        issue_repo::insert(db, new_issue, &FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn stored_page_count(bucket: &TempDir) -> usize {
        let dir = bucket.path().join("newspapers");
        if !dir.exists() {
            return 0;
        }
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_upload_three_pages_end_to_end() {
        let h = harness();

        let (status, json) =
            post_upload(&h.app, Some(&pdf_with_pages(3)), &[], "sunday-herald.pdf").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], Value::Bool(true));
        let details = &json["newspaperDetails"];
        assert_eq!(details["pageCount"].as_u64(), Some(3));
        assert_eq!(details["title"].as_str(), Some("sunday-herald"));
        // No publicationDate given, so the issue dates "now" and is live.
        assert_eq!(details["isPublished"].as_bool(), Some(true));

        let (status, json) = get(&h.app, "/newspaper").await;
        assert_eq!(status, StatusCode::OK);
        let urls = json["data"]["pageImageUrls"].as_array().unwrap();
        assert_eq!(urls.len(), 3);
        for url in urls {
            assert!(url.as_str().unwrap().starts_with(PUBLIC_URL));
        }
        assert_eq!(stored_page_count(&h.bucket), 3);
    }

    #[tokio::test]
    async fn test_future_dated_upload_stays_unpublished() {
        let h = harness();
        let future_date = (Utc::now() + chrono::Duration::days(2)).to_rfc3339();

        let (status, json) = post_upload(
            &h.app,
            Some(&pdf_with_pages(1)),
            &[("publicationDate", &future_date)],
            "tomorrow.pdf",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["newspaperDetails"]["isPublished"].as_bool(), Some(false));

        // Not visible through the published-only endpoints.
        let (status, _) = get(&h.app, "/newspaper").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, json) = get(&h.app, "/newspaper/future").await;
        assert_eq!(json["data"].as_array().unwrap().len(), 0);

        // Visible once the future flag is set.
        let (status, json) = get(&h.app, "/newspaper/future?includeFuture=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["pagination"]["totalNewspapers"].as_u64(), Some(1));
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_stored_images() {
        let h = harness();

        let (_, json) = post_upload(&h.app, Some(&pdf_with_pages(2)), &[], "old-issue.pdf").await;
        let id = json["newspaperDetails"]["id"].as_str().unwrap().to_string();
        let date = json["newspaperDetails"]["date"].as_str().unwrap().to_string();
        let day = &date[..10];
        assert_eq!(stored_page_count(&h.bucket), 2);

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/newspaper/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], Value::Bool(true));

        let (status, _) = get(&h.app, &format!("/newspaper/date?date={day}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(stored_page_count(&h.bucket), 0);

        // A second delete of the same id is a 404, not a crash.
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/newspaper/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_rejected() {
        let h = harness();

        let (status, json) = post_upload(&h.app, None, &[("title", "no file")], "x.pdf").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], Value::Bool(false));
        assert!(json["message"].as_str().unwrap().contains("pdf"));
    }

    #[tokio::test]
    async fn test_upload_of_non_pdf_is_rejected() {
        let h = harness();

        // The helper always labels the part application/pdf, so hand-roll
        // a part with a text content type.
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf\"; \
                 filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/newspaper/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, json) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], Value::Bool(false));
    }

    #[tokio::test]
    async fn test_upload_of_corrupt_pdf_reports_validation_error() {
        let h = harness();

        let (status, json) =
            post_upload(&h.app, Some(b"not a pdf at all"), &[], "broken.pdf").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], Value::Bool(false));
        assert!(json["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_second_upload_on_same_day_is_rejected() {
        let h = harness();

        // First upload uses the bare-day form, the second a full stamp on
        // the same calendar day.
        let (status, _) = post_upload(
            &h.app,
            Some(&pdf_with_pages(1)),
            &[("publicationDate", "2026-01-05")],
            "first.pdf",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = post_upload(
            &h.app,
            Some(&pdf_with_pages(1)),
            &[("publicationDate", "2026-01-05T09:30:00Z")],
            "second.pdf",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("already scheduled"));
    }

    #[tokio::test]
    async fn test_latest_is_404_with_no_published_issues() {
        let h = harness();

        let (status, json) = get(&h.app, "/newspaper").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], Value::Bool(false));
    }

    #[tokio::test]
    async fn test_date_endpoint_validates_its_parameter() {
        let h = harness();

        let (status, _) = get(&h.app, "/newspaper/date").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(&h.app, "/newspaper/date?date=yesterday").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(&h.app, "/newspaper/date?date=2031-01-01").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dates_lists_days_ascending_scoped_by_month() {
        let h = harness();
        seed_issue(&h.db, "march-five", "2026-03-05T08:00:00Z");
        seed_issue(&h.db, "march-one", "2026-03-01T08:00:00Z");
        seed_issue(&h.db, "feb-ten", "2026-02-10T08:00:00Z");

        let (status, json) = get(&h.app, "/newspaper/dates?month=03&year=2026").await;
        assert_eq!(status, StatusCode::OK);
        let data = json["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["date"].as_str(), Some("2026-03-01"));
        assert_eq!(data[1]["date"].as_str(), Some("2026-03-05"));
        assert!(data[0]["id"].as_str().is_some());

        let (_, json) = get(&h.app, "/newspaper/dates").await;
        assert_eq!(json["data"].as_array().unwrap().len(), 3);

        let (status, _) = get(&h.app, "/newspaper/dates?month=13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pagination_walks_newest_first() {
        let h = harness();
        seed_issue(&h.db, "older", "2026-03-05T08:00:00Z");
        seed_issue(&h.db, "newer", "2026-04-02T08:00:00Z");

        let (status, json) = get(&h.app, "/newspaper/page").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"][0]["title"].as_str(), Some("newer"));
        let pagination = &json["pagination"];
        assert_eq!(pagination["currentPage"].as_u64(), Some(1));
        assert_eq!(pagination["totalPages"].as_u64(), Some(2));
        assert_eq!(pagination["totalNewspapers"].as_u64(), Some(2));
        assert_eq!(pagination["hasNextPage"].as_bool(), Some(true));
        assert_eq!(pagination["hasPreviousPage"].as_bool(), Some(false));

        let (_, json) = get(&h.app, "/newspaper/page?page=2").await;
        assert_eq!(json["data"][0]["title"].as_str(), Some("older"));
        assert_eq!(json["pagination"]["hasNextPage"].as_bool(), Some(false));
        assert_eq!(json["pagination"]["hasPreviousPage"].as_bool(), Some(true));

        // Out of range: empty page, not an error.
        let (status, json) = get(&h.app, "/newspaper/page?page=9").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 0);

        // Junk page numbers fall back to the first page.
        let (_, json) = get(&h.app, "/newspaper/page?page=zero").await;
        assert_eq!(json["pagination"]["currentPage"].as_u64(), Some(1));
    }
}
