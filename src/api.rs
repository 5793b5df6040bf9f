use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::config::Config;
use crate::db::ImportLog;
use crate::importers::diagnostics::{ImportDiagnostic, Severity};
use crate::importers::template::{build_template, TEMPLATE_FILE_NAME, XLSX_CONTENT_TYPE};
use crate::services::import_report::{ImportReport, ImportSummary, PreviewRecord, PreviewReport, SheetPreview};
use crate::services::{ImportOptions, RosterImportError, RosterImportService};

/// Spreadsheet extensions accepted on upload
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

const ALLOWED_CONTENT_TYPES: [&str; 3] = [
    XLSX_CONTENT_TYPE,
    "application/vnd.ms-excel",
    "application/octet-stream",
];

/// Extra room above the upload limit so oversized files reach the size check
const BODY_LIMIT_SLACK: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub import_service: RosterImportService,
    pub config: Arc<Config>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error returned by handlers, rendered as `ErrorResponse`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            error: None,
        }
    }

    pub fn internal(message: impl Into<String>, error: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            error: Some(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            message: self.message,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RosterImportError> for ApiError {
    fn from(e: RosterImportError) -> Self {
        match e {
            RosterImportError::FileFormat(inner) => Self {
                status: StatusCode::BAD_REQUEST,
                message: "The uploaded file could not be read as a spreadsheet".to_string(),
                error: Some(inner.to_string()),
            },
            other => {
                error!("Roster import failed: {}", other);
                Self::internal("Internal error while processing the import", other)
            }
        }
    }
}

/// Multipart form accepted by the upload endpoints
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
pub struct RosterUploadForm {
    /// The .xlsx or .xls workbook (10 MB max)
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    validate_fichas: Option<bool>,
    create_missing_fichas: Option<bool>,
    update_existing: Option<bool>,
    skip_duplicates: Option<bool>,
    flexible_validation: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Number of runs to return (default 20, max 100)
    pub limit: Option<i64>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, import_aprendices, preview_import, import_history, download_template),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        RosterUploadForm,
        ImportOptions,
        ImportReport,
        ImportSummary,
        ImportDiagnostic,
        Severity,
        PreviewReport,
        SheetPreview,
        PreviewRecord,
        ImportLog,
    )),
    tags((name = "import", description = "Learner roster import"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes() + BODY_LIMIT_SLACK;

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/import/excel/aprendices", post(import_aprendices))
        .route("/import/excel/preview", post(preview_import))
        .route("/import/history", get(import_history))
        .route("/import/templates/excel", get(download_template))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/import/excel/aprendices",
    tag = "import",
    request_body(content = RosterUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Import ran; see `success` for the outcome", body = ImportReport),
        (status = 400, description = "Missing, oversized or unreadable file", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse),
    )
)]
#[instrument(skip(state, multipart))]
async fn import_aprendices(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImportReport>), ApiError> {
    let upload = read_upload(multipart, state.config.max_upload_bytes()).await?;
    info!(
        "Received roster {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );

    let temp_file = upload.to_temp_file()?;
    let report = state
        .import_service
        .import_workbook(temp_file.path(), &upload.file_name, &upload.options)
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    post,
    path = "/api/v1/import/excel/preview",
    tag = "import",
    request_body(content = RosterUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Dry-run summary per sheet", body = PreviewReport),
        (status = 400, description = "Missing, oversized or unreadable file", body = ErrorResponse),
    )
)]
#[instrument(skip(state, multipart))]
async fn preview_import(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreviewReport>, ApiError> {
    let upload = read_upload(multipart, state.config.max_upload_bytes()).await?;
    let temp_file = upload.to_temp_file()?;
    let preview = state
        .import_service
        .preview_workbook(temp_file.path(), &upload.file_name, &upload.options)
        .await?;

    Ok(Json(preview))
}

#[utoipa::path(
    get,
    path = "/api/v1/import/history",
    tag = "import",
    params(HistoryParams),
    responses((status = 200, description = "Recent import runs", body = [ImportLog]))
)]
#[instrument(skip(state))]
async fn import_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ImportLog>>, ApiError> {
    let logs = state.import_service.history(params.limit).await?;
    info!("Retrieved {} import log entries", logs.len());
    Ok(Json(logs))
}

#[utoipa::path(
    get,
    path = "/api/v1/import/templates/excel",
    tag = "import",
    responses((status = 200, description = "Roster template workbook (.xlsx attachment)"))
)]
#[instrument]
async fn download_template() -> Result<Response, ApiError> {
    let bytes = build_template().map_err(|e| {
        error!("Failed to build roster template: {}", e);
        ApiError::internal("Could not generate the template", e)
    })?;

    let disposition = format!("attachment; filename=\"{TEMPLATE_FILE_NAME}\"");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// A validated spreadsheet upload
struct Upload {
    file_name: String,
    extension: String,
    bytes: Bytes,
    options: ImportOptions,
}

impl Upload {
    /// Spill to a temp file keeping the extension so the reader detects the format
    fn to_temp_file(&self) -> Result<tempfile::NamedTempFile, ApiError> {
        let write = || -> std::io::Result<tempfile::NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("roster-")
                .suffix(&format!(".{}", self.extension))
                .tempfile()?;
            file.write_all(&self.bytes)?;
            file.flush()?;
            Ok(file)
        };
        write().map_err(|e| {
            error!("Failed to write upload to temp file: {}", e);
            ApiError::internal("Could not store the uploaded file", e)
        })
    }
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut options = ImportOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart body: {}", e);
        ApiError::bad_request(format!("Invalid multipart body: {e}"))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                warn!("Failed to read uploaded file: {}", e);
                ApiError::bad_request(format!("Could not read the uploaded file: {e}"))
            })?;
            file = Some((file_name, content_type, bytes));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid value for '{name}': {e}")))?;
        apply_option(&mut options, &name, &value)?;
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err(ApiError::bad_request("No file was uploaded (expected field 'file')"));
    };

    let extension = validate_upload(&file_name, bytes.len(), max_bytes)?;
    if let Some(content_type) = content_type.as_deref() {
        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            warn!(
                "Upload {} has unexpected content type {}, continuing by extension",
                file_name, content_type
            );
        }
    }

    Ok(Upload {
        file_name,
        extension,
        bytes,
        options,
    })
}

/// Check name and size of an upload, returning the lowercase extension
pub fn validate_upload(file_name: &str, size: usize, max_bytes: usize) -> Result<String, ApiError> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Only .xlsx and .xls files are accepted, got '{file_name}'"
        )));
    }
    if size == 0 {
        return Err(ApiError::bad_request("The uploaded file is empty"));
    }
    if size > max_bytes {
        return Err(ApiError::bad_request(format!(
            "File exceeds the maximum size of {} MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(extension)
}

fn apply_option(options: &mut ImportOptions, name: &str, value: &str) -> Result<(), ApiError> {
    let target = match name {
        "validateFichas" => &mut options.validate_fichas,
        "createMissingFichas" => &mut options.create_missing_fichas,
        "updateExisting" => &mut options.update_existing,
        "skipDuplicates" => &mut options.skip_duplicates,
        "flexibleValidation" => &mut options.flexible_validation,
        other => {
            debug!("Ignoring unknown form field '{}'", other);
            return Ok(());
        }
    };
    *target = parse_flag(value)
        .ok_or_else(|| ApiError::bad_request(format!("'{name}' must be true or false")))?;
    Ok(())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    #[test]
    fn test_validate_upload_extensions() {
        assert_eq!(validate_upload("roster.xlsx", 10, MB).unwrap(), "xlsx");
        assert_eq!(validate_upload("ROSTER.XLS", 10, MB).unwrap(), "xls");
        assert!(validate_upload("roster.csv", 10, MB).is_err());
        assert!(validate_upload("roster", 10, MB).is_err());
    }

    #[test]
    fn test_validate_upload_size() {
        let err = validate_upload("roster.xlsx", 10 * MB + 1, 10 * MB).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(validate_upload("roster.xlsx", 10 * MB, 10 * MB).is_ok());
        assert!(validate_upload("roster.xlsx", 0, 10 * MB).is_err());
    }

    #[test]
    fn test_apply_option() {
        let mut options = ImportOptions::default();
        apply_option(&mut options, "updateExisting", "true").unwrap();
        apply_option(&mut options, "skipDuplicates", "0").unwrap();
        apply_option(&mut options, "somethingElse", "whatever").unwrap();
        assert!(options.update_existing);
        assert!(!options.skip_duplicates);
        assert!(apply_option(&mut options, "validateFichas", "maybe").is_err());
    }

    #[test]
    fn test_file_format_error_maps_to_bad_request() {
        let err: ApiError = RosterImportError::FileFormat(
            crate::importers::WorkbookError::NoSheets,
        )
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.error.is_some());
    }

    #[test]
    fn test_openapi_lists_import_paths() {
        let spec = generate_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v1/import/excel/aprendices"));
        assert!(spec.paths.paths.contains_key("/api/v1/import/templates/excel"));
    }
}
