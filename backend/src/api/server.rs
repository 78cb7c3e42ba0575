//! HTTP server for the exam bundle API.
//!
//! The form front end is a separate application; it talks to these endpoints.
//!
//! # API Endpoints
//!
//! | Method | Path                      | Description                              |
//! |--------|---------------------------|------------------------------------------|
//! | GET    | `/health`                 | Health check                             |
//! | POST   | `/api/questions/preview`  | Upload a question sheet, get the review  |
//! | POST   | `/api/bundle`             | Run the wizard, download the zip         |
//! | GET    | `/api/logs`               | SSE stream for real-time logs            |

use axum::{
    extract::Multipart,
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_warning, LOG_BROADCASTER};
use super::types::{error_response, issues_response, PreviewResponse, TableInfo};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::models::{ColumnRoleMap, Table};
use crate::parser::parse_table_bytes;
use crate::transform::normalizer::normalize_table;
use crate::transform::pipeline::{run_wizard, WizardManifest};
use crate::transform::roles::validate_role_map;

type ApiError = (StatusCode, Json<Value>);

/// Build the application router.
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/questions/preview", post(preview_questions))
        .route("/api/bundle", post(create_bundle))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> ServerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Exambundle server running on http://localhost:{}", port);
    println!("   POST /api/questions/preview - Review a question sheet");
    println!("   POST /api/bundle            - Build the exam bundle");
    println!("   GET  /api/logs              - SSE log stream");
    println!("   GET  /health                - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(format!("bind {}: {}", addr, e)))?;
    axum::serve(listener, router())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(())
}

fn reject(err: ServerError) -> ApiError {
    let status = match &err {
        ServerError::BadRequest(_) | ServerError::Parse(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Parse { .. } | PipelineError::Manifest(_)) => {
            StatusCode::BAD_REQUEST
        }
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log_error(err.to_string());
    } else {
        log_warning(err.to_string());
    }
    (status, Json(error_response(&err.to_string())))
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "exambundle",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "preview": "POST /api/questions/preview",
            "bundle": "POST /api/bundle",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Question sheet preview endpoint
async fn preview_questions(mut multipart: Multipart) -> Result<Json<PreviewResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut roles = ColumnRoleMap::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?
                    .to_vec(),
            );
            continue;
        }

        let slot = match name.as_str() {
            "topic" => &mut roles.topic,
            "questions" => &mut roles.questions,
            "answer_type" => &mut roles.answer_type,
            "group" => &mut roles.group,
            "options" => &mut roles.options,
            _ => continue,
        };
        *slot = field
            .text()
            .await
            .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?;
    }

    let bytes = file_data.ok_or_else(|| reject(ServerError::BadRequest("No file provided".into())))?;
    let upload_name = file_name.clone().unwrap_or_else(|| "upload.csv".to_string());
    log_info(format!("📄 Preview: {} ({} bytes)", upload_name, bytes.len()));

    let parsed = parse_table_bytes(&upload_name, &bytes).map_err(|e| reject(e.into()))?;
    let info = TableInfo {
        encoding: parsed.encoding.clone(),
        delimiter: parsed.delimiter.map(|d| d.to_string()),
        row_count: parsed.table.len(),
        columns: parsed.table.headers.clone(),
    };

    // Image detection reads and decodes files
    let table = parsed.table;
    let response = tokio::task::spawn_blocking(move || preview_table(file_name, info, &table, &roles))
        .await
        .map_err(|e| reject(ServerError::Internal(e.to_string())))?;
    Ok(Json(response))
}

fn preview_table(
    file_name: Option<String>,
    info: TableInfo,
    table: &Table,
    roles: &ColumnRoleMap,
) -> PreviewResponse {
    if let Err(issues) = validate_role_map(roles, &table.headers) {
        for issue in &issues {
            log_warning(issue.to_string());
        }
        return PreviewResponse::rejected(file_name, info, issues);
    }

    match normalize_table(table, roles) {
        Ok(outcome) => PreviewResponse::new(file_name, info, outcome),
        Err(e) => PreviewResponse::rejected(file_name, info, vec![e.into()]),
    }
}

/// Bundle endpoint: the zip on success, 422 with the issues otherwise
async fn create_bundle(Json(manifest): Json<WizardManifest>) -> Result<Response, ApiError> {
    let report = tokio::task::spawn_blocking(move || run_wizard(&manifest))
        .await
        .map_err(|e| reject(ServerError::Internal(e.to_string())))?
        .map_err(|e| reject(e.into()))?;

    let Some(bundle) = report.bundle.as_ref() else {
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(issues_response(&report))).into_response());
    };

    let disposition = format!("attachment; filename=\"{}\"", bundle.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bundle.bytes.clone(),
    )
        .into_response())
}
