//! v1 API — streaming chat and document upload.
//!
//! Endpoints:
//! - `POST /v1/chat/stream`        — `{id, content}` in, `text/event-stream` out
//! - `POST /v1/documents/upload`   — multipart `file`, re-ingested under its base name

use axum::{
    Json, Router,
    body::Body,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use ragchat_chat::{ChatError, ChatRequest, ChunkSink, Services, SinkClosed};
use ragchat_core::document::Document;
use ragchat_rag::loader::document_id;
use serde::Serialize;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, info, info_span, warn};

pub type SharedServices = Arc<Services>;

/// Frames buffered between the relay task and the HTTP body.
const FRAME_BUFFER: usize = 32;

pub fn v1_router(state: SharedServices) -> Router {
    Router::new()
        .route("/chat/stream", post(chat_stream_handler))
        .route("/documents/upload", post(upload_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, details: Option<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            details,
        }),
    )
}

/// Map a before-streaming chat failure onto a status code.
fn chat_error(err: ChatError) -> ApiError {
    match err {
        ChatError::Validation(message) => api_error(StatusCode::BAD_REQUEST, message, None),
        ChatError::Timeout { .. } => api_error(
            StatusCode::GATEWAY_TIMEOUT,
            "Request timed out",
            Some(err.to_string()),
        ),
        ChatError::Provider(_) | ChatError::Retrieval(_) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate response from AI model",
            Some(err.to_string()),
        ),
    }
}

// ── Chat ──────────────────────────────────────────────────────────────────

/// Writes each fragment as one SSE frame: `data: {fragment}\n\n`.
struct SseFrameSink {
    tx: mpsc::Sender<Result<String, Infallible>>,
}

#[async_trait::async_trait]
impl ChunkSink for SseFrameSink {
    async fn send(&mut self, fragment: &str) -> Result<(), SinkClosed> {
        self.tx.send(Ok(sse_frame(fragment))).await.map_err(|_| SinkClosed)
    }
}

fn sse_frame(data: &str) -> String {
    format!("data: {data}\n\n")
}

/// `POST /v1/chat/stream`
async fn chat_stream_handler(
    State(services): State<SharedServices>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", rejection.body_text()),
            None,
        )
    })?;

    let span = info_span!("chat", request_id = %uuid::Uuid::new_v4(), id = %request.id);
    let stream = services
        .orchestrator
        .open(request)
        .instrument(span.clone())
        .await
        .map_err(chat_error)?;

    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(
        async move {
            let mut sink = SseFrameSink { tx };
            let summary = stream.relay(&mut sink).await;
            if summary.is_complete() {
                let _ = sink.tx.send(Ok(sse_frame("[DONE]"))).await;
            }
        }
        .instrument(span),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}

// ── Upload ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: String,
    file: String,
}

/// `POST /v1/documents/upload`
async fn upload_handler(
    State(services): State<SharedServices>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Some(pipeline) = services.ingestion.clone() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Document ingestion is disabled",
            Some("no embedding model or index store is available".into()),
        ));
    };

    let mut multipart = multipart.map_err(|rejection| {
        api_error(StatusCode::BAD_REQUEST, "file is required", Some(rejection.body_text()))
    })?;

    let mut upload = None;
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, "Malformed multipart body", Some(e.body_text()))
        })?;
        let Some(field) = field else { break };
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().map(|n| document_id(Path::new(n))).unwrap_or_default();
        let bytes = field.bytes().await.map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, "Failed to read uploaded file", Some(e.body_text()))
        })?;
        upload = Some((name, bytes));
        break;
    }

    let Some((name, bytes)) = upload.filter(|(name, _)| !name.is_empty()) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "file is required", None));
    };

    let document = Document::new(&name, String::from_utf8_lossy(&bytes).into_owned());
    let deadline = Duration::from_secs(services.config.gateway.upload_timeout_secs);
    let span = info_span!("upload", request_id = %uuid::Uuid::new_v4(), file = %name);

    // The ingest runs detached so a timed-out request never leaves a document
    // half-replaced; it finishes (or rolls back) after the 504 is sent.
    let task = tokio::spawn(async move { pipeline.ingest(vec![document]).await }.instrument(span));

    let report = tokio::time::timeout(deadline, task)
        .await
        .map_err(|_| {
            warn!(file = %name, "Upload ingestion exceeded deadline, finishing in background");
            api_error(
                StatusCode::GATEWAY_TIMEOUT,
                "Request timed out",
                Some(format!("ingestion of '{name}' exceeded {}s", deadline.as_secs())),
            )
        })?
        .map_err(|e| {
            warn!(file = %name, error = %e, "Upload ingestion task aborted");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to index document",
                Some(e.to_string()),
            )
        })?
        .map_err(|e| {
            warn!(file = %name, error = %e, "Upload ingestion failed");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to index document",
                Some(e.to_string()),
            )
        })?;

    info!(file = %name, bytes = bytes.len(), chunks = report.chunks, "Document uploaded");
    Ok(Json(UploadResponse {
        message: "File uploaded and indexed".into(),
        file: name,
    }))
}
