use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};

use super::relay;
use crate::auth::{ApiUser, cookie_header};
use crate::backend::{AskRequest, Rag, RagCreate, Upstream};
use crate::error::Result;
use crate::server::AppState;

pub(super) async fn list(
    State(state): State<AppState>,
    ApiUser(user): ApiUser,
    headers: HeaderMap,
) -> Result<Json<Vec<Rag>>> {
    let rags = state
        .backend
        .list_rags(&user.id, &cookie_header(&headers))
        .await?;
    Ok(Json(rags))
}

pub(super) async fn show(
    State(state): State<AppState>,
    ApiUser(_): ApiUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Rag>> {
    let rag = state.backend.get_rag(&id, &cookie_header(&headers)).await?;
    Ok(Json(rag))
}

pub(super) async fn create(
    State(state): State<AppState>,
    ApiUser(user): ApiUser,
    headers: HeaderMap,
    Json(rag): Json<RagCreate>,
) -> Result<Response> {
    let upstream = state
        .backend
        .create_rag(&user.id, &rag, &cookie_header(&headers))
        .await?;
    tracing::info!(
        name: "rag.create",
        user_id = %user.id,
        rag = %rag.name,
        status = upstream.status.as_u16(),
        "RAG creation relayed"
    );
    Ok(relay(upstream))
}

/// Forward a question and pass the backend's token stream through untouched.
pub(super) async fn ask_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AskRequest>,
) -> Result<Response> {
    let response = state
        .backend
        .ask_stream(&request, &cookie_header(&headers))
        .await?;

    let status = response.status();
    if !status.is_success() {
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes().await?;
        return Ok(relay(Upstream {
            status,
            content_type,
            body,
        }));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8"));
    Ok((
        status,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Body::from_stream(response.bytes_stream()),
    )
        .into_response())
}
