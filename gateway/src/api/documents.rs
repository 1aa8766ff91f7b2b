use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::api_error::ApiError;
use crate::deferred::deferred;
use crate::store::{FieldMatch, render_sources};

type ApiResult<T> = std::result::Result<T, ApiError>;

const FIRST_NAME_FIELD: &str = "first_name";

/// Raw document text as the store returned it. Absent documents produce an
/// empty body.
pub(crate) struct DocumentBody(Option<String>);

impl IntoResponse for DocumentBody {
    fn into_response(self) -> Response {
        match self.0 {
            Some(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
            None => ().into_response(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/data/document/{id}",
    tag = "documents",
    summary = "Fetch a document by key",
    description = "Waits on the document store within the request and returns the stored source.\nAn absent key yields an empty body.",
    params(("id" = String, Path, description = "Document key")),
    responses(
        (status = 200, description = "Stored document source", body = String, content_type = "application/json"),
        (status = 502, description = "Document store failure"),
        (status = 504, description = "Document store timed out")
    )
)]
pub async fn by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DocumentBody> {
    let source = state.store.get(&id).await?;
    tracing::debug!(
        id = %id,
        source = source.as_deref().unwrap_or("<absent>"),
        "response /document/"
    );
    Ok(DocumentBody(source))
}

#[utoipa::path(
    get,
    path = "/data/document-async/{id}",
    tag = "documents",
    summary = "Fetch a document by key without blocking",
    description = "Hands the lookup to the store client and resolves once its completion callback fires.\nAn absent key yields an empty body.",
    params(("id" = String, Path, description = "Document key")),
    responses(
        (status = 200, description = "Stored document source", body = String, content_type = "application/json"),
        (status = 502, description = "Document store failure"),
        (status = 504, description = "Document store timed out")
    )
)]
pub async fn by_id_async(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DocumentBody> {
    let (completer, when_done) = deferred();
    let logged_id = id.clone();
    state.store.get_async(
        id,
        completer.map(move |source: Option<String>| {
            tracing::debug!(
                id = %logged_id,
                source = source.as_deref().unwrap_or("<absent>"),
                "response /document-async/"
            );
            source
        }),
    );
    Ok(DocumentBody(when_done.await?))
}

#[utoipa::path(
    get,
    path = "/data/document-async/firstname/{search}",
    tag = "documents",
    summary = "Search documents by first name",
    description = "Submits a match query on `first_name` and returns every matching source as `[a, b, ...]`.\nNo matches yield `[]`.",
    params(("search" = String, Path, description = "Text matched against first_name")),
    responses(
        (status = 200, description = "Matching document sources", body = String, content_type = "application/json"),
        (status = 502, description = "Document store failure"),
        (status = 504, description = "Document store timed out")
    )
)]
pub async fn by_first_name_async(
    State(state): State<Arc<AppState>>,
    Path(search): Path<String>,
) -> ApiResult<DocumentBody> {
    let (completer, when_done) = deferred();
    let query = FieldMatch::new(FIRST_NAME_FIELD, search.clone());
    state.store.search_async(
        query,
        completer.map(move |sources: Vec<String>| {
            let rendered = render_sources(&sources);
            tracing::debug!(
                search = %search,
                hits = sources.len(),
                response = %rendered,
                "response /document-async/firstname"
            );
            rendered
        }),
    );
    let rendered = when_done.await?;
    Ok(DocumentBody(Some(rendered)))
}
