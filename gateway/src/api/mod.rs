pub(crate) mod documents;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::openapi::openapi_json;
use crate::store::StoreClient;

pub(crate) struct AppState {
    pub store: StoreClient,
}

impl AppState {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/data/document/{id}", get(documents::by_id))
        .route("/data/document-async/{id}", get(documents::by_id_async))
        .route(
            "/data/document-async/firstname/{search}",
            get(documents::by_first_name_async),
        )
        .route("/openapi.json", get(openapi_json))
        .with_state(state)
}
