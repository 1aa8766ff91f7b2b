use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::documents::by_id,
        crate::api::documents::by_id_async,
        crate::api::documents::by_first_name_async
    ),
    tags(
        (name = "documents", description = "Document lookup and first-name search")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
