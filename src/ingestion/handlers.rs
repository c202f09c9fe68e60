use super::error::IngestError;
use super::service::{ingest_batch, parse_batch};
use super::types::{IngestResult, LookupParams, StoredStory};
use crate::storage::StoryStore;

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::Instrument;

pub const STORY_ALLOW: &str = "GET, POST";
pub const LIST_ALLOW: &str = "GET";

pub async fn handle_ingest(
    Extension(store): Extension<Arc<dyn StoryStore>>,
    body: Bytes,
) -> Result<Json<IngestResult>, IngestError> {
    let batch_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("ingest", %batch_id);

    async move {
        let candidates = parse_batch(&body)?;
        tracing::debug!("Received {} candidate stories", candidates.len());

        ingest_batch(store.as_ref(), candidates).await.map(Json)
    }
    .instrument(span)
    .await
}

pub async fn handle_get_story(
    Extension(store): Extension<Arc<dyn StoryStore>>,
    Query(params): Query<LookupParams>,
) -> Response {
    let Some(key) = params.natural_key() else {
        return (StatusCode::BAD_REQUEST, "Missing \"index\" query parameter").into_response();
    };

    match store.get(key).await {
        Ok(Some(story)) => (StatusCode::OK, Json(story)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Story not found").into_response(),
        Err(e) => IngestError::StorageFailure(e).into_response(),
    }
}

pub async fn handle_list_stories(
    Extension(store): Extension<Arc<dyn StoryStore>>,
) -> Result<Json<Vec<StoredStory>>, IngestError> {
    let stories = store.list().await?;
    tracing::debug!("Listing {} stories", stories.len());
    Ok(Json(stories))
}

pub async fn handle_story_method_not_allowed(method: Method) -> Response {
    method_not_allowed(method, STORY_ALLOW)
}

pub async fn handle_list_method_not_allowed(method: Method) -> Response {
    method_not_allowed(method, LIST_ALLOW)
}

fn method_not_allowed(method: Method, allow: &'static str) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, allow)],
        format!("{} is not allowed.", method),
    )
        .into_response()
}
