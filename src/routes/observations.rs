use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Extension, Router};
use serde_json::{Map, Value};

use crate::db::models::Observation;
use crate::error::AppResult;
use crate::extractors::JsonBody;
use crate::observations::{Kind, Stats};
use crate::routes::envelope::Envelope;
use crate::routes::photo_info;
use crate::state::AppState;

/// Routes for one observation kind, to be nested under `/api/<route>`.
pub fn router(kind: Kind) -> Router<AppState> {
    let desc = kind.descriptor();
    let filter_path = format!("/{}/{{value}}", desc.filter_route);

    let mut router = Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route(&filter_path, get(by_type))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/photo-info", patch(photo_info::submit_for_kind));

    if desc.probe.is_some() {
        router = router.route("/test", get(probe));
    }

    router.layer(Extension(kind))
}

async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
) -> AppResult<Envelope<Vec<Observation>>> {
    let records = state.observations.list(kind).await?;
    Ok(Envelope::list(records))
}

async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> AppResult<(StatusCode, Envelope<Observation>)> {
    let record = state.observations.create(kind, &body).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::data(record).with_message(kind.descriptor().created),
    ))
}

async fn stats(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
) -> AppResult<Envelope<Stats>> {
    Ok(Envelope::data(state.observations.stats(kind).await?))
}

async fn by_type(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
    Path(value): Path<String>,
) -> AppResult<Envelope<Vec<Observation>>> {
    let records = state.observations.list_by_type(kind, &value).await?;
    Ok(Envelope::list(records))
}

async fn show(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
    Path(id): Path<String>,
) -> AppResult<Envelope<Observation>> {
    Ok(Envelope::data(state.observations.get(kind, &id).await?))
}

async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> AppResult<Envelope<Observation>> {
    let record = state.observations.update(kind, &id, &body).await?;
    Ok(Envelope::data(record).with_message("Updated successfully"))
}

async fn remove(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
    Path(id): Path<String>,
) -> AppResult<Envelope<()>> {
    state.observations.delete(kind, &id).await?;
    Ok(Envelope::message("Deleted successfully"))
}

async fn probe(Extension(kind): Extension<Kind>) -> Envelope<()> {
    Envelope::message(kind.descriptor().probe.unwrap_or("Routes working!"))
}
