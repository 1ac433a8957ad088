use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;

use crate::consent::{ConsentDetails, ConsentReceipt, ConsentSubmission};
use crate::db::models::PhotoConsent;
use crate::error::AppResult;
use crate::extractors::JsonBody;
use crate::observations::Kind;
use crate::routes::envelope::Envelope;
use crate::state::AppState;

const SUBMITTED: &str = "Photo information submitted successfully!";

fn respond(receipt: ConsentReceipt) -> (StatusCode, Envelope<PhotoConsent>) {
    (
        StatusCode::CREATED,
        Envelope::data(receipt.consent)
            .with_message(SUBMITTED)
            .with_redirect(receipt.redirect_to),
    )
}

/// `POST /api/photo-information`
pub async fn submit(
    State(state): State<AppState>,
    JsonBody(submission): JsonBody<ConsentSubmission>,
) -> AppResult<(StatusCode, Envelope<PhotoConsent>)> {
    let receipt = state.consents.submit(submission).await?;
    Ok(respond(receipt))
}

/// `PATCH /api/{type}/{id}/photo-info` for segments no kind router claims.
pub async fn submit_typed(
    State(state): State<AppState>,
    Path((token, id)): Path<(String, String)>,
    JsonBody(details): JsonBody<ConsentDetails>,
) -> AppResult<(StatusCode, Envelope<PhotoConsent>)> {
    let receipt = state
        .consents
        .submit_via_typed_route(&token, &id, details)
        .await?;
    Ok(respond(receipt))
}

/// `PATCH /api/<route>/{id}/photo-info` inside a kind router.
pub async fn submit_for_kind(
    State(state): State<AppState>,
    Extension(kind): Extension<Kind>,
    Path(id): Path<String>,
    JsonBody(details): JsonBody<ConsentDetails>,
) -> AppResult<(StatusCode, Envelope<PhotoConsent>)> {
    let receipt = state
        .consents
        .submit_via_typed_route(kind.descriptor().route, &id, details)
        .await?;
    Ok(respond(receipt))
}
