pub mod envelope;
pub mod home;
pub mod observations;
pub mod photo_info;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::observations::Kind;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes();

    let mut app = Router::new().route("/", get(home::index));
    for kind in Kind::ALL {
        let path = format!("/api/{}", kind.descriptor().route);
        app = app.nest(&path, observations::router(kind));
    }

    app.route("/api/photo-information", post(photo_info::submit))
        .route("/api/{type}/{id}/photo-info", patch(photo_info::submit_typed))
        .fallback(home::not_found)
        .method_not_allowed_fallback(home::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
