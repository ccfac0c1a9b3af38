pub mod auth;
pub mod chat;
pub mod conversations;
pub mod error;

use axum::middleware;
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Only `/v1/health` is public; everything else sits behind the
/// `LC_API_TOKEN` bearer-token middleware.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(health));

    let protected = Router::new()
        .route(
            "/v1/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route("/v1/conversations/:id", get(conversations::get))
        .route(
            "/v1/conversations/:id/messages",
            get(conversations::list_messages).post(chat::post_message),
        )
        .route("/v1/conversations/:id/confirm", post(chat::confirm))
        .route(
            "/v1/conversations/:id/target-leaf",
            put(conversations::set_target_leaf),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public.merge(protected)
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.llm.list_providers(),
    }))
}
