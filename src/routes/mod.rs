use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer, HttpConfig};
use crate::handlers::{auth, health_check, sync};
use crate::state::AppState;

pub fn create_routes(state: AppState, http: &HttpConfig) -> Router {
    let mut api = Router::new()
        .route("/operator/login", post(auth::login))
        .route("/sync", put(sync::push))
        .route("/sync/:operator_id", get(sync::pull));

    if state.allow_registration {
        tracing::warn!("Operator registration endpoint is enabled");
        api = api.route("/operator/register", post(auth::register));
    }

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .with_state(state);

    apply_security_headers(router, http.production)
        .layer(create_cors_layer(http))
        .layer(TraceLayer::new_for_http())
}
