//! HTTP surface: mounts the route table with CORS and request tracing.

pub mod routes;

use crate::SharedState;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let origin = match state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(
                "CORS_ORIGIN {:?} is not a valid header value; cross-origin requests disabled",
                state.config.cors_origin
            );
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .merge(routes::app_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
