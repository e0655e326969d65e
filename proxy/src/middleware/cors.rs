use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::Config;

/// CORS policy for a single route: the given methods plus `Content-Type` and
/// `Authorization` request headers.
pub fn route_cors(config: &Config, methods: [Method; 2]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(config))
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn allow_origin(config: &Config) -> AllowOrigin {
    if config.allows_any_origin() {
        return Any.into();
    }

    let parsed: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {o}");
                None
            }
        })
        .collect();

    AllowOrigin::list(parsed)
}
