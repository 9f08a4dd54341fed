use axum::http::{header, HeaderValue, Method};
use std::env;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

pub fn create_cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS));

    match allowed_origins() {
        // Credentials are only allowed with an explicit origin list; a
        // wildcard origin plus credentials is rejected by tower-http.
        Some(origins) => layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true),
        None => {
            tracing::warn!("CORS: no valid origins configured, allowing any origin (development)");
            layer.allow_origin(AllowOrigin::any())
        }
    }
}

fn allowed_origins() -> Option<Vec<HeaderValue>> {
    let configured =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());

    let origins: Vec<HeaderValue> = configured
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("CORS: ignoring invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        None
    } else {
        tracing::info!("CORS: {} allowed origin(s)", origins.len());
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_origins_parse_as_header_values() {
        for origin in DEFAULT_ALLOWED_ORIGINS.split(',') {
            assert!(origin.trim().parse::<HeaderValue>().is_ok());
        }
    }

    #[test]
    fn cors_layer_builds() {
        let _layer = create_cors_layer();
    }
}
