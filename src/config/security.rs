use axum::http::{header, HeaderValue};
use axum::Router;
use std::env;
use tower_http::set_header::SetResponseHeaderLayer;

const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";

/// Attaches the standard security headers to every response. HSTS is only
/// added in production, where the service sits behind TLS.
pub fn apply_security_headers(router: Router) -> Router {
    let router = router
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CSP_API_VALUE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static(REFERRER_POLICY_VALUE),
        ));

    if hsts_enabled() {
        tracing::info!("Security: HSTS header enabled (production mode)");
        router.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        ))
    } else {
        router
    }
}

fn hsts_enabled() -> bool {
    env::var("RUST_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false)
}
