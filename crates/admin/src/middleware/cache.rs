//! Response caching policy for admin pages.

use axum::http::{HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;

/// `Cache-Control` sent with every admin page.
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate, max-age=0";

/// Layer that marks responses as uncacheable, replacing any handler value.
#[must_use]
pub fn no_cache_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE))
}
