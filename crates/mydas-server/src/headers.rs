//! X-DAS response headers

use axum::response::Response;
use http::HeaderValue;
use mydas_core::status::{
    DAS_CAPABILITIES, DAS_VERSION, X_DAS_CAPABILITIES, X_DAS_SERVER, X_DAS_STATUS, X_DAS_VERSION,
};
use mydas_core::DasStatus;

pub const DAS_SERVER: &str = concat!("MyDas-rs/", env!("CARGO_PKG_VERSION"));

/// Stamp the DAS protocol headers onto `response`
pub fn with_das_headers(mut response: Response, status: DasStatus) -> Response {
    let headers = response.headers_mut();
    headers.insert(X_DAS_VERSION, HeaderValue::from_static(DAS_VERSION));
    headers.insert(X_DAS_SERVER, HeaderValue::from_static(DAS_SERVER));
    headers.insert(X_DAS_CAPABILITIES, HeaderValue::from_static(DAS_CAPABILITIES));
    headers.insert(X_DAS_STATUS, HeaderValue::from(status.code()));
    response
}
