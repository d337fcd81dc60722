//! API key gate and vendor scoping.
//!
//! The key check uses constant-time comparison to mitigate timing attacks.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, AppErrorWithRevision};

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header naming the vendor a dashboard request acts on behalf of.
pub const VENDOR_HEADER: &str = "x-vendor-id";

/// API key middleware; `expected_psk` of `None` disables the check (dev mode).
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let headers = request.headers();
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(str::to_string);

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing API key"),
    }
}

/// Vendor id from the scoping header, if the request carries one.
pub fn acting_vendor(headers: &HeaderMap) -> Option<String> {
    headers
        .get(VENDOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reject a vendor-scoped request that targets another vendor's resource.
pub fn ensure_vendor_owns(
    acting: Option<&str>,
    owner_vendor_id: &str,
    what: &str,
) -> Result<(), AppError> {
    match acting {
        Some(vendor_id) if vendor_id != owner_vendor_id => Err(AppError::Forbidden(format!(
            "Vendor {} may not modify {}",
            vendor_id, what
        ))),
        _ => Ok(()),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    AppErrorWithRevision {
        error: AppError::Unauthorized(message.to_string()),
        revision_id: 0,
    }
    .into_response()
}
