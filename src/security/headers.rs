//! Security headers for HTTP responses
//!
//! Every response of the API carries the strict set below, including
//! rejections rendered by the recovery handler.

use warp::http::HeaderValue;
use warp::reply::{Reply, Response};

/// Strict Content Security Policy for API endpoints
const STRICT_CSP: &str = "default-src 'none'; connect-src 'self'; frame-ancestors 'none';";

const PERMISSIONS_POLICY: &str = "geolocation=(), microphone=(), camera=(), payment=(), usb=(), magnetometer=(), gyroscope=(), accelerometer=()";

/// Add strict API security headers to a response
pub fn add_api_security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();

    // Prevent clickjacking
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));

    // Prevent MIME type sniffing
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));

    headers.insert("X-XSS-Protection", HeaderValue::from_static("1; mode=block"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.insert("Content-Security-Policy", HeaderValue::from_static(STRICT_CSP));
    headers.insert(
        "Cache-Control",
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert("Permissions-Policy", HeaderValue::from_static(PERMISSIONS_POLICY));

    // Remove server information disclosure
    headers.remove("Server");

    response
}

/// Wrap any reply with the strict API header set
pub fn with_api_security_headers<T: Reply>(reply: T) -> Response {
    add_api_security_headers(reply.into_response())
}
