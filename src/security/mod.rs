//! Security middleware applied to every response

pub mod headers;

pub use headers::{add_api_security_headers, with_api_security_headers};
