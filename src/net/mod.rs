//! Outbound HTTP.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestParameters`] | Ordered query parameters |
//! | [`DefaultHeaders`] | Shared default header set |
//! | [`HttpRequest`] | One GET or POST with headers, cookies, proxy and timeout |
//! | [`WebcastHttpClient`] | Webcast API endpoints on top of [`HttpRequest`] |

// ============================================================================
// Submodules
// ============================================================================

/// Webcast API client.
pub mod client;

/// Shared default headers.
pub mod headers;

/// Query parameters.
pub mod params;

/// Request builder and response content.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::WebcastHttpClient;
pub use headers::DefaultHeaders;
pub use params::{ParamValue, RequestParameters};
pub use request::{HttpContent, HttpRequest, RequestContext};
