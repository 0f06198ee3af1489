//! Client configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionSettings`] | Timeouts, buffer size, language, flags, proxies |
//! | [`ConnectionSettingsBuilder`] | Fluent configuration builder |
//! | [`constants`] | Endpoints and default request tables |

// ============================================================================
// Submodules
// ============================================================================

/// Endpoints, defaults and request tables.
pub mod constants;

/// Connection settings and builder.
pub mod settings;

// ============================================================================
// Re-exports
// ============================================================================

pub use settings::{ConnectionSettings, ConnectionSettingsBuilder};
