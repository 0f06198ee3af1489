//! Fixed endpoints, defaults and request tables.
//!
//! The parameter and header tables mirror what the web player sends, so the
//! webcast service sees a regular browser session.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::time::Duration;

use crate::net::ParamValue;

// ============================================================================
// Endpoints
// ============================================================================

/// Public web origin.
pub const WEB_URL: &str = "https://www.tiktok.com/";

/// Base path of the webcast API.
pub const WEBCAST_API_URL: &str = "https://webcast.tiktok.com/webcast/";

/// External URL-signing service.
pub const SIGN_API_URL: &str = "https://tiktok.isaackogan.com/webcast/sign_url";

/// Client identifier sent to the signing service.
pub const SIGN_CLIENT_ID: &str = "ttlive-rust";

/// Path of the initial fetch that resolves a room's push channel.
pub const ROOM_FETCH_PATH: &str = "im/fetch/";

// ============================================================================
// Transport
// ============================================================================

/// WebSocket sub-protocol requested in the handshake.
pub const SUB_PROTOCOL: &str = "echo-protocol";

/// Interval between keep-alive pings on an open session.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Origin header sent with the transport handshake.
pub const ORIGIN: &str = "https://www.tiktok.com";

// ============================================================================
// Settings Defaults
// ============================================================================

/// Default timeout for every outbound HTTP call and the handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default polling interval.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(500);

/// Default client language tag.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default receive buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 200_000;

// ============================================================================
// Default Tables
// ============================================================================

/// Browser user agent used until the signing service issues a new one.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.63 Safari/537.36";

const fn s(value: &'static str) -> ParamValue {
    ParamValue::Str(Cow::Borrowed(value))
}

/// Query parameters attached to every webcast API request.
pub const DEFAULT_CLIENT_PARAMS: &[(&str, ParamValue)] = &[
    ("aid", ParamValue::Int(1988)),
    ("app_language", s("en-US")),
    ("app_name", s("tiktok_web")),
    ("browser_language", s("en")),
    ("browser_name", s("Mozilla")),
    ("browser_online", ParamValue::Bool(true)),
    ("browser_platform", s("Win32")),
    (
        "browser_version",
        s("5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.63 Safari/537.36"),
    ),
    ("cookie_enabled", ParamValue::Bool(true)),
    ("cursor", s("")),
    ("internal_ext", s("")),
    ("device_platform", s("web")),
    ("focus_state", ParamValue::Bool(true)),
    ("from_page", s("user")),
    ("history_len", ParamValue::Int(4)),
    ("is_fullscreen", ParamValue::Bool(false)),
    ("is_page_visible", ParamValue::Bool(true)),
    ("did_rule", ParamValue::Int(3)),
    ("fetch_rule", ParamValue::Int(1)),
    ("identity", s("audience")),
    ("last_rtt", ParamValue::Int(0)),
    ("live_id", ParamValue::Int(12)),
    ("resp_content_type", s("protobuf")),
    ("screen_height", ParamValue::Int(1152)),
    ("screen_width", ParamValue::Int(2048)),
    ("tz_name", s("Europe/Berlin")),
    ("referer", s("https, //www.tiktok.com/")),
    ("root_referer", s("https, //www.tiktok.com/")),
    ("msToken", s("")),
    ("version_code", ParamValue::Int(180_800)),
    ("webcast_sdk_version", s("1.3.0")),
    ("update_version_code", s("1.3.0")),
];

/// Headers attached to every outbound HTTP request.
pub const DEFAULT_REQUEST_HEADERS: &[(&str, &str)] = &[
    ("Connection", "keep-alive"),
    ("Cache-Control", "max-age=0"),
    ("Accept", "text/html,application/json,application/protobuf"),
    ("User-Agent", DEFAULT_USER_AGENT),
    ("Referer", "https://www.tiktok.com/"),
    ("Origin", ORIGIN),
    ("Accept-Language", "en-US,en; q=0.9"),
    ("Accept-Encoding", "gzip, deflate"),
];

// ============================================================================
// Tests
// ============================================================================
