//! Wall-clock helper.

use decksync_core::UnixMillis;

/// The current instant as milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> UnixMillis {
    chrono::Utc::now().timestamp_millis()
}
