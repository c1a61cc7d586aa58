// SPDX-License-Identifier: MIT

//! Shared helpers for timestamp handling.

use chrono::Utc;

/// Current time as epoch milliseconds, the unit used by stored records.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
