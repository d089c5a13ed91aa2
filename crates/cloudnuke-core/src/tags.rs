//! Well-known resource tags
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `cloud-nuke-excluded` | `"true"` keeps the resource out of every run |
//! | `cloud-nuke-after` | RFC 3339 timestamp; the resource is protected until then |
//! | `cloud-nuke-first-seen` | RFC 3339 timestamp of the first observation |

use chrono::{DateTime, Utc};

/// Tag key for the static do-not-nuke marker
pub const TAG_EXCLUDE: &str = "cloud-nuke-excluded";

/// Value of [`TAG_EXCLUDE`] that activates the exclusion
pub const TAG_EXCLUDE_VALUE: &str = "true";

/// Tag key for protect-until timestamps
pub const TAG_PROTECT_UNTIL: &str = "cloud-nuke-after";

/// Tag key recording when the engine first observed a resource
pub const TAG_FIRST_SEEN: &str = "cloud-nuke-first-seen";

/// Format a timestamp for a tag value
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339()
}

/// Parse a tag value written by [`format_timestamp`] (or any RFC 3339 value)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
