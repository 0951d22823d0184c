//! Field constraints for parsed records.
//!
//! # Constraints
//!
//! | Field       | Rule                                   | Message                          |
//! |-------------|----------------------------------------|----------------------------------|
//! | `uuid`      | not blank                              | `uuid: ID is required`           |
//! | `uuid`      | 36 chars of hex digits and hyphens     | `uuid: Invalid UUID format`      |
//! | `id`        | not blank                              | `id: Code is required`           |
//! | `name`      | not blank                              | `name: Name is required`         |
//! | `likes`     | not blank                              | `likes: Likes field is required` |
//! | `transport` | not blank                              | `transport: Vehicle field is required` |
//! | `avg_speed` | `>= 0.0`                               | `avg_speed: value1 must be >= 0.0` |
//! | `top_speed` | `>= 0.0`                               | `top_speed: value2 must be >= 0.0` |
//!
//! Every violated rule yields its own message. Line context is attached by
//! the caller.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Record;

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F-]{36}$").expect("UUID pattern is a valid regex")
});

/// Check a record against every field constraint.
///
/// Returns an empty list for a valid record.
///
/// # Example
/// ```ignore
/// use ingestgate::validation::validate_record;
///
/// let errors = validate_record(&record);
/// assert!(errors.iter().any(|e| e.starts_with("uuid:")));
/// ```
pub fn validate_record(record: &Record) -> Vec<String> {
    let mut errors = Vec::new();

    if is_blank(&record.uuid) {
        errors.push(violation("uuid", "ID is required"));
    }
    if !UUID_PATTERN.is_match(&record.uuid) {
        errors.push(violation("uuid", "Invalid UUID format"));
    }

    let required = [
        ("id", &record.id, "Code is required"),
        ("name", &record.name, "Name is required"),
        ("likes", &record.likes, "Likes field is required"),
        ("transport", &record.transport, "Vehicle field is required"),
    ];
    for (field, value, description) in required {
        if is_blank(value) {
            errors.push(violation(field, description));
        }
    }

    let measurements = [
        ("avg_speed", record.avg_speed, "value1 must be >= 0.0"),
        ("top_speed", record.top_speed, "value2 must be >= 0.0"),
    ];
    for (field, value, description) in measurements {
        if value < 0.0 {
            errors.push(violation(field, description));
        }
    }

    errors
}

/// Quick check: true when the record has no violations.
pub fn is_valid(record: &Record) -> bool {
    validate_record(record).is_empty()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn violation(field: &str, description: &str) -> String {
    format!("{}: {}", field, description)
}
