//! Output formatting functions.

pub mod json;
pub mod pretty;

use serde_json::Value;

use crate::cli::OutputFormat;

/// Format a value for output.
pub fn format_output<T: serde::Serialize>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}

/// Format one object of an entity.
pub fn format_one(object: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(object),
        OutputFormat::Pretty => pretty::format_object(object),
    }
}

/// Format a list of objects of an entity.
pub fn format_many(entity: &str, objects: &[Value], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_json(&objects),
        OutputFormat::Pretty => pretty::format_objects(entity, objects),
    }
}
