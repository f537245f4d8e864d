//! Pretty output formatting.

use repokit_core::naming::pluralize;
use serde_json::Value;

/// Format an object for display: the `id` first, then one field per line.
pub fn format_object(object: &Value) -> String {
    let Value::Object(fields) = object else {
        return format_scalar(object);
    };
    let mut output = match fields.get("id") {
        Some(id) => format!("ID: {}", format_scalar(id)),
        None => String::from("(no id)"),
    };
    for (name, value) in fields.iter().filter(|(name, _)| name.as_str() != "id") {
        output.push_str(&format!("\n  {}: {}", name, format_scalar(value)));
    }
    output
}

/// Format a list of objects of one entity for display.
pub fn format_objects(entity: &str, objects: &[Value]) -> String {
    let plural = pluralize(entity);
    if objects.is_empty() {
        return format!("No {} found.", plural);
    }
    let mut output = format!("{} ({})\n", plural.to_uppercase(), objects.len());
    output.push_str(&"-".repeat(40));
    for object in objects {
        output.push_str(&format!("\n{}", format_object(object)));
        output.push('\n');
    }
    output
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
