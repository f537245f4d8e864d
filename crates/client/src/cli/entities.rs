//! Entity CLI commands.

use std::io::Read;
use std::path::Path;

use clap::Args;
use repokit_core::{FilterGroup, GetQuery};
use serde_json::Value;

use crate::error::{ClientError, Result};

#[derive(Debug, Args)]
pub struct FindArgs {
    /// Entity name (singular).
    pub entity: String,
    /// Object ID.
    pub id: String,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Entity name (singular).
    pub entity: String,
    /// Only objects under this parent.
    #[arg(long)]
    pub parent_id: Option<String>,
    /// Filter group as JSON, e.g. '{"filters":[{"fieldName":"name","operator":"equals","value":"a"}]}'.
    #[arg(long)]
    pub filter: Option<String>,
}

impl GetArgs {
    /// Builds the repository query.
    pub fn query(&self) -> Result<GetQuery> {
        let mut query = match &self.parent_id {
            Some(parent_id) => GetQuery::under(parent_id.clone()),
            None => GetQuery::all(),
        };
        if let Some(filter) = &self.filter {
            let filters: FilterGroup = serde_json::from_str(filter)
                .map_err(|err| ClientError::InvalidInput(format!("invalid filter: {}", err)))?;
            query = query.with_filters(filters);
        }
        Ok(query)
    }
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Entity name (singular).
    pub entity: String,
    /// JSON object or array of objects. Objects with an `id` are updated,
    /// others inserted.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the JSON from a file, or `-` for stdin.
    #[arg(long)]
    pub file: Option<String>,
}

impl SaveArgs {
    /// Objects to save, from `--data` or `--file`.
    pub fn objects(&self) -> Result<Vec<Value>> {
        let text = match (&self.data, &self.file) {
            (Some(data), _) => data.clone(),
            (None, Some(path)) => read_input(path)?,
            (None, None) => {
                return Err(ClientError::InvalidInput(
                    "one of --data or --file is required".into(),
                ))
            }
        };
        match serde_json::from_str(&text)? {
            Value::Array(objects) => Ok(objects),
            object @ Value::Object(_) => Ok(vec![object]),
            other => Err(ClientError::InvalidInput(format!(
                "expected an object or an array of objects, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Entity name (singular).
    pub entity: String,
    /// Object ID.
    pub id: String,
}

/// Reads a whole file, or stdin for `-`.
pub fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(Path::new(path))?)
}
