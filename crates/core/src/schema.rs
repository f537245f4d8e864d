//! Entity schema traits.
//!
//! An entity is a named kind of record with a read shape (what storage
//! returns) and, when it is writable, a write shape (what storage accepts).
//! The read shape is expected to carry every written field plus the fields
//! computed by the server, such as generated identifiers and timestamps.
//!
//! # Examples
//!
//! ```
//! use repokit_core::schema::{Entity, Schema, WritableEntity};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct UserRecord {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[derive(Debug, Serialize)]
//! pub struct NewUser {
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub id: Option<String>,
//!     pub name: String,
//! }
//!
//! pub struct User;
//!
//! impl Entity for User {
//!     const NAME: &'static str = "user";
//!     type FromStorage = UserRecord;
//! }
//!
//! impl WritableEntity for User {
//!     type ToStorage = NewUser;
//! }
//!
//! pub struct AppSchema;
//!
//! impl Schema for AppSchema {
//!     const ENTITIES: &'static [&'static str] = &[User::NAME];
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A named kind of record that can be read from storage.
///
/// Entities that only implement this trait are read-only: their repositories
/// expose `find` and `get` but no write operations.
pub trait Entity: Send + Sync + 'static {
    /// Entity name, as used on the wire and as the repository key.
    const NAME: &'static str;

    /// Name of the primary key field.
    const ID_FIELD: &'static str = "id";

    /// Shape returned by storage.
    type FromStorage: DeserializeOwned + Serialize + Clone + Send + Sync + 'static;
}

/// An entity that also accepts writes.
pub trait WritableEntity: Entity {
    /// Shape accepted by storage on insert and update.
    type ToStorage: Serialize + Send + Sync;
}

/// A static list of entity names a repository group is built for.
pub trait Schema {
    const ENTITIES: &'static [&'static str];

    /// Entities of `ENTITIES` whose repositories reject writes.
    const READ_ONLY: &'static [&'static str] = &[];
}

/// Returns true when `object` carries a non-empty identifier in `id_field`.
///
/// Present, non-null and not an empty string counts as non-empty. This is
/// what separates update semantics from insert semantics.
pub fn has_identifier(object: &Value, id_field: &str) -> bool {
    match object.get(id_field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Extracts the identifier of `object` as a string, if it has one.
pub fn identifier_of(object: &Value, id_field: &str) -> Option<String> {
    match object.get(id_field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
