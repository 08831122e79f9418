//! Account records, normalized once at the data-model boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields that may carry an account's human-readable name, in priority order.
const NAME_FIELDS: [&str; 6] = ["displayName", "username", "login", "name", "nick", "email"];

/// A user account in canonical shape.
///
/// External records come in many shapes; [`Account::from_value`] maps them
/// once into `{ id, displayName, ...extra }` so that nothing downstream has to
/// guess which field identifies a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account identifier.
    pub id: String,
    /// Human-readable name; also the per-entity alias suffix.
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Every other field of the original record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    /// Creates an account with no extra fields.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            extra: Map::new(),
        }
    }

    /// Normalizes an arbitrary JSON record.
    ///
    /// Returns `None` for non-objects and for records carrying neither an id
    /// nor any name field. A missing id falls back to the name and vice versa.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let id = obj.get("id").and_then(scalar_text);
        let name = NAME_FIELDS
            .iter()
            .find_map(|field| obj.get(*field).and_then(scalar_text));

        let (id, display_name) = match (id, name) {
            (None, None) => return None,
            (Some(id), None) => (id.clone(), id),
            (None, Some(name)) => (name.clone(), name),
            (Some(id), Some(name)) => (id, name),
        };

        let extra = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "id" && k.as_str() != "displayName")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            id,
            display_name,
            extra,
        })
    }

    /// Normalizes every element of an array, dropping unusable records.
    pub fn from_values(values: &[Value]) -> Vec<Self> {
        values.iter().filter_map(Self::from_value).collect()
    }

    /// Returns the case-folded name used by the lower-case lookup index.
    pub fn lookup_key(&self) -> String {
        self.display_name.to_lowercase()
    }

    /// Serializes the account to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
