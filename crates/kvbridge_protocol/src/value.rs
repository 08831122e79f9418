//! Canonical resource values and their JSON encodings.
//!
//! Two decoders exist for wire bodies:
//! - [`ResourceValue::from_wire`] is lenient and used on data coming back from
//!   the remote store: anything that is not an array becomes empty.
//! - [`ResourceValue::validate_wire`] is strict and used by the remote store
//!   on incoming writes: non-array fields are rejected.

use crate::account::Account;
use crate::error::{ProtocolError, ProtocolResult};
use crate::resource::ResourceKind;
use serde::Serialize;
use serde_json::{json, Value};

/// The canonical value of one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    /// Catalog items and their grouping labels.
    Catalog {
        /// Catalog items.
        products: Vec<Value>,
        /// Grouping labels.
        cats: Vec<Value>,
    },
    /// Orders.
    Orders(Vec<Value>),
    /// Ledger entries.
    Bank(Vec<Value>),
    /// Normalized accounts.
    Users(Vec<Account>),
}

impl ResourceValue {
    /// Returns the empty value for a resource.
    pub fn empty(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Catalog => ResourceValue::Catalog {
                products: Vec::new(),
                cats: Vec::new(),
            },
            ResourceKind::Orders => ResourceValue::Orders(Vec::new()),
            ResourceKind::Bank => ResourceValue::Bank(Vec::new()),
            ResourceKind::Users => ResourceValue::Users(Vec::new()),
        }
    }

    /// Builds a value for `kind` from its primary array.
    ///
    /// For the catalog the array is the item list and labels are left empty.
    pub fn from_items(kind: ResourceKind, items: Vec<Value>) -> Self {
        match kind {
            ResourceKind::Catalog => ResourceValue::Catalog {
                products: items,
                cats: Vec::new(),
            },
            ResourceKind::Orders => ResourceValue::Orders(items),
            ResourceKind::Bank => ResourceValue::Bank(items),
            ResourceKind::Users => ResourceValue::Users(Account::from_values(&items)),
        }
    }

    /// Returns the resource this value belongs to.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceValue::Catalog { .. } => ResourceKind::Catalog,
            ResourceValue::Orders(_) => ResourceKind::Orders,
            ResourceValue::Bank(_) => ResourceKind::Bank,
            ResourceValue::Users(_) => ResourceKind::Users,
        }
    }

    /// Returns true if every array of the value is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            ResourceValue::Catalog { products, cats } => products.is_empty() && cats.is_empty(),
            ResourceValue::Orders(items) | ResourceValue::Bank(items) => items.is_empty(),
            ResourceValue::Users(accounts) => accounts.is_empty(),
        }
    }

    /// Decodes a body returned by the remote store, normalizing bad fields to
    /// empty arrays.
    pub fn from_wire(kind: ResourceKind, body: &Value) -> Self {
        let array = |field: &str| -> Vec<Value> {
            body.get(field)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        match kind {
            ResourceKind::Catalog => ResourceValue::Catalog {
                products: array("products"),
                cats: array("cats"),
            },
            ResourceKind::Orders => ResourceValue::Orders(array("orders")),
            ResourceKind::Bank => ResourceValue::Bank(array("log")),
            ResourceKind::Users => ResourceValue::Users(Account::from_values(&array("users"))),
        }
    }

    /// Decodes and validates a write body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidBody`] if a required field is missing
    /// or is not an array.
    pub fn validate_wire(kind: ResourceKind, body: &Value) -> ProtocolResult<Self> {
        let array = |field: &str| -> ProtocolResult<Vec<Value>> {
            body.get(field)
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| {
                    ProtocolError::invalid_body(kind, format!("{field} must be an array"))
                })
        };
        Ok(match kind {
            ResourceKind::Catalog => {
                let cats = array("cats")?;
                let products = array("products")?;
                ResourceValue::Catalog { products, cats }
            }
            ResourceKind::Orders => ResourceValue::Orders(array("orders")?),
            ResourceKind::Bank => ResourceValue::Bank(array("log")?),
            ResourceKind::Users => ResourceValue::Users(Account::from_values(&array("users")?)),
        })
    }

    /// Encodes the value as its wire body, e.g. `{"orders": [...]}`.
    pub fn to_wire(&self) -> Value {
        match self {
            ResourceValue::Catalog { products, cats } => {
                json!({ "products": products, "cats": cats })
            }
            ResourceValue::Orders(items) => json!({ "orders": items }),
            ResourceValue::Bank(items) => json!({ "log": items }),
            ResourceValue::Users(accounts) => json!({ "users": accounts }),
        }
    }

    /// Serializes the primary array as stored under the canonical key.
    ///
    /// For the catalog this is the item list; labels live under their own key.
    pub fn primary_json(&self) -> String {
        match self {
            ResourceValue::Catalog { products, .. } => to_json_string(products),
            ResourceValue::Orders(items) | ResourceValue::Bank(items) => to_json_string(items),
            ResourceValue::Users(accounts) => to_json_string(accounts),
        }
    }

    /// Serialized form used to compare local and remote content.
    pub fn fingerprint(&self) -> String {
        self.to_wire().to_string()
    }
}

/// Parses a stored string as a JSON array.
///
/// Missing, malformed, or non-array content yields an empty array.
pub fn parse_json_array(raw: Option<&str>) -> Vec<Value> {
    raw.and_then(|s| serde_json::from_str::<Value>(s).ok())
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default()
}

/// Serializes a slice as a JSON array string, falling back to `[]`.
pub fn to_json_string<T: Serialize>(items: &[T]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lenient_decode_normalizes_to_empty() {
        let value = ResourceValue::from_wire(ResourceKind::Catalog, &json!({"products": 5}));
        assert_eq!(value, ResourceValue::empty(ResourceKind::Catalog));

        let value = ResourceValue::from_wire(ResourceKind::Bank, &json!(null));
        assert!(value.is_empty());
    }

    #[test]
    fn strict_decode_rejects_non_arrays() {
        let body = json!({"products": [], "cats": {}});
        let err = ResourceValue::validate_wire(ResourceKind::Catalog, &body).unwrap_err();
        assert_eq!(err.to_string(), "invalid catalog body: cats must be an array");

        let body = json!({"orders": "x"});
        assert!(ResourceValue::validate_wire(ResourceKind::Orders, &body).is_err());
        assert!(ResourceValue::validate_wire(ResourceKind::Orders, &json!({})).is_err());
        assert!(ResourceValue::validate_wire(ResourceKind::Users, &json!([])).is_err());
    }

    #[test]
    fn strict_decode_accepts_arrays() {
        let body = json!({"orders": [{"id": 1}]});
        let value = ResourceValue::validate_wire(ResourceKind::Orders, &body).unwrap();
        assert_eq!(value, ResourceValue::Orders(vec![json!({"id": 1})]));
    }

    #[test]
    fn wire_body_shapes() {
        let catalog = ResourceValue::Catalog {
            products: vec![json!({"id": 1})],
            cats: vec![json!("a")],
        };
        assert_eq!(catalog.to_wire(), json!({"products": [{"id": 1}], "cats": ["a"]}));
        assert_eq!(
            ResourceValue::Bank(vec![json!(1)]).to_wire(),
            json!({"log": [1]})
        );
        assert_eq!(catalog.primary_json(), r#"[{"id":1}]"#);
    }

    #[test]
    fn users_are_normalized_on_decode() {
        let value = ResourceValue::from_wire(
            ResourceKind::Users,
            &json!({"users": [{"login": "ann"}, 42]}),
        );
        match value {
            ResourceValue::Users(accounts) => {
                assert_eq!(accounts.len(), 1);
                assert_eq!(accounts[0].display_name, "ann");
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn parse_json_array_cases() {
        assert!(parse_json_array(None).is_empty());
        assert!(parse_json_array(Some("not json")).is_empty());
        assert!(parse_json_array(Some(r#"{"a":1}"#)).is_empty());
        assert_eq!(parse_json_array(Some("[1,2]")), vec![json!(1), json!(2)]);
    }

    proptest! {
        #[test]
        fn parse_json_array_never_panics(raw in ".*") {
            let _ = parse_json_array(Some(&raw));
        }

        #[test]
        fn fingerprint_matches_for_equal_values(
            items in proptest::collection::vec(any::<i64>(), 0..16)
        ) {
            let a = ResourceValue::Orders(items.iter().map(|i| json!({"id": i})).collect());
            let b = ResourceValue::from_wire(ResourceKind::Orders, &a.to_wire());
            prop_assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }
}
