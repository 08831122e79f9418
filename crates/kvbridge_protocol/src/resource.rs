//! The fixed set of synchronized resources.

use crate::error::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// One of the four resources kept in sync with the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Catalog items plus their grouping labels.
    Catalog,
    /// Orders placed by the host application.
    Orders,
    /// Append-style payment ledger.
    Bank,
    /// Account records.
    Users,
}

impl ResourceKind {
    /// Number of resource kinds.
    pub const COUNT: usize = 4;

    /// All resource kinds in a stable order.
    pub const ALL: [ResourceKind; Self::COUNT] = [
        ResourceKind::Catalog,
        ResourceKind::Orders,
        ResourceKind::Bank,
        ResourceKind::Users,
    ];

    /// Returns the lowercase resource name used in URLs and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Catalog => "catalog",
            ResourceKind::Orders => "orders",
            ResourceKind::Bank => "bank",
            ResourceKind::Users => "users",
        }
    }

    /// Returns the REST path of the resource, e.g. `/api/orders`.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Catalog => "/api/catalog",
            ResourceKind::Orders => "/api/orders",
            ResourceKind::Bank => "/api/bank",
            ResourceKind::Users => "/api/users",
        }
    }

    /// Returns the body field holding the resource's array.
    ///
    /// The catalog body has two fields; this returns the items field.
    pub fn body_field(&self) -> &'static str {
        match self {
            ResourceKind::Catalog => "products",
            ResourceKind::Orders => "orders",
            ResourceKind::Bank => "log",
            ResourceKind::Users => "users",
        }
    }

    /// Dense index in `0..COUNT`, for per-resource tables.
    pub fn index(&self) -> usize {
        match self {
            ResourceKind::Catalog => 0,
            ResourceKind::Orders => 1,
            ResourceKind::Bank => 2,
            ResourceKind::Users => 3,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ProtocolError::UnknownResource(s.to_string()))
    }
}
