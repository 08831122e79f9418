//! Key classification.
//!
//! Every key the host touches maps to at most one resource. Exact names
//! (canonical keys, static synonyms, index keys) are checked before prefix
//! patterns, and among prefixes the longest match wins, so the result never
//! depends on rule order.

use kvbridge_protocol::ResourceKind;

/// How an alias key mirrors its resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasShape {
    /// Holds the same array as the canonical key.
    Mirror,
    /// Holds one account, named by the key suffix.
    Entity(String),
    /// Holds a `displayName -> account` dictionary.
    NameIndex,
    /// Holds a lower-cased `displayName -> account` dictionary.
    LowerIndex,
}

/// The role a key plays for its resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRole {
    /// The resource's canonical key. Writes schedule a push.
    Canonical,
    /// The catalog's canonical labels key. Writes schedule a push.
    Labels,
    /// A secondary key kept equal to the canonical key. Never pushes.
    Alias(AliasShape),
}

/// Result of classifying a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyClass {
    /// Resource the key belongs to.
    pub kind: ResourceKind,
    /// Role of the key.
    pub role: KeyRole,
}

impl KeyClass {
    fn new(kind: ResourceKind, role: KeyRole) -> Self {
        Self { kind, role }
    }

    /// Returns true if writes to this key originate a push.
    pub fn pushes(&self) -> bool {
        matches!(self.role, KeyRole::Canonical | KeyRole::Labels)
    }
}

/// Local key layout of one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceKeys {
    /// Canonical key.
    pub canonical: String,
    /// Canonical labels key (catalog only).
    pub labels: Option<String>,
    /// Static synonyms.
    pub synonyms: Vec<String>,
    /// Prefix namespaces; `prefix + suffix` with a non-empty suffix is an alias.
    pub prefixes: Vec<String>,
    /// Prefix of per-entity keys (users only).
    pub entity_prefix: Option<String>,
    /// Key of the name dictionary (users only).
    pub name_index: Option<String>,
    /// Key of the lower-cased name dictionary (users only).
    pub lower_index: Option<String>,
}

impl ResourceKeys {
    /// Creates a layout with only a canonical key.
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            ..Self::default()
        }
    }

    /// Sets the labels key.
    pub fn with_labels(mut self, key: impl Into<String>) -> Self {
        self.labels = Some(key.into());
        self
    }

    /// Adds static synonyms.
    pub fn with_synonyms<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Adds a prefix namespace.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Sets the per-entity key prefix.
    pub fn with_entity_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entity_prefix = Some(prefix.into());
        self
    }

    /// Sets the two dictionary keys.
    pub fn with_indexes(mut self, by_name: impl Into<String>, by_lower: impl Into<String>) -> Self {
        self.name_index = Some(by_name.into());
        self.lower_index = Some(by_lower.into());
        self
    }

    /// Returns the per-entity key for `display_name`.
    pub fn entity_key(&self, display_name: &str) -> Option<String> {
        self.entity_prefix
            .as_ref()
            .map(|prefix| format!("{prefix}{display_name}"))
    }

    fn exact(&self, key: &str) -> Option<KeyRole> {
        if key == self.canonical {
            return Some(KeyRole::Canonical);
        }
        if self.labels.as_deref() == Some(key) {
            return Some(KeyRole::Labels);
        }
        if self.synonyms.iter().any(|s| s == key) {
            return Some(KeyRole::Alias(AliasShape::Mirror));
        }
        if self.name_index.as_deref() == Some(key) {
            return Some(KeyRole::Alias(AliasShape::NameIndex));
        }
        if self.lower_index.as_deref() == Some(key) {
            return Some(KeyRole::Alias(AliasShape::LowerIndex));
        }
        None
    }

    /// Longest matching prefix with a non-empty suffix.
    fn prefixed(&self, key: &str) -> Option<(usize, KeyRole)> {
        let mirror = self
            .prefixes
            .iter()
            .filter(|p| key.len() > p.len() && key.starts_with(p.as_str()))
            .map(|p| (p.len(), KeyRole::Alias(AliasShape::Mirror)));
        let entity = self.entity_prefix.iter().filter_map(|p| {
            let suffix = key.strip_prefix(p.as_str())?;
            (!suffix.is_empty())
                .then(|| (p.len(), KeyRole::Alias(AliasShape::Entity(suffix.to_string()))))
        });
        mirror.chain(entity).max_by_key(|(len, _)| *len)
    }
}

/// Key layout for all resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRules {
    resources: [ResourceKeys; ResourceKind::COUNT],
}

impl KeyRules {
    /// Returns the layout of `kind`.
    pub fn keys(&self, kind: ResourceKind) -> &ResourceKeys {
        &self.resources[kind.index()]
    }

    /// Replaces the layout of `kind`.
    pub fn with_keys(mut self, kind: ResourceKind, keys: ResourceKeys) -> Self {
        self.resources[kind.index()] = keys;
        self
    }

    /// Classifies `key`. Returns `None` for keys no rule matches.
    pub fn classify(&self, key: &str) -> Option<KeyClass> {
        for kind in ResourceKind::ALL {
            if let Some(role) = self.keys(kind).exact(key) {
                return Some(KeyClass::new(kind, role));
            }
        }

        ResourceKind::ALL
            .into_iter()
            .filter_map(|kind| {
                self.keys(kind)
                    .prefixed(key)
                    .map(|(len, role)| (len, KeyClass::new(kind, role)))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, class)| class)
    }
}

impl Default for KeyRules {
    fn default() -> Self {
        Self {
            resources: [
                ResourceKeys::new("shop_catalog")
                    .with_labels("shop_cats")
                    .with_synonyms(["products", "goods", "catalog"])
                    .with_prefix("shop_catalog_"),
                ResourceKeys::new("shop_orders")
                    .with_synonyms(["my_orders"])
                    .with_prefix("shop_orders_"),
                ResourceKeys::new("mock_bank"),
                ResourceKeys::new("shop_users")
                    .with_synonyms(["users", "accounts"])
                    .with_entity_prefix("shop_user_")
                    .with_indexes("shop_users_by_name", "shop_users_by_lower"),
            ],
        }
    }
}
