//! Canonical/alias mirroring.
//!
//! Every write made here is silent: it goes straight to the undecorated store
//! and never reaches the interception layer. Callers hold the bridge state
//! lock while mirroring.

use crate::classify::{AliasShape, KeyRules, ResourceKeys};
use kvbridge_protocol::{parse_json_array, Account, ResourceKind, ResourceValue};
use kvbridge_storage::{KeyValueStore, StorageResult};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Reads and writes canonical values and keeps alias keys in step with them.
pub(crate) struct MirrorEngine {
    store: Arc<dyn KeyValueStore>,
    rules: KeyRules,
}

impl MirrorEngine {
    pub(crate) fn new(store: Arc<dyn KeyValueStore>, rules: KeyRules) -> Self {
        Self { store, rules }
    }

    fn keys(&self, kind: ResourceKind) -> &ResourceKeys {
        self.rules.keys(kind)
    }

    /// Reads the normalized canonical value of `kind`.
    pub(crate) fn read_canonical(&self, kind: ResourceKind) -> StorageResult<ResourceValue> {
        let keys = self.keys(kind);
        let items = parse_json_array(self.store.get(&keys.canonical)?.as_deref());
        let mut value = ResourceValue::from_items(kind, items);
        if let (ResourceValue::Catalog { cats, .. }, Some(labels)) = (&mut value, &keys.labels) {
            *cats = parse_json_array(self.store.get(labels)?.as_deref());
        }
        Ok(value)
    }

    /// Writes `value` under its canonical key(s).
    pub(crate) fn write_canonical(&self, value: &ResourceValue) -> StorageResult<()> {
        let keys = self.keys(value.kind());
        self.write_if_changed(&keys.canonical, &value.primary_json())?;
        if let (ResourceValue::Catalog { cats, .. }, Some(labels)) = (value, &keys.labels) {
            self.write_if_changed(labels, &kvbridge_protocol::to_json_string(cats))?;
        }
        Ok(())
    }

    /// Writes the labels key of the catalog.
    pub(crate) fn write_labels(&self, cats: &[Value]) -> StorageResult<()> {
        match &self.keys(ResourceKind::Catalog).labels {
            Some(labels) => {
                self.write_if_changed(labels, &kvbridge_protocol::to_json_string(cats))?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Copies the canonical value of `kind` into every alias key.
    ///
    /// Static synonyms are always written; prefix aliases only if they already
    /// exist. Returns the number of keys actually changed.
    pub(crate) fn fan_out(&self, kind: ResourceKind) -> StorageResult<usize> {
        let value = self.read_canonical(kind)?;
        let keys = self.keys(kind);
        let primary = value.primary_json();
        let mut changed = 0;

        // Raw user records are replaced by their normalized form
        if matches!(value, ResourceValue::Users(_))
            && self.write_if_changed(&keys.canonical, &primary)?
        {
            changed += 1;
        }

        let mut targets: Vec<String> = keys.synonyms.clone();
        for prefix in &keys.prefixes {
            targets.extend(
                self.store
                    .keys_with_prefix(prefix)?
                    .into_iter()
                    .filter(|k| k.len() > prefix.len()),
            );
        }
        for key in &targets {
            if self.write_if_changed(key, &primary)? {
                changed += 1;
            }
        }

        if let ResourceValue::Users(accounts) = &value {
            changed += self.fan_out_accounts(keys, accounts)?;
        }

        if changed > 0 {
            debug!(resource = %kind, changed, "fan-out");
        }
        Ok(changed)
    }

    fn fan_out_accounts(&self, keys: &ResourceKeys, accounts: &[Account]) -> StorageResult<usize> {
        let mut changed = 0;

        if let Some(prefix) = &keys.entity_prefix {
            let mut live = HashSet::new();
            for account in accounts {
                let key = format!("{prefix}{}", account.display_name);
                if self.write_if_changed(&key, &account.to_value().to_string())? {
                    changed += 1;
                }
                live.insert(key);
            }
            for key in self.store.keys_with_prefix(prefix)? {
                if key.len() > prefix.len() && !live.contains(&key) {
                    self.store.remove(&key)?;
                    changed += 1;
                }
            }
        }

        if let Some(index) = &keys.name_index {
            let dict = index_of(accounts, |a| a.display_name.clone());
            if self.write_if_changed(index, &dict.to_string())? {
                changed += 1;
            }
        }
        if let Some(index) = &keys.lower_index {
            let dict = index_of(accounts, Account::lookup_key);
            if self.write_if_changed(index, &dict.to_string())? {
                changed += 1;
            }
        }

        Ok(changed)
    }

    /// Folds a write to an alias key back into the canonical key, then fans
    /// the result out to every alias.
    ///
    /// `raw` is the alias's new content, `None` if it was removed.
    pub(crate) fn fan_in(
        &self,
        kind: ResourceKind,
        shape: &AliasShape,
        raw: Option<&str>,
    ) -> StorageResult<ResourceValue> {
        let current = self.read_canonical(kind)?;

        let next = match (shape, current) {
            (AliasShape::Mirror, ResourceValue::Catalog { cats, .. }) => ResourceValue::Catalog {
                products: parse_json_array(raw),
                cats,
            },
            (AliasShape::Mirror, _) => ResourceValue::from_items(kind, parse_json_array(raw)),
            (AliasShape::Entity(name), ResourceValue::Users(accounts)) => {
                ResourceValue::Users(upsert_entity(accounts, name, raw))
            }
            (AliasShape::NameIndex | AliasShape::LowerIndex, ResourceValue::Users(accounts)) => {
                ResourceValue::Users(merge_index(&accounts, raw))
            }
            // Account-shaped aliases only exist for users
            (_, other) => other,
        };

        self.write_canonical(&next)?;
        self.fan_out(kind)?;
        Ok(next)
    }

    fn write_if_changed(&self, key: &str, value: &str) -> StorageResult<bool> {
        if self.store.get(key)?.as_deref() == Some(value) {
            return Ok(false);
        }
        self.store.set(key, value)?;
        Ok(true)
    }
}

fn index_of(accounts: &[Account], key: impl Fn(&Account) -> String) -> Value {
    let mut dict = Map::new();
    for account in accounts {
        dict.insert(key(account), account.to_value());
    }
    Value::Object(dict)
}

fn upsert_entity(mut accounts: Vec<Account>, name: &str, raw: Option<&str>) -> Vec<Account> {
    let name = name.to_lowercase();
    let incoming = raw
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .and_then(|v| Account::from_value(&v));

    match incoming {
        Some(account) => {
            let slot = accounts
                .iter()
                .position(|a| a.id == account.id)
                .or_else(|| accounts.iter().position(|a| a.lookup_key() == name));
            match slot {
                Some(i) => accounts[i] = account,
                None => accounts.push(account),
            }
        }
        None => accounts.retain(|a| a.lookup_key() != name),
    }
    accounts
}

/// Replaces the account set with the dictionary's values, keeping canonical
/// order for accounts that survive and appending new ones.
fn merge_index(accounts: &[Account], raw: Option<&str>) -> Vec<Account> {
    let incoming: Vec<Account> = raw
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .and_then(|v| match v {
            Value::Object(dict) => Some(dict.into_iter().map(|(_, v)| v).collect::<Vec<_>>()),
            _ => None,
        })
        .map(|values| Account::from_values(&values))
        .unwrap_or_default();

    let mut merged: Vec<Account> = accounts
        .iter()
        .filter_map(|a| incoming.iter().find(|b| b.id == a.id).cloned())
        .collect();
    for account in incoming {
        if !merged.iter().any(|a| a.id == account.id) {
            merged.push(account);
        }
    }
    merged
}
