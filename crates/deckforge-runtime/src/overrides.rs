//! Runtime configuration overrides.
//!
//! A process-local, namespaced key/value store used by the settings
//! endpoints to change configuration without a restart. Values are JSON
//! objects merged key by key over the base configuration.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};

use crate::{WorkflowError, WorkflowResult};

/// Override namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Namespace {
    /// Text backend settings.
    Llm,
    /// Reflection reviewer settings.
    Reflection,
}

/// Override map of one namespace.
pub type OverrideMap = Map<String, Value>;

/// Thread-safe namespaced override store.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    inner: Arc<RwLock<HashMap<Namespace, OverrideMap>>>,
}

impl RuntimeOverrides {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the namespace's overrides, if any are set.
    pub fn get(&self, namespace: Namespace) -> Option<OverrideMap> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&namespace)
            .filter(|map| !map.is_empty())
            .cloned()
    }

    /// Replaces the namespace's overrides.
    pub fn set(&self, namespace: Namespace, overrides: OverrideMap) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace, overrides);
    }

    /// Merges `patch` into the namespace's overrides and returns the result.
    pub fn update(&self, namespace: Namespace, patch: OverrideMap) -> OverrideMap {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let current = guard.entry(namespace).or_default();
        current.extend(patch);
        current.clone()
    }

    /// Removes the namespace's overrides.
    pub fn clear(&self, namespace: Namespace) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&namespace);
    }

    /// Applies the namespace's overrides to `base`.
    ///
    /// Keys that are not fields of `T` are ignored.
    pub fn merge_with<T>(&self, namespace: Namespace, base: &T) -> WorkflowResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(overrides) = self.get(namespace) else {
            return Ok(serde_json::from_value(serde_json::to_value(base)?)?);
        };

        let Value::Object(mut fields) = serde_json::to_value(base)? else {
            return Err(WorkflowError::config(format!(
                "{namespace} settings are not an object"
            )));
        };
        for (key, value) in overrides {
            if let Some(slot) = fields.get_mut(&key) {
                *slot = value;
            } else if base_allows_absent_key(&key) {
                fields.insert(key, value);
            }
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| WorkflowError::config(format!("invalid {namespace} override: {e}")))
    }
}

/// Optional fields are skipped when unset, so they are absent from the
/// serialized base but still valid override targets.
fn base_allows_absent_key(key: &str) -> bool {
    matches!(key, "api_key" | "base_url")
}
