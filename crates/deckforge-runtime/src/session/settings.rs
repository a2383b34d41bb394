//! Runtime settings of the session manager.

use deckforge_rig::backend::LlmConfig;
use serde::Serialize;

use super::SessionManager;
use crate::config::{ReflectionConfig, merge_reflection_config};
use crate::overrides::{Namespace, OverrideMap};
use crate::{TRACING_TARGET_SESSION, WorkflowError, WorkflowResult};

/// Reflection settings with their provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectionSettings {
    /// Configuration loaded at startup.
    pub base: ReflectionConfig,
    /// Runtime overrides.
    pub overrides: OverrideMap,
    /// Configuration used by new runs.
    pub effective: ReflectionConfig,
    /// Fields changed by the overrides.
    pub overridden_fields: Vec<String>,
}

impl SessionManager {
    /// Returns the LLM configuration loaded at startup.
    pub fn llm_config(&self) -> &LlmConfig {
        &self.inner.llm
    }

    /// Returns the LLM configuration with runtime overrides applied.
    pub fn effective_llm_config(&self) -> WorkflowResult<LlmConfig> {
        let config: LlmConfig = self.inner.overrides.merge_with(Namespace::Llm, &self.inner.llm)?;
        config.validate().map_err(WorkflowError::config)?;
        Ok(config)
    }

    /// Merges `patch` into the LLM overrides and drops cached clients.
    ///
    /// An invalid result leaves the previous overrides in place.
    pub async fn update_llm_settings(&self, patch: OverrideMap) -> WorkflowResult<LlmConfig> {
        let config = self.patch_overrides(Namespace::Llm, patch, |manager| {
            manager.effective_llm_config()
        })?;
        self.invalidate_clients().await;

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            provider = %config.provider,
            model = %config.model,
            "LLM settings updated"
        );
        Ok(config)
    }

    /// Returns the reflection configuration with runtime overrides applied
    /// and the names of the overridden fields.
    pub fn effective_reflection_config(&self) -> WorkflowResult<(ReflectionConfig, Vec<String>)> {
        let overrides = self.inner.overrides.get(Namespace::Reflection);
        merge_reflection_config(&self.inner.config.reflection, overrides.as_ref())
    }

    /// Returns the reflection settings.
    pub fn reflection_settings(&self) -> WorkflowResult<ReflectionSettings> {
        let (effective, overridden_fields) = self.effective_reflection_config()?;
        Ok(ReflectionSettings {
            base: self.inner.config.reflection.clone(),
            overrides: self
                .inner
                .overrides
                .get(Namespace::Reflection)
                .unwrap_or_default(),
            effective,
            overridden_fields,
        })
    }

    /// Merges `patch` into the reflection overrides.
    ///
    /// An invalid result leaves the previous overrides in place.
    pub fn update_reflection_settings(
        &self,
        patch: OverrideMap,
    ) -> WorkflowResult<ReflectionSettings> {
        let settings = self.patch_overrides(Namespace::Reflection, patch, |manager| {
            manager.reflection_settings()
        })?;

        tracing::info!(
            target: TRACING_TARGET_SESSION,
            overridden = ?settings.overridden_fields,
            "Reflection settings updated"
        );
        Ok(settings)
    }

    /// Drops every reflection override.
    pub fn reset_reflection_settings(&self) -> WorkflowResult<ReflectionSettings> {
        self.inner.overrides.clear(Namespace::Reflection);
        tracing::info!(target: TRACING_TARGET_SESSION, "Reflection settings reset");
        self.reflection_settings()
    }

    /// Drops cached backend clients.
    pub async fn invalidate_clients(&self) {
        self.inner.factory.invalidate().await;
    }

    fn patch_overrides<T, F>(&self, namespace: Namespace, patch: OverrideMap, check: F) -> WorkflowResult<T>
    where
        F: FnOnce(&Self) -> WorkflowResult<T>,
    {
        let previous = self.inner.overrides.get(namespace);
        self.inner.overrides.update(namespace, patch);

        check(self).inspect_err(|_| match previous {
            Some(previous) => self.inner.overrides.set(namespace, previous),
            None => self.inner.overrides.clear(namespace),
        })
    }
}
