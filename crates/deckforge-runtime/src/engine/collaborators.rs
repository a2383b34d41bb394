//! External collaborators used by a workflow run.

use std::sync::Arc;

use async_trait::async_trait;
use deckforge_rig::backend::{ClientCache, LlmConfig, SharedBackend, connect_backend};
use deckforge_rig::render::{BrowserlessRenderer, Renderer};
use deckforge_rig::research::{NoResearch, ResearchBackend};

use crate::config::ReflectionConfig;
use crate::{TRACING_TARGET_ENGINE, WorkflowResult};

/// Backends and services a workflow talks to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Outline, component and fix generation.
    pub generator: SharedBackend,
    /// Reflection judge.
    pub evaluator: SharedBackend,
    /// Screenshot judge.
    pub vision: Option<SharedBackend>,
    /// Web research.
    pub research: Arc<dyn ResearchBackend>,
    /// Screenshot renderer.
    pub renderer: Option<Arc<dyn Renderer>>,
}

impl Collaborators {
    /// Uses `generator` for every text call, without research or rendering.
    pub fn new(generator: SharedBackend) -> Self {
        Self {
            evaluator: generator.clone(),
            generator,
            vision: None,
            research: Arc::new(NoResearch),
            renderer: None,
        }
    }

    /// Sets the reflection judge.
    pub fn with_evaluator(mut self, evaluator: SharedBackend) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Sets the screenshot judge and renderer.
    pub fn with_visual(mut self, vision: SharedBackend, renderer: Arc<dyn Renderer>) -> Self {
        self.vision = Some(vision);
        self.renderer = Some(renderer);
        self
    }

    /// Sets the research backend.
    pub fn with_research(mut self, research: Arc<dyn ResearchBackend>) -> Self {
        self.research = research;
        self
    }
}

/// Builds the collaborators of a run from the effective configuration.
#[async_trait]
pub trait CollaboratorFactory: Send + Sync + std::fmt::Debug {
    /// Returns collaborators for the given LLM and reflection settings.
    async fn collaborators(
        &self,
        llm: &LlmConfig,
        reflection: &ReflectionConfig,
    ) -> WorkflowResult<Collaborators>;

    /// Drops cached clients after a configuration change.
    async fn invalidate(&self) {}
}

/// Factory returning the same collaborators for every run.
#[derive(Debug, Clone)]
pub struct FixedCollaborators(pub Collaborators);

#[async_trait]
impl CollaboratorFactory for FixedCollaborators {
    async fn collaborators(
        &self,
        _llm: &LlmConfig,
        _reflection: &ReflectionConfig,
    ) -> WorkflowResult<Collaborators> {
        Ok(self.0.clone())
    }
}

/// Factory connecting real backends through a shared [`ClientCache`].
#[derive(Debug, Clone)]
pub struct ConnectingFactory {
    cache: ClientCache,
    research: Arc<dyn ResearchBackend>,
}

impl ConnectingFactory {
    /// Creates a factory using the given research backend.
    pub fn new(research: Arc<dyn ResearchBackend>) -> Self {
        Self {
            cache: ClientCache::new(),
            research,
        }
    }

    /// Returns the client cache.
    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }
}

#[async_trait]
impl CollaboratorFactory for ConnectingFactory {
    async fn collaborators(
        &self,
        llm: &LlmConfig,
        reflection: &ReflectionConfig,
    ) -> WorkflowResult<Collaborators> {
        let generator = self.cache.get_or_connect(llm).await?;
        let mut collaborators =
            Collaborators::new(generator).with_research(self.research.clone());

        // The cache key ignores temperature, so the judge gets its own client.
        if reflection.enabled && reflection.enable_llm_review {
            let evaluator = connect_backend(
                llm.clone()
                    .with_temperature(reflection.evaluator_temperature),
            )?;
            collaborators = collaborators.with_evaluator(evaluator);
        }

        if reflection.visual_review_active() {
            let vision_config = llm.clone().with_model(reflection.visual_review_model.clone());
            let vision = self.cache.get_or_connect(&vision_config).await?;
            let renderer = BrowserlessRenderer::new(
                &reflection.renderer_url,
                &reflection.preview_url,
                reflection.visual_review_timeout(),
            )?;
            collaborators = collaborators.with_visual(vision, Arc::new(renderer));
        }

        Ok(collaborators)
    }

    async fn invalidate(&self) {
        self.cache.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use deckforge_rig::backend::LlmProvider;
    use deckforge_rig::mock::MockBackend;

    use super::*;

    #[tokio::test]
    async fn fixed_factory_ignores_config() {
        let factory = FixedCollaborators(Collaborators::new(Arc::new(MockBackend::new())));
        let llm = LlmConfig::new(LlmProvider::OpenAi, "");
        let collaborators = factory
            .collaborators(&llm, &ReflectionConfig::default())
            .await
            .unwrap();

        assert!(collaborators.vision.is_none());
        assert!(!collaborators.research.enabled());
    }

    #[tokio::test]
    async fn connecting_factory_requires_api_key() {
        let factory = ConnectingFactory::new(Arc::new(NoResearch));
        let llm = LlmConfig::new(LlmProvider::OpenAi, "");
        let result = factory
            .collaborators(&llm, &ReflectionConfig::default())
            .await;

        assert!(result.is_err());
        assert!(factory.cache().is_empty().await);
    }
}
