/// Degraded-mode wrapper: on provider failure, substitute uniform-random
/// vectors of a fixed dimension instead of failing the pipeline.
///
/// An index built through the fallback is degraded rather than trustworthy;
/// the backend's dimension-mismatch surface is what makes a mixed build
/// visible to callers.
use {async_trait::async_trait, rand::Rng, tracing::warn};

use crate::provider::EmbeddingProvider;

pub struct FallbackEmbeddings<P> {
    inner: P,
    fallback_dimensions: usize,
}

impl<P> FallbackEmbeddings<P> {
    pub fn new(inner: P, fallback_dimensions: usize) -> Self {
        Self {
            inner,
            fallback_dimensions,
        }
    }
}

fn random_vectors(count: usize, dimensions: usize) -> Vec<Vec<f32>> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| (0..dimensions).map(|_| rng.random::<f32>()).collect())
        .collect()
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for FallbackEmbeddings<P> {
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        match self.inner.embed_batch(texts).await {
            Ok(vectors) => Ok(vectors),
            Err(e) => {
                warn!(
                    error = %e,
                    inputs = texts.len(),
                    dimensions = self.fallback_dimensions,
                    "embedding provider failed, substituting random vectors"
                );
                Ok(random_vectors(texts.len(), self.fallback_dimensions))
            },
        }
    }
}
