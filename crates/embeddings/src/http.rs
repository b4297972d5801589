/// HTTP embedding provider speaking the `{inputs} -> {embeddings}` protocol.
use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::provider::EmbeddingProvider;

pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<Secret<String>>,
    timeout: Duration,
}

impl HttpEmbeddingProvider {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key: api_key.map(Secret::new),
            timeout,
        }
    }
}

impl std::fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&EmbeddingRequest { inputs: texts });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let resp = request
            .send()
            .await?
            .error_for_status()?
            .json::<EmbeddingResponse>()
            .await?;

        if resp.embeddings.len() != texts.len() {
            anyhow::bail!(
                "embedding count mismatch: sent {} inputs, got {} vectors",
                texts.len(),
                resp.embeddings.len()
            );
        }
        Ok(resp.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let provider = HttpEmbeddingProvider::new(
            "http://localhost:9900/embeddings".into(),
            Some("super-secret".into()),
            Duration::from_secs(30),
        );
        let output = format!("{provider:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super-secret"));
    }

    #[test]
    fn response_parsing() {
        let json = r#"{"embeddings": [[0.1, 0.2], [0.3, 0.4]]}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.embeddings.len(), 2);
        assert_eq!(resp.embeddings[0], vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Port 9 (discard) with a tiny timeout: the request must fail, not hang.
        let provider = HttpEmbeddingProvider::new(
            "http://127.0.0.1:9/embeddings".into(),
            None,
            Duration::from_millis(200),
        );
        let result = provider.embed_batch(&["hello".to_string()]).await;
        assert!(result.is_err());
    }
}
