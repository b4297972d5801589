/// HTTP chat-completion client speaking `{prompt, context, max_tokens} -> {text}`.
use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate an answer for `prompt` grounded in `context`.
    ///
    /// Errors propagate: the caller decides how to degrade (the backend
    /// substitutes a fixed apology while keeping the retrieved context).
    async fn complete(&self, prompt: &str, context: &str) -> anyhow::Result<String>;
}

pub struct HttpChatProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<Secret<String>>,
    max_tokens: u32,
    timeout: Duration,
}

impl HttpChatProvider {
    pub fn new(url: String, api_key: Option<String>, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key: api_key.map(Secret::new),
            max_tokens,
            timeout,
        }
    }
}

impl std::fmt::Debug for HttpChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatProvider")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    context: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn complete(&self, prompt: &str, context: &str) -> anyhow::Result<String> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&CompletionRequest {
                prompt,
                context,
                max_tokens: self.max_tokens,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let resp = request
            .send()
            .await?
            .error_for_status()?
            .json::<CompletionResponse>()
            .await?;

        Ok(resp.text)
    }
}
