//! Clients for OpenAI-compatible `/embeddings` and `/chat/completions`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use sopdesk_core::config::{EmbeddingSettings, GenerationSettings};
use sopdesk_core::traits::{Embedder, Generator};
use sopdesk_core::{Error, Result};

/// Output sizes of the hosted embedding models we know about.
pub fn known_model_dim(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

fn read_api_key(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Some(key),
        _ => {
            tracing::warn!(env = var, "no API key set; sending unauthenticated requests");
            None
        }
    }
}

fn http_client(timeout_secs: u64) -> std::result::Result<Client, reqwest::Error> {
    Client::builder().timeout(Duration::from_secs(timeout_secs)).build()
}

fn with_auth(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

fn describe_status(status: StatusCode, body: &str) -> String {
    if status == StatusCode::TOO_MANY_REQUESTS {
        format!("rate limited ({status}): {body}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingItem {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// Put returned vectors back in request order and check the count and
/// dimensionality, so no input is ever silently dropped.
pub fn ordered_embeddings(response: EmbeddingResponse, expected: usize, dim: usize) -> Result<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in response.data {
        if item.embedding.len() != dim {
            return Err(Error::Provider(format!(
                "embedding {} has {} dimensions, expected {}",
                item.index,
                item.embedding.len(),
                dim
            )));
        }
        let Some(slot) = slots.get_mut(item.index) else {
            return Err(Error::Provider(format!("embedding index {} out of range", item.index)));
        };
        if slot.is_some() {
            return Err(Error::Provider(format!("duplicate embedding index {}", item.index)));
        }
        *slot = Some(item.embedding);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or_else(|| Error::Provider(format!("missing embedding for input {i}"))))
        .collect()
}

pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    dim: usize,
    id: String,
}

impl OpenAiEmbedder {
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        let client = http_client(settings.request_timeout_secs).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let dim = known_model_dim(&settings.model).unwrap_or(settings.dim);
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: read_api_key(&settings.api_key_env),
            dim,
            id: format!("openai:{}:d{}", settings.model, dim),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest { model: &self.model, input: texts };
        let res = with_auth(self.client.post(&url), self.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(Error::provider)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Provider(describe_status(status, &text)));
        }
        let payload: EmbeddingResponse = res.json().await.map_err(Error::provider)?;
        tracing::debug!(inputs = texts.len(), model = %self.model, "embedded batch");
        ordered_embeddings(payload, texts.len(), self.dim)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
}

pub fn first_choice(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::Generation("response contained no message content".to_string()))
}

pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let client = http_client(settings.request_timeout_secs).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: read_api_key(&settings.api_key_env),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let res = with_auth(self.client.post(&url), self.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(Error::generation)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Generation(describe_status(status, &text)));
        }
        let payload: ChatResponse = res.json().await.map_err(Error::generation)?;
        first_choice(payload)
    }
}
