#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sopdesk_core::config::Settings;
use sopdesk_core::traits::{Embedder, Generator};
use sopdesk_core::{Error, Result};
use sopdesk_llm::HashEmbedder;

pub const SOP: &str = "Returns must be filed within 30 days of delivery.\n\n\
Refunds take 5-7 business days after the returned item is inspected.\n\n\
Damaged shipments must be reported with photos within 48 hours.";

/// Answers with the first rule whose key occurs in the prompt.
#[derive(Default)]
pub struct ScriptedGenerator {
    rules: Vec<(String, std::result::Result<String, String>)>,
    delays: Vec<(String, Duration)>,
    fallback: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, key: &str, output: &str) -> Self {
        self.rules.push((key.to_string(), Ok(output.to_string())));
        self
    }

    pub fn fail(mut self, key: &str, message: &str) -> Self {
        self.rules.push((key.to_string(), Err(message.to_string())));
        self
    }

    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.delays.push((key.to_string(), delay));
        self
    }

    pub fn otherwise(mut self, output: &str) -> Self {
        self.fallback = Some(output.to_string());
        self
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some((_, delay)) = self.delays.iter().find(|(k, _)| prompt.contains(k.as_str())) {
            tokio::time::sleep(*delay).await;
        }
        match self.rules.iter().find(|(k, _)| prompt.contains(k.as_str())) {
            Some((_, Ok(out))) => Ok(out.clone()),
            Some((_, Err(msg))) => Err(Error::Generation(msg.clone())),
            None => self.fallback.clone().ok_or_else(|| Error::Generation("no scripted reply".into())),
        }
    }
}

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(64))
}

pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.chunking.chunk_size = 80;
    settings.chunking.chunk_overlap = 10;
    settings.retrieval.top_k = 2;
    settings
}

pub fn coverage_json(coverage_type: &str, reason: &str) -> String {
    format!(r#"Here is my assessment: {{"coverage_type": "{coverage_type}", "reason": "{reason}"}} Thanks!"#)
}
