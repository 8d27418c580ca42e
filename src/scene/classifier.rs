use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::SceneType;
use crate::config::SceneConfig;

/// Decides whether a photo shows a plated meal or a packaged product.
#[async_trait]
pub trait SceneClassifier: Send + Sync {
    async fn classify(&self, image: &str) -> anyhow::Result<SceneType>;
}

const SYSTEM_PROMPT: &str =
    "You are an image classifier for a nutrition app. Reply with only one word: \"meal\" or \"product\".";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct OpenAiSceneClassifier {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiSceneClassifier {
    /// `None` when no API key is configured.
    pub fn from_config(config: &SceneConfig) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        Some(Self {
            client: Client::new(),
            api_key,
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}

/// Reads the model's one-word answer; anything unrecognised is a meal.
pub fn parse_answer(raw: &str) -> SceneType {
    let raw = raw.trim().to_lowercase();
    if raw.contains("product") {
        SceneType::Product
    } else {
        SceneType::Meal
    }
}

#[async_trait]
impl SceneClassifier for OpenAiSceneClassifier {
    async fn classify(&self, image: &str) -> anyhow::Result<SceneType> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                json!({ "role": "system", "content": SYSTEM_PROMPT }),
                json!({
                    "role": "user",
                    "content": [{ "type": "image_url", "image_url": { "url": image } }],
                }),
            ],
            max_tokens: 5,
        };

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("send scene classification request")?
            .error_for_status()
            .context("scene classification rejected")?;

        let body: ChatResponse = response
            .json()
            .await
            .context("parse scene classification response")?;
        let raw = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(answer = %raw, "scene classifier answered");
        Ok(parse_answer(&raw))
    }
}
