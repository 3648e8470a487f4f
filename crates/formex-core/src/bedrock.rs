//! AWS Bedrock client for Claude models.
//!
//! The pipeline talks to the model through the [`ModelClient`] trait.
//! [`BedrockClient`] implements it on top of the Bedrock Converse API;
//! tests substitute their own implementation.
//!
//! ## Authentication
//!
//! Uses the default AWS credentials chain:
//! 1. Environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! 2. AWS credentials file (`~/.aws/credentials`)
//! 3. IAM role (for EC2/Lambda)
//!
//! ## Region
//!
//! An explicit region wins, then the ambient AWS region (`AWS_REGION`,
//! profile), then [`DEFAULT_REGION`].
//!
//! ## Example
//!
//! ```no_run
//! use formex_core::bedrock::{BedrockClient, ModelClient, ModelSettings};
//!
//! # async fn example() -> Result<(), formex_core::bedrock::InferenceError> {
//! let client = BedrockClient::new(Some("us-west-2"), ModelSettings::default()).await;
//! let reply = client.complete("Say hello as JSON").await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

// Token counts and latency cross between the SDK's integer types and ours
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message, StopReason,
    SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Region used when neither the caller nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Claude 3 Sonnet on-demand model identifier.
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// Default completion budget for form extraction.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Error, Debug)]
pub enum InferenceError {
    /// Request could not be built
    #[error("Failed to build request for {model_id}: {reason}")]
    Request { model_id: String, reason: String },

    /// Bedrock rejected or failed the call (auth, throttling, network, validation)
    #[error("Bedrock request to {model_id} failed: {reason}")]
    Service { model_id: String, reason: String },

    /// The reply had no text content
    #[error("Bedrock returned no text from {model_id}")]
    EmptyResponse { model_id: String },
}

/// Model and sampling parameters for one kind of request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            top_p: None,
        }
    }
}

impl ModelSettings {
    /// Sampling defaults for free-form conversation.
    #[must_use]
    pub fn conversational() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.7,
            top_p: Some(0.95),
            ..Self::default()
        }
    }
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Raw model completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    /// Completion text, possibly with prose around any JSON
    pub text: String,
    pub usage: Option<Usage>,
    /// Generation stopped at the token limit
    pub truncated: bool,
}

impl ModelResponse {
    /// A complete reply with no usage information.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            truncated: false,
        }
    }
}

/// Anything that can answer a prompt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier of the model answering requests.
    fn model_id(&self) -> &str;

    /// Send a conversation and return the next assistant turn.
    async fn converse(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<ModelResponse, InferenceError>;

    /// Send a single user prompt.
    async fn complete(&self, prompt: &str) -> Result<ModelResponse, InferenceError> {
        self.converse(None, &[ChatMessage::user(prompt)]).await
    }
}

/// AWS Bedrock client bound to one model and sampling configuration.
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: Client,
    settings: ModelSettings,
}

impl BedrockClient {
    /// Create a client from the ambient AWS configuration.
    ///
    /// Credentials are resolved lazily, so auth problems surface on the
    /// first request as [`InferenceError::Service`].
    pub async fn new(region: Option<&str>, settings: ModelSettings) -> Self {
        let region_provider =
            RegionProviderChain::first_try(region.map(|r| Region::new(r.to_string())))
                .or_default_provider()
                .or_else(Region::new(DEFAULT_REGION));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;
        debug!(
            region = ?config.region(),
            model_id = %settings.model_id,
            "loaded AWS config"
        );

        Self {
            client: Client::new(&config),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn inference_config(&self) -> InferenceConfiguration {
        InferenceConfiguration::builder()
            .max_tokens(i32::try_from(self.settings.max_tokens).unwrap_or(i32::MAX))
            .temperature(self.settings.temperature)
            .set_top_p(self.settings.top_p)
            .build()
    }

    fn to_sdk_message(&self, message: &ChatMessage) -> Result<Message, InferenceError> {
        let role = match message.role {
            Role::User => ConversationRole::User,
            Role::Assistant => ConversationRole::Assistant,
        };
        Message::builder()
            .role(role)
            .content(ContentBlock::Text(message.content.clone()))
            .build()
            .map_err(|e| InferenceError::Request {
                model_id: self.settings.model_id.clone(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ModelClient for BedrockClient {
    fn model_id(&self) -> &str {
        &self.settings.model_id
    }

    async fn converse(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<ModelResponse, InferenceError> {
        let model_id = self.settings.model_id.as_str();
        let start = Instant::now();

        let mut request = self
            .client
            .converse()
            .model_id(model_id)
            .inference_config(self.inference_config());
        if let Some(system) = system {
            request = request.system(SystemContentBlock::Text(system.to_string()));
        }
        for message in messages {
            request = request.messages(self.to_sdk_message(message)?);
        }

        info!(model_id, turns = messages.len(), "invoking Bedrock model");
        let response = request
            .send()
            .await
            .map_err(|e| InferenceError::Service {
                model_id: model_id.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let text = response
            .output()
            .and_then(|output| output.as_message().ok())
            .map(|message| {
                message
                    .content()
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text(text) => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| InferenceError::EmptyResponse {
                model_id: model_id.to_string(),
            })?;

        let usage = response.usage().map(|usage| Usage {
            input_tokens: usage.input_tokens().max(0) as u32,
            output_tokens: usage.output_tokens().max(0) as u32,
        });
        let truncated = matches!(response.stop_reason(), StopReason::MaxTokens);
        if truncated {
            warn!(
                model_id,
                max_tokens = self.settings.max_tokens,
                "model stopped at the token limit; reply may be cut off"
            );
        }

        info!(
            model_id,
            latency_ms = start.elapsed().as_millis() as u64,
            input_tokens = usage.map(|u| u.input_tokens),
            output_tokens = usage.map(|u| u.output_tokens),
            chars = text.len(),
            "Bedrock reply received"
        );

        Ok(ModelResponse {
            text,
            usage,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<(Option<String>, Vec<ChatMessage>)>>,
    }

    #[async_trait]
    impl ModelClient for Recorder {
        fn model_id(&self) -> &str {
            "recorder"
        }

        async fn converse(
            &self,
            system: Option<&str>,
            messages: &[ChatMessage],
        ) -> Result<ModelResponse, InferenceError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.map(str::to_string), messages.to_vec()));
            Ok(ModelResponse::from_text("{}"))
        }
    }

    #[tokio::test]
    async fn test_complete_sends_single_user_turn() {
        let client = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        client.complete("extract this").await.unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, None);
        assert_eq!(seen[0].1, vec![ChatMessage::user("extract this")]);
    }

    #[test]
    fn test_default_settings() {
        let settings = ModelSettings::default();
        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(settings.temperature.abs() < f32::EPSILON);
        assert_eq!(settings.top_p, None);
    }

    #[test]
    fn test_conversational_settings_keep_model() {
        let settings = ModelSettings::conversational();
        assert_eq!(settings.model_id, DEFAULT_MODEL_ID);
        assert_eq!(settings.max_tokens, 2000);
        assert_eq!(settings.top_p, Some(0.95));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
