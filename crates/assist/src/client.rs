//! Minimal OpenAI-compatible chat-completion client.
//!
//! Exactly one attempt per call, bounded by the configured timeout; every
//! failure surfaces as an error for the caller to replace with the static
//! fallback reply.

use std::time::Duration;

use {
    anyhow::{Context, Result, bail},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use festa_config::schema::AssistConfig;

use crate::history::HistoryEntry;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct AssistClient {
    http: reqwest::Client,
    config: AssistConfig,
}

impl AssistClient {
    /// Returns `None` when no API key is configured; the responder then goes
    /// straight to the canned reply.
    pub fn from_config(config: &AssistConfig) -> Option<Self> {
        config.api_key.as_ref()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;
        Some(Self {
            http,
            config: config.clone(),
        })
    }

    /// One completion attempt: system prompt + rolling history + the current
    /// message.
    pub async fn complete(
        &self,
        system: &str,
        history: &[HistoryEntry],
        user: &str,
    ) -> Result<String> {
        let mut messages = vec![ChatMessage {
            role: "system",
            content: system,
        }];
        for entry in history {
            messages.push(ChatMessage {
                role: entry.role,
                content: &entry.text,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let key = self.config.api_key.as_deref().unwrap_or_default();

        debug!(model = %self.config.model, "requesting completion");
        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages,
            })
            .send()
            .await
            .context("completion request failed")?;

        if !response.status().is_success() {
            bail!("completion endpoint returned {}", response.status());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("completion response was not valid JSON")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .context("completion response contained no text")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_api_key_means_no_client() {
        let config = AssistConfig::default();
        assert!(config.api_key.is_none());
        assert!(AssistClient::from_config(&config).is_none());
    }

    #[test]
    fn configured_client_builds() {
        let config = AssistConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        assert!(AssistClient::from_config(&config).is_some());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_single_fast_error() {
        let config = AssistConfig {
            api_key: Some("sk-test".into()),
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..Default::default()
        };
        let client = AssistClient::from_config(&config).unwrap();
        let result = client.complete("system", &[], "hello").await;
        assert!(result.is_err());
    }
}
