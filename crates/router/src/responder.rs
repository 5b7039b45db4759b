//! The general responder: last stop of the routing chain. One bounded
//! text-completion attempt with the rolling history window, a static canned
//! reply on any failure.

use tracing::warn;

use {
    festa_assist::{AssistClient, HistoryBuffer, prompt},
    festa_config::FestaConfig,
    festa_orders::classify,
};

use crate::content::labels;

pub struct Responder {
    client: Option<AssistClient>,
    history: HistoryBuffer,
    config: FestaConfig,
    /// Idle gap after which the next reply greets the client again.
    greet_after: std::time::Duration,
}

impl Responder {
    pub fn new(config: &FestaConfig) -> Self {
        let assist = &config.assist;
        Self {
            client: AssistClient::from_config(assist),
            history: HistoryBuffer::new(
                assist.history_len,
                std::time::Duration::from_secs(assist.history_ttl_secs),
            ),
            config: config.clone(),
            greet_after: std::time::Duration::from_secs(assist.history_ttl_secs),
        }
    }

    pub fn fallback_reply(&self) -> String {
        format!(
            "Thanks for your message! For a detailed consultation pick \
             “{}” from the menu.",
            labels::MANAGER
        )
    }

    /// Produce a reply for a free-text message nothing else claimed.
    pub async fn respond(&self, client_id: i64, text: &str) -> String {
        let greet = classify::is_greeting(text)
            || self
                .history
                .idle_for(client_id)
                .is_none_or(|idle| idle > self.greet_after);

        let window = self.history.window(client_id);
        self.history.push(client_id, "user", text);

        let Some(assist) = &self.client else {
            return self.fallback_reply();
        };

        let system = prompt::system_prompt(&self.config.storefront, greet);
        match assist.complete(&system, &window, text).await {
            Ok(reply) => {
                self.history.push(client_id, "assistant", reply.clone());
                reply
            },
            Err(e) => {
                warn!(client_id, error = %e, "completion failed, using fallback");
                self.fallback_reply()
            },
        }
    }

    pub fn forget(&self, client_id: i64) {
        self.history.clear(client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_assist_configured_means_fallback() {
        let responder = Responder::new(&FestaConfig::default());
        let reply = responder.respond(1, "what about weddings?").await;
        assert!(reply.contains(labels::MANAGER));
    }

    #[tokio::test]
    async fn unreachable_assist_falls_back_after_one_attempt() {
        let mut config = FestaConfig::default();
        config.assist.api_key = Some("sk-test".into());
        config.assist.base_url = "http://127.0.0.1:9".into();
        config.assist.timeout_secs = 1;

        let responder = Responder::new(&config);
        let reply = responder.respond(1, "hello").await;
        assert!(reply.contains(labels::MANAGER));
    }
}
