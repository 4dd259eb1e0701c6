//! Channel message posting over the platform REST API.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use crate::config::PlatformSettings;
use crate::infrastructure::metrics;

/// Posts a single text message into a channel.
///
/// Returns `true` only when the platform acknowledges with a 2xx status.
/// Transport failures and rejections are both reported as `false`; there
/// are no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, token: &str, channel_id: &str, content: &str) -> bool;
}

#[derive(Debug, Serialize)]
struct CreateMessageBody<'a> {
    content: &'a str,
}

/// `MessageSender` backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpMessageSender {
    client: reqwest::Client,
    api_base: String,
}

impl HttpMessageSender {
    pub fn new(settings: &PlatformSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

#[async_trait]
impl MessageSender for HttpMessageSender {
    async fn send_message(&self, token: &str, channel_id: &str, content: &str) -> bool {
        let result = self
            .client
            .post(self.messages_url(channel_id))
            // The platform expects the raw token, without a scheme prefix.
            .header(AUTHORIZATION, token)
            .json(&CreateMessageBody { content })
            .send()
            .await;

        let success = match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    channel_id = %channel_id,
                    status = %response.status(),
                    "Message rejected by platform"
                );
                false
            }
            Err(e) => {
                tracing::warn!(channel_id = %channel_id, error = %e, "Message send failed");
                false
            }
        };

        metrics::record_message_sent(success);
        success
    }
}
