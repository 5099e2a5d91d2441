//! Telegram Bot API notification channel.

use alerting::AlertEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ChannelError;
use crate::format::MessageFormatter;
use crate::NotifyChannel;

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Chat, group or channel id to post into
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Bot API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_api_base(),
        }
    }
}

/// `sendMessage` request body
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts alerts to a Telegram chat.
pub struct TelegramChannel {
    config: TelegramConfig,
    formatter: MessageFormatter,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a Telegram channel.
    #[must_use]
    pub fn new(config: TelegramConfig, formatter: MessageFormatter) -> Self {
        if config.bot_token.is_some() && config.chat_id.is_some() {
            debug!("Telegram notifications enabled");
        } else {
            debug!("Telegram notifications disabled (bot token or chat id not set)");
        }

        Self {
            config,
            formatter,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, token: &str) -> String {
        format!(
            "{}/bot{token}/sendMessage",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn enabled(&self) -> bool {
        self.config.bot_token.is_some() && self.config.chat_id.is_some()
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        let token = self
            .config
            .bot_token
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("telegram bot_token".to_string()))?;
        let chat_id = self
            .config
            .chat_id
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("telegram chat_id".to_string()))?;

        let text = self.formatter.render(event);
        let body = SendMessage {
            chat_id,
            text: &text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.endpoint(token))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        // Telegram reports most failures in the body, so read it either way
        let parsed = response.json::<ApiResponse>().await;

        match parsed {
            Ok(api) if status.is_success() && api.ok => {
                debug!(chat_id, "Telegram message sent");
                Ok(())
            }
            Ok(api) => Err(ChannelError::Api {
                status: status.as_u16(),
                description: api.description.unwrap_or_else(|| "no description".to_string()),
            }),
            Err(e) if status.is_success() => Err(ChannelError::Http(e)),
            Err(_) => Err(ChannelError::Api {
                status: status.as_u16(),
                description: status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string(),
            }),
        }
    }
}
