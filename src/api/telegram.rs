//! Telegram Bot API 通知通道。

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use zeroize::Zeroizing;

use crate::notify::{NotificationSink, NotifyError};

use super::summarize_error_body;

pub struct TelegramSink {
    api_base: String,
    bot_token: Zeroizing<String>,
    chat_id: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TelegramSink {
    pub fn new(
        client: reqwest::Client,
        api_base: String,
        bot_token: String,
        chat_id: String,
        timeout: Duration,
    ) -> Self {
        Self {
            api_base,
            bot_token: Zeroizing::new(bot_token),
            chat_id,
            client,
            timeout,
        }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token.as_str()
        )
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        // 错误信息里的 URL 含 bot token，只保留状态与类别。
        let response = self
            .client
            .post(self.send_message_url())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    NotifyError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    NotifyError::Transport(err.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: summarize_error_body(&text),
            });
        }
        Ok(())
    }
}
