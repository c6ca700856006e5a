use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::{AlertNotifier, Message};

/// Slack incoming-webhook transport (Block Kit payload, plain `text` fallback).
#[derive(Clone)]
pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self::with_url(Some(url))
    }

    pub fn with_url(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

/// Block Kit body for one message.
pub fn slack_payload(msg: &Message) -> Value {
    if let Some(text) = &msg.fallback_text {
        return json!({ "text": text });
    }

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": format!(":rotating_light: {}", msg.title) }
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*{}*", msg.summary) }
        }),
    ];
    if !msg.items.is_empty() {
        blocks.push(json!({ "type": "divider" }));
    }
    for it in &msg.items {
        let mut body = format!(
            "*{}* · @{} · score `{}`\n>{}",
            it.source, it.user, it.score, it.excerpt
        );
        if let Some(link) = &it.link {
            body.push_str(&format!("\n<{link}|View original>"));
        }
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": body }
        }));
    }

    json!({
        "text": format!("{}: {}", msg.title, msg.summary),
        "blocks": blocks,
    })
}

#[async_trait::async_trait]
impl AlertNotifier for SlackNotifier {
    async fn send(&self, msg: &Message) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("Slack disabled (no webhook configured)");
            return Ok(());
        };
        let payload = slack_payload(msg);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Slack webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Slack webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "retrying Slack webhook");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
