//! Feishu custom bot transport

use crate::core::config::FeishuConfig;
use crate::notify::{build_card, Notification, Notifier, NotifyError};
use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Posts interactive cards to a Feishu bot webhook
#[derive(Debug, Clone)]
pub struct FeishuNotifier {
    client: reqwest::Client,
    webhook_url: String,
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeishuResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

impl FeishuNotifier {
    /// Create a notifier with a fixed request timeout
    pub fn new(
        webhook_url: impl Into<String>,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            secret: secret.filter(|s| !s.is_empty()),
        })
    }

    pub fn from_config(config: &FeishuConfig) -> Result<Self, NotifyError> {
        Self::new(
            config.webhook_url.clone(),
            config.webhook_secret.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    /// Request body for a card, signed when a secret is configured
    fn payload(&self, card: Value, timestamp: i64) -> Result<Value, NotifyError> {
        let payload = match &self.secret {
            Some(secret) => {
                let signature = sign(timestamp, secret)?;
                json!({
                    "timestamp": timestamp,
                    "sign": signature,
                    "msg_type": "interactive",
                    "card": card,
                })
            }
            None => json!({
                "msg_type": "interactive",
                "card": card,
            }),
        };
        Ok(payload)
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = self.payload(build_card(notification), chrono::Utc::now().timestamp())?;
        let clock = Instant::now();

        info!("Sending {} notification for {}", notification.status, notification.commit_id);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        check_response(status, &body)?;

        debug!("Feishu response: {}", body);
        info!("Notification sent (duration: {:?})", clock.elapsed());
        Ok(())
    }
}

/// `base64(HMAC-SHA256(key = "<timestamp>\n<secret>", msg = ""))`
pub fn sign(timestamp: i64, secret: &str) -> Result<String, NotifyError> {
    let string_to_sign = format!("{}\n{}", timestamp, secret);
    let mac = <Hmac<Sha256> as Mac>::new_from_slice(string_to_sign.as_bytes())
        .map_err(|e| NotifyError::Sign(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Map the bot's HTTP status and body to a delivery result
pub fn check_response(status: u16, body: &str) -> Result<(), NotifyError> {
    if !(200..300).contains(&status) {
        return Err(NotifyError::Status {
            status,
            body: body.to_string(),
        });
    }

    match serde_json::from_str::<FeishuResponse>(body) {
        Ok(parsed) if parsed.code == 0 || parsed.code == -1 => Ok(()),
        Ok(parsed) => Err(NotifyError::Rejected {
            code: parsed.code,
            msg: parsed.msg,
            body: body.to_string(),
        }),
        Err(_) if body.is_empty() => Ok(()),
        Err(_) => Err(NotifyError::UnexpectedResponse(body.to_string())),
    }
}
