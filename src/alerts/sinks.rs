//! Channel sinks
//!
//! One sink per messaging provider. A sink is only constructed when its
//! credentials are present; the dispatcher treats an absent sink as a normal
//! operating condition, not a failure.

use async_trait::async_trait;
use serde_json::json;

use crate::config::{EmailConfig, SlackConfig, WhatsAppConfig};
use super::dispatch::Channel;
use super::format::AlertMessage;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected message: {0}")]
    Rejected(String),

    #[error("no recipients resolved")]
    NoRecipients,
}

#[async_trait]
pub trait ChannelSink: Send + Sync {
    fn channel(&self) -> Channel;

    /// Deliver one alert. `recipients` is the resolved destination list for
    /// this channel; sinks that post to a fixed destination ignore it.
    async fn send(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), SinkError>;
}

/// Slack `chat.postMessage` sink
pub struct SlackSink {
    http: reqwest::Client,
    bot_token: String,
    channel_id: String,
}

impl SlackSink {
    pub fn from_config(http: reqwest::Client, config: &SlackConfig) -> Option<Self> {
        match (&config.bot_token, &config.channel_id) {
            (Some(bot_token), Some(channel_id)) => Some(Self {
                http,
                bot_token: bot_token.clone(),
                channel_id: channel_id.clone(),
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl ChannelSink for SlackSink {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    async fn send(&self, message: &AlertMessage, _recipients: &[String]) -> Result<(), SinkError> {
        let body: serde_json::Value = self
            .http
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.bot_token)
            .json(&json!({
                "channel": self.channel_id,
                "text": message.summary,
                "blocks": message.slack_blocks,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body["ok"].as_bool().unwrap_or(false) {
            tracing::info!(
                "Slack alert sent successfully: {}",
                body["ts"].as_str().unwrap_or("")
            );
            Ok(())
        } else {
            Err(SinkError::Rejected(
                body["error"].as_str().unwrap_or("unknown error").to_string(),
            ))
        }
    }
}

/// SendGrid email sink
pub struct EmailSink {
    http: reqwest::Client,
    api_key: String,
    from_email: String,
}

impl EmailSink {
    pub fn from_config(http: reqwest::Client, config: &EmailConfig) -> Option<Self> {
        config.api_key.as_ref().map(|api_key| Self {
            http,
            api_key: api_key.clone(),
            from_email: config.from_email.clone(),
        })
    }
}

#[async_trait]
impl ChannelSink for EmailSink {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), SinkError> {
        if recipients.is_empty() {
            return Err(SinkError::NoRecipients);
        }

        let to: Vec<serde_json::Value> = recipients
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();

        let response = self
            .http
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "personalizations": [{ "to": to }],
                "from": { "email": self.from_email },
                "subject": message.email_subject,
                "content": [
                    { "type": "text/plain", "value": message.email_text },
                    { "type": "text/html", "value": message.email_html },
                ],
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Email alert sent successfully: {}", status.as_u16());
            Ok(())
        } else {
            Err(SinkError::Rejected(format!("SendGrid returned {}", status)))
        }
    }
}

/// Twilio WhatsApp sink. Fans out per recipient internally; the send counts
/// as successful when at least one recipient delivery went through.
pub struct WhatsAppSink {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

impl WhatsAppSink {
    pub fn from_config(http: reqwest::Client, config: &WhatsAppConfig) -> Option<Self> {
        match (&config.account_sid, &config.auth_token) {
            (Some(account_sid), Some(auth_token)) => Some(Self {
                http,
                account_sid: account_sid.clone(),
                auth_token: auth_token.clone(),
                from_number: config.from_number.clone(),
                api_base: "https://api.twilio.com".to_string(),
            }),
            _ => None,
        }
    }

    fn whatsapp_address(number: &str) -> String {
        if number.starts_with("whatsapp:") {
            number.to_string()
        } else {
            format!("whatsapp:{}", number)
        }
    }
}

#[async_trait]
impl ChannelSink for WhatsAppSink {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn send(&self, message: &AlertMessage, recipients: &[String]) -> Result<(), SinkError> {
        if recipients.is_empty() {
            return Err(SinkError::NoRecipients);
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        );

        let mut delivered = 0usize;
        for recipient in recipients {
            let to = Self::whatsapp_address(recipient);

            let result = self
                .http
                .post(&url)
                .basic_auth(&self.account_sid, Some(&self.auth_token))
                .form(&[
                    ("To", to.as_str()),
                    ("From", self.from_number.as_str()),
                    ("Body", message.whatsapp_body.as_str()),
                ])
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("WhatsApp alert sent to {}", recipient);
                    delivered += 1;
                }
                Ok(response) => {
                    tracing::warn!(
                        "WhatsApp delivery to {} rejected: {}",
                        recipient,
                        response.status()
                    );
                }
                Err(e) => {
                    tracing::warn!("WhatsApp delivery to {} failed: {}", recipient, e);
                }
            }
        }

        if delivered > 0 {
            Ok(())
        } else {
            Err(SinkError::Rejected(
                "all recipient deliveries failed".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Form, http::StatusCode, routing::post, Router};
    use std::collections::HashMap;

    fn message() -> AlertMessage {
        AlertMessage {
            summary: "PPE Non-Compliance Alert".to_string(),
            slack_blocks: json!([]),
            email_subject: "PPE Compliance Alert".to_string(),
            email_html: "<p>alert</p>".to_string(),
            email_text: "alert".to_string(),
            whatsapp_body: "alert".to_string(),
        }
    }

    /// Twilio stand-in: numbers with the +1555 prefix deliver, the rest are
    /// rejected
    fn twilio_stub() -> Router {
        Router::new().route(
            "/2010-04-01/Accounts/:sid/Messages.json",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                let to = form.get("To").map(String::as_str).unwrap_or("");
                if to.starts_with("whatsapp:+1555") {
                    StatusCode::CREATED
                } else {
                    StatusCode::BAD_REQUEST
                }
            }),
        )
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn whatsapp_sink(api_base: String) -> WhatsAppSink {
        WhatsAppSink {
            http: reqwest::Client::new(),
            account_sid: "AC0000".to_string(),
            auth_token: "token".to_string(),
            from_number: "whatsapp:+14155238886".to_string(),
            api_base,
        }
    }

    #[tokio::test]
    async fn test_whatsapp_one_delivery_of_many_counts_as_sent() {
        let sink = whatsapp_sink(spawn(twilio_stub()).await);

        let result = sink
            .send(
                &message(),
                &["+19990001111".to_string(), "+15550001111".to_string()],
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_whatsapp_all_failed_deliveries_is_an_error() {
        let sink = whatsapp_sink(spawn(twilio_stub()).await);

        let result = sink
            .send(
                &message(),
                &["+19990001111".to_string(), "+19990002222".to_string()],
            )
            .await;

        assert!(matches!(result, Err(SinkError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_whatsapp_empty_recipient_list_is_an_error() {
        let sink = whatsapp_sink("http://127.0.0.1:9".to_string());

        let result = sink.send(&message(), &[]).await;
        assert!(matches!(result, Err(SinkError::NoRecipients)));
    }

    #[test]
    fn test_whatsapp_address_prefix_is_idempotent() {
        assert_eq!(WhatsAppSink::whatsapp_address("+1234"), "whatsapp:+1234");
        assert_eq!(
            WhatsAppSink::whatsapp_address("whatsapp:+1234"),
            "whatsapp:+1234"
        );
    }
}
