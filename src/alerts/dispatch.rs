//! Alert dispatcher
//!
//! Fans one alert out across the requested channels sequentially, with
//! per-channel isolation: a sink failure is logged and reported as `false`
//! for that channel and never blocks the remaining channels. Channels that
//! are requested but have no configured sink are skipped and omitted from
//! the result map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use super::format::AlertMessage;
use super::recipients::RecipientConfig;
use super::sinks::{ChannelSink, EmailSink, SlackSink, WhatsAppSink};

/// One messaging medium for non-compliance alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Email,
    Whatsapp,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Slack => "slack",
            Channel::Email => "email",
            Channel::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slack" => Ok(Channel::Slack),
            "email" => Ok(Channel::Email),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn ChannelSink>>,
    recipients: RecipientConfig,
}

impl AlertDispatcher {
    pub fn new(sinks: Vec<Arc<dyn ChannelSink>>, recipients: RecipientConfig) -> Self {
        Self { sinks, recipients }
    }

    /// Build a dispatcher with one sink per configured integration. Missing
    /// credentials simply leave the channel out.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        let mut sinks: Vec<Arc<dyn ChannelSink>> = Vec::new();

        if let Some(sink) = SlackSink::from_config(http.clone(), &config.slack) {
            sinks.push(Arc::new(sink));
        }
        if let Some(sink) = EmailSink::from_config(http.clone(), &config.email) {
            sinks.push(Arc::new(sink));
        }
        if let Some(sink) = WhatsAppSink::from_config(http, &config.whatsapp) {
            sinks.push(Arc::new(sink));
        }

        Ok(Self::new(sinks, config.recipients.clone()))
    }

    pub fn configured_channels(&self) -> Vec<Channel> {
        self.sinks.iter().map(|s| s.channel()).collect()
    }

    fn sink(&self, channel: Channel) -> Option<&dyn ChannelSink> {
        self.sinks
            .iter()
            .find(|s| s.channel() == channel)
            .map(|s| s.as_ref())
    }

    fn recipients_for(&self, channel: Channel, department: Option<&str>) -> Vec<String> {
        match channel {
            // Slack posts to a fixed channel id, not per-recipient addresses
            Channel::Slack => Vec::new(),
            Channel::Email => self.recipients.email_recipients(department),
            Channel::Whatsapp => self.recipients.whatsapp_recipients(department),
        }
    }

    /// Fan a rendered message out across the requested channels. Duplicate
    /// channel requests are collapsed before sending.
    pub async fn dispatch_message(
        &self,
        message: &AlertMessage,
        department: Option<&str>,
        channels: &[Channel],
    ) -> BTreeMap<Channel, bool> {
        let requested: BTreeSet<Channel> = channels.iter().copied().collect();
        let mut outcomes = BTreeMap::new();

        for channel in requested {
            let Some(sink) = self.sink(channel) else {
                tracing::warn!("{} not configured, skipping alert", channel);
                continue;
            };

            let recipients = self.recipients_for(channel, department);
            match sink.send(message, &recipients).await {
                Ok(()) => {
                    outcomes.insert(channel, true);
                }
                Err(e) => {
                    tracing::error!("Error sending {} alert: {}", channel, e);
                    outcomes.insert(channel, false);
                }
            }
        }

        outcomes
    }

    /// Channel names that actually delivered, in stable order
    pub fn succeeded(outcomes: &BTreeMap<Channel, bool>) -> Vec<Channel> {
        outcomes
            .iter()
            .filter(|(_, delivered)| **delivered)
            .map(|(channel, _)| *channel)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::format;
    use crate::alerts::sinks::SinkError;
    use crate::models::ComplianceRecord;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Render then fan out, the way the handlers drive the dispatcher
    async fn dispatch(
        dispatcher: &AlertDispatcher,
        record: &ComplianceRecord,
        channels: &[Channel],
    ) -> BTreeMap<Channel, bool> {
        let message = format::render(record);
        dispatcher
            .dispatch_message(&message, record.department.as_deref(), channels)
            .await
    }

    struct MockSink {
        channel: Channel,
        succeed: bool,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl MockSink {
        fn new(channel: Channel, succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                channel,
                succeed,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChannelSink for MockSink {
        fn channel(&self) -> Channel {
            self.channel
        }

        async fn send(
            &self,
            _message: &AlertMessage,
            recipients: &[String],
        ) -> Result<(), SinkError> {
            self.calls.lock().unwrap().push(recipients.to_vec());
            if self.succeed {
                Ok(())
            } else {
                Err(SinkError::Rejected("mock failure".to_string()))
            }
        }
    }

    fn recipients() -> RecipientConfig {
        RecipientConfig {
            email_defaults: vec!["safety@yourcompany.com".to_string()],
            email_by_department: HashMap::from([(
                "production".to_string(),
                vec!["production-manager@yourcompany.com".to_string()],
            )]),
            whatsapp_defaults: vec!["+1234567890".to_string()],
            whatsapp_by_department: HashMap::new(),
        }
    }

    fn record(department: Option<&str>) -> ComplianceRecord {
        ComplianceRecord {
            id: Uuid::nil(),
            worker_id: "W-007".to_string(),
            worker_name: "Sam Okafor".to_string(),
            recorded_at: Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
            helmet_detected: false,
            mask_detected: false,
            gloves_detected: false,
            jacket_detected: false,
            helmet_confidence: 0.0,
            mask_confidence: 0.0,
            gloves_confidence: 0.0,
            jacket_confidence: 0.0,
            is_compliant: false,
            compliance_score: 0.0,
            detector_degraded: false,
            location: None,
            department: department.map(str::to_string),
            shift: None,
            alert_sent: false,
            alert_channels: None,
            raw_detections: None,
        }
    }

    const ALL: [Channel; 3] = [Channel::Slack, Channel::Email, Channel::Whatsapp];

    #[tokio::test]
    async fn test_unconfigured_channels_are_omitted() {
        let email = MockSink::new(Channel::Email, true);
        let dispatcher =
            AlertDispatcher::new(vec![email.clone() as Arc<dyn ChannelSink>], recipients());

        let outcomes = dispatch(&dispatcher, &record(None), &ALL).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes.get(&Channel::Email), Some(&true));
        assert!(!outcomes.contains_key(&Channel::Slack));
        assert!(!outcomes.contains_key(&Channel::Whatsapp));
        assert_eq!(email.call_count(), 1);
    }

    #[tokio::test]
    async fn test_channel_failures_are_isolated() {
        let slack = MockSink::new(Channel::Slack, false);
        let email = MockSink::new(Channel::Email, true);
        let whatsapp = MockSink::new(Channel::Whatsapp, true);
        let dispatcher = AlertDispatcher::new(
            vec![
                slack.clone() as Arc<dyn ChannelSink>,
                email.clone(),
                whatsapp.clone(),
            ],
            recipients(),
        );

        let outcomes = dispatch(&dispatcher, &record(None), &ALL).await;

        assert_eq!(outcomes.get(&Channel::Slack), Some(&false));
        assert_eq!(outcomes.get(&Channel::Email), Some(&true));
        assert_eq!(outcomes.get(&Channel::Whatsapp), Some(&true));
        // Every sink was still attempted despite the Slack failure
        assert_eq!(slack.call_count(), 1);
        assert_eq!(email.call_count(), 1);
        assert_eq!(whatsapp.call_count(), 1);

        assert_eq!(
            AlertDispatcher::succeeded(&outcomes),
            vec![Channel::Email, Channel::Whatsapp]
        );
    }

    #[tokio::test]
    async fn test_duplicate_requests_are_collapsed() {
        let email = MockSink::new(Channel::Email, true);
        let dispatcher =
            AlertDispatcher::new(vec![email.clone() as Arc<dyn ChannelSink>], recipients());

        let outcomes = dispatch(&dispatcher, &record(None), &[Channel::Email, Channel::Email]).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(email.call_count(), 1);
    }

    #[tokio::test]
    async fn test_recipients_routed_per_channel() {
        let slack = MockSink::new(Channel::Slack, true);
        let email = MockSink::new(Channel::Email, true);
        let whatsapp = MockSink::new(Channel::Whatsapp, true);
        let dispatcher = AlertDispatcher::new(
            vec![
                slack.clone() as Arc<dyn ChannelSink>,
                email.clone(),
                whatsapp.clone(),
            ],
            recipients(),
        );

        dispatch(&dispatcher, &record(Some("Production")), &ALL).await;

        assert_eq!(
            email.calls.lock().unwrap()[0],
            vec!["safety@yourcompany.com", "production-manager@yourcompany.com"]
        );
        assert_eq!(whatsapp.calls.lock().unwrap()[0], vec!["+1234567890"]);
        assert!(slack.calls.lock().unwrap()[0].is_empty());
    }

    #[test]
    fn test_from_config_without_credentials_builds_no_sinks() {
        use crate::config::{DetectorConfig, EmailConfig, SlackConfig, WhatsAppConfig};

        let config = Config {
            database_url: "postgres://localhost/ppe".to_string(),
            port: 8000,
            detector: DetectorConfig {
                api_key: None,
                project_id: None,
                model_version: "1".to_string(),
            },
            slack: SlackConfig {
                bot_token: None,
                channel_id: None,
            },
            email: EmailConfig {
                api_key: None,
                from_email: "safety@yourcompany.com".to_string(),
            },
            whatsapp: WhatsAppConfig {
                account_sid: None,
                auth_token: None,
                from_number: "whatsapp:+14155238886".to_string(),
            },
            recipients: RecipientConfig::default(),
            alert_channels: vec![Channel::Slack, Channel::Email, Channel::Whatsapp],
            environment: "development".to_string(),
        };

        let dispatcher = AlertDispatcher::from_config(&config).unwrap();
        assert!(dispatcher.configured_channels().is_empty());
    }

    #[test]
    fn test_channel_parsing() {
        assert_eq!("slack".parse::<Channel>().unwrap(), Channel::Slack);
        assert_eq!("WhatsApp".parse::<Channel>().unwrap(), Channel::Whatsapp);
        assert!("pager".parse::<Channel>().is_err());
        assert_eq!(Channel::Email.to_string(), "email");
    }
}
