use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{collections::BTreeMap, time::Duration};
use tracing::{info, warn};
use url::Url;

use aquapanel_alert_core::RuleSpec;
use aquapanel_schema::PerformanceSnapshot;

use crate::error::{IsRetryable, PanelError};

/// Where a firing is delivered. Stored on the rule as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationChannel {
    Console,
    Webhook {
        url: Url,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
}

impl NotificationChannel {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationChannel::Console => "console",
            NotificationChannel::Webhook { .. } => "webhook",
        }
    }
}

/// Parses the stored channel list; an empty or unreadable column means console only.
pub fn parse_channels(raw: &str) -> Vec<NotificationChannel> {
    match serde_json::from_str::<Vec<NotificationChannel>>(raw) {
        Ok(channels) if !channels.is_empty() => channels,
        Ok(_) => vec![NotificationChannel::Console],
        Err(e) => {
            warn!(error = %e, raw, "unreadable notification channels, using console");
            vec![NotificationChannel::Console]
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
}

pub struct Notification<'a> {
    pub rule: &'a RuleSpec,
    pub value: f64,
    pub message: &'a str,
    pub snapshot: &'a PerformanceSnapshot,
}

impl Notification<'_> {
    fn webhook_payload(&self) -> Value {
        json!({
            "alert": {
                "rule": self.rule.name,
                "metric": self.rule.metric,
                "value": self.value,
                "threshold": self.rule.threshold,
                "severity": self.rule.severity,
                "message": self.message,
                "timestamp": self.snapshot.timestamp,
            },
            "system": {
                "cpu": self.snapshot.cpu.usage,
                "memory": self.snapshot.memory.usage,
                "processes": self.snapshot.processes.all,
            }
        })
    }
}

impl Notifier {
    pub fn new(timeout: Duration, retry_max_times: usize) -> Result<Self, PanelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aquapanel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(retry_max_times)
            .with_jitter();
        Ok(Self {
            client,
            retry_policy,
        })
    }

    /// Delivers to every channel. Failures are logged per channel and do not stop the others.
    pub async fn dispatch(&self, channels: &[NotificationChannel], notification: &Notification<'_>) {
        for channel in channels {
            let result = match channel {
                NotificationChannel::Console => {
                    info!(
                        rule = %notification.rule.name,
                        severity = %notification.rule.severity,
                        "[ALERT] {}",
                        notification.message
                    );
                    Ok(())
                }
                NotificationChannel::Webhook { url, headers } => {
                    self.post_webhook(url, headers, &notification.webhook_payload())
                        .await
                }
            };
            if let Err(e) = result {
                warn!(
                    channel = channel.kind(),
                    rule = %notification.rule.name,
                    error = %e,
                    "alert notification failed"
                );
            }
        }
    }

    async fn post_webhook(
        &self,
        url: &Url,
        headers: &BTreeMap<String, String>,
        payload: &Value,
    ) -> Result<(), PanelError> {
        let op = || async move {
            let mut req = self.client.post(url.clone()).json(payload);
            for (name, value) in headers {
                req = req.header(name.as_str(), value.as_str());
            }
            let resp = req.send().await?;
            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(PanelError::WebhookStatus(status))
            }
        };

        op.retry(self.retry_policy)
            .when(|err: &PanelError| err.is_retryable())
            .notify(|err, dur: Duration| {
                warn!(%url, "webhook retrying after error {} in {:?}", err, dur);
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_parse_with_console_fallback() {
        let channels = parse_channels(
            r#"[{"type":"console"},{"type":"webhook","url":"https://hooks.example.com/a"}]"#,
        );
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].kind(), "webhook");

        assert_eq!(parse_channels("[]"), vec![NotificationChannel::Console]);
        assert_eq!(parse_channels("nonsense"), vec![NotificationChannel::Console]);
    }

    #[test]
    fn email_channels_are_rejected() {
        assert!(serde_json::from_str::<NotificationChannel>(r#"{"type":"email"}"#).is_err());
    }
}
