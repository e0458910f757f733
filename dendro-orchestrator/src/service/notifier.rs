//! Job event publishing
//!
//! Publishing is fire-and-forget: callers never wait on delivery and a
//! failed delivery never fails the request that produced the event.

use std::sync::Arc;

use dendro_core::event::JobEvent;
use serde::Serialize;

pub trait Notifier: Send + Sync {
    /// Must return without blocking
    fn publish(&self, channel: &str, event: JobEvent);
}

/// Writes events to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, channel: &str, event: JobEvent) {
        tracing::info!(channel = %channel, event = ?event, "Job event");
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    channel: &'a str,
    message: &'a JobEvent,
}

/// POSTs `{channel, message}` to a pub/sub relay
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn publish(&self, channel: &str, event: JobEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(channel = %channel, "No async runtime, dropping job event");
            return;
        };

        let client = self.client.clone();
        let url = self.url.clone();
        let channel = channel.to_string();
        handle.spawn(async move {
            let body = WebhookMessage {
                channel: &channel,
                message: &event,
            };
            match client.post(&url).json(&body).send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(
                        channel = %channel,
                        status = %response.status(),
                        "Pub/sub relay rejected event"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(channel = %channel, error = %e, "Failed to deliver job event");
                }
            }
        });
    }
}

/// Delivers every event to each inner notifier
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn Notifier>>) -> Self {
        Self { targets }
    }
}

impl Notifier for FanoutNotifier {
    fn publish(&self, channel: &str, event: JobEvent) {
        for target in &self.targets {
            target.publish(channel, event.clone());
        }
    }
}

/// Publish on the event's own service channel
pub fn publish(notifier: &dyn Notifier, event: JobEvent) {
    let channel = event.service_name().to_string();
    notifier.publish(&channel, event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(String, JobEvent)>>);

    impl Notifier for Recording {
        fn publish(&self, channel: &str, event: JobEvent) {
            self.0.lock().unwrap().push((channel.to_string(), event));
        }
    }

    #[test]
    fn test_fanout_reaches_every_target() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let fanout = FanoutNotifier::new(vec![a.clone() as Arc<dyn Notifier>, b.clone()]);

        publish(
            &fanout,
            JobEvent::PingComputeClients {
                service_name: "svc".to_string(),
            },
        );

        for target in [a, b] {
            let events = target.0.lock().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].0, "svc");
        }
    }

    #[test]
    fn test_webhook_without_runtime_does_not_panic() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/events");
        notifier.publish(
            "svc",
            JobEvent::PingComputeClients {
                service_name: "svc".to_string(),
            },
        );
    }
}
