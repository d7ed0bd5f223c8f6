//! The best-effort notification sink.
//!
//! Fire-and-forget HTTP POST with a title header and a text body to a
//! fixed topic URL. Failures are logged and swallowed here, explicitly:
//! notifications never gate pipeline progress, so [`Notifier::post`]
//! does not return a result at all.

use std::time::Duration;

use tracing::{debug, warn};

use gale_config::NotifyConfig;

/// Pipeline events worth telling a human about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NewRunDetected,
    DataArrived,
    DeliveryComplete,
    DeliveryFailed,
}

impl EventKind {
    /// The notification title for this event.
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::NewRunDetected => "New run detected",
            EventKind::DataArrived => "Data arrived",
            EventKind::DeliveryComplete => "Delivery complete",
            EventKind::DeliveryFailed => "Delivery failed",
        }
    }
}

/// Posts best-effort notifications to the configured topic.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: Option<reqwest::Client>,
    topic_url: String,
}

impl Notifier {
    /// Build a notifier. A disabled config (or an unconstructible HTTP
    /// client) yields an inert notifier rather than an error — the sink
    /// must never be the reason the pipeline cannot start.
    pub fn new(config: &NotifyConfig, request_timeout: Duration) -> Self {
        let http = if config.enabled {
            match reqwest::Client::builder().timeout(request_timeout).build() {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "notification client unavailable; notifications disabled");
                    None
                }
            }
        } else {
            None
        };
        Self {
            http,
            topic_url: config.topic_url.clone(),
        }
    }

    /// An inert notifier that posts nothing.
    pub fn disabled() -> Self {
        Self {
            http: None,
            topic_url: String::new(),
        }
    }

    /// Post one event. Errors are logged, never returned.
    pub async fn post(&self, event: EventKind, body: &str) {
        let Some(http) = &self.http else {
            return;
        };

        let result = http
            .post(&self.topic_url)
            .header("Title", event.title())
            .body(body.to_string())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(event = event.title(), "notification posted");
            }
            Ok(response) => {
                warn!(event = event.title(), status = %response.status(), "notification rejected");
            }
            Err(e) => {
                warn!(event = event.title(), error = %e, "notification failed");
            }
        }
    }
}
