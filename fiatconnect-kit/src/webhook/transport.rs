use bon::Builder;
use url::Url;

use super::body::{WebhookEvent, WebhookEventType};

/// A webhook endpoint.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    /// Stable name of the subscriber, used in logs and dead letters.
    #[builder(into)]
    pub id: String,
    pub url: Url,
    /// Event types the subscriber wants. `None` subscribes to everything.
    pub event_types: Option<Vec<WebhookEventType>>,
}

impl Subscriber {
    pub fn accepts(&self, event_type: WebhookEventType) -> bool {
        self.event_types
            .as_ref()
            .is_none_or(|types| types.contains(&event_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The attempt may succeed later: connection errors, timeouts, 5xx answers.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The subscriber refused the event. Retrying will not help.
    #[error("Subscriber rejected event with status {status}: {reason}")]
    Rejected { status: u16, reason: String },
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// Delivers one webhook event to one subscriber.
pub trait WebhookTransport: Send + Sync + 'static {
    fn deliver(
        &self,
        subscriber: &Subscriber,
        event: &WebhookEvent,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_filters_event_types() {
        let url: Url = "https://wallet.example/webhooks".parse().unwrap();
        let all = Subscriber::builder().id("all").url(url.clone()).build();
        let kyc_only = Subscriber::builder()
            .id("kyc")
            .url(url)
            .event_types(vec![WebhookEventType::KycStatusEvent])
            .build();

        assert!(all.accepts(WebhookEventType::TransferOutStatusEvent));
        assert!(kyc_only.accepts(WebhookEventType::KycStatusEvent));
        assert!(!kyc_only.accepts(WebhookEventType::TransferInStatusEvent));
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(TransportError::Transient("timeout".to_string()).is_retryable());
        assert!(
            !TransportError::Rejected {
                status: 400,
                reason: "bad body".to_string()
            }
            .is_retryable()
        );
    }
}
