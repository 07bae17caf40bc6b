use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use super::{
    body::WebhookEvent,
    transport::{Subscriber, TransportError, WebhookTransport},
};

/// Posts webhook bodies as JSON over HTTP.
///
/// Answers in the 2xx range acknowledge the event. Connection failures, timeouts, `408`, `429`
/// and 5xx answers are transient; every other status is a rejection.
#[derive(Debug, Clone, Default)]
pub struct HttpWebhookTransport {
    pub client: reqwest::Client,
    pub headers: HeaderMap,
}

impl HttpWebhookTransport {
    pub fn new() -> Self {
        HttpWebhookTransport::default()
    }

    /// Use a preconfigured client, e.g. one with a request timeout.
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpWebhookTransport {
            client,
            headers: HeaderMap::new(),
        }
    }

    /// Add a header sent with every delivery, e.g. a signature or API key.
    pub fn header(mut self, key: &HeaderName, value: &HeaderValue) -> Self {
        self.headers.insert(key, value.to_owned());
        self
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

impl WebhookTransport for HttpWebhookTransport {
    async fn deliver(
        &self,
        subscriber: &Subscriber,
        event: &WebhookEvent,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(subscriber.url.clone())
            .headers(self.headers.clone())
            .json(event)
            .send()
            .await
            .map_err(|err| TransportError::Transient(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reason: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(256)
            .collect();

        if is_transient(status) {
            Err(TransportError::Transient(format!("status {status}: {reason}")))
        } else {
            Err(TransportError::Rejected {
                status: status.as_u16(),
                reason,
            })
        }
    }
}
