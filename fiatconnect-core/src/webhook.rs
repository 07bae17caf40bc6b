//! Request bodies sent by FiatConnect webhooks.
//!
//! Every webhook body shares the same envelope (`eventType`, `provider`, `eventId`,
//! `accountAddress`) and carries an event-specific `payload`. [`WebhookEvent`] is the
//! union of all bodies, discriminated by `eventType`.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    transport::TransferStatusResponse,
    types::{AccountAddress, AnyJson, EventId, KycSchema, KycStatus, ProviderId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    KycStatusEvent,
    TransferInStatusEvent,
    TransferOutStatusEvent,
}

impl Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WebhookEventType::KycStatusEvent => "KycStatusEvent",
            WebhookEventType::TransferInStatusEvent => "TransferInStatusEvent",
            WebhookEventType::TransferOutStatusEvent => "TransferOutStatusEvent",
        };
        write!(f, "{s}")
    }
}

/// A webhook request body carrying payload `P`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequestBody<P> {
    pub event_type: WebhookEventType,
    pub provider: ProviderId,
    pub event_id: EventId,
    pub account_address: AccountAddress,
    pub payload: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycStatusPayload {
    pub kyc_schema: KycSchema,
    pub kyc_status: KycStatus,
}

pub type WebhookKycStatusRequestBody = WebhookRequestBody<KycStatusPayload>;

pub type WebhookTransferInStatusRequestBody = WebhookRequestBody<TransferStatusResponse>;

/// Transfer-out webhooks share the transfer-in body shape.
pub type WebhookTransferOutStatusRequestBody = WebhookTransferInStatusRequestBody;

/// Any webhook body, discriminated by its `eventType`.
///
/// ```
/// use fiatconnect_core::webhook::{WebhookEvent, WebhookEventType};
///
/// let event: WebhookEvent = serde_json::from_value(serde_json::json!({
///     "eventType": "KycStatusEvent",
///     "provider": "test-provider",
///     "eventId": "evt-1",
///     "accountAddress": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
///     "payload": { "kycSchema": "MockNameAndAddress", "kycStatus": "Approved" }
/// })).unwrap();
///
/// assert_eq!(event.event_type(), WebhookEventType::KycStatusEvent);
/// assert_eq!(event.event_id().as_str(), "evt-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    KycStatus(WebhookKycStatusRequestBody),
    TransferInStatus(WebhookTransferInStatusRequestBody),
    TransferOutStatus(WebhookTransferOutStatusRequestBody),
}

impl WebhookEvent {
    pub fn event_type(&self) -> WebhookEventType {
        match self {
            WebhookEvent::KycStatus(_) => WebhookEventType::KycStatusEvent,
            WebhookEvent::TransferInStatus(_) => WebhookEventType::TransferInStatusEvent,
            WebhookEvent::TransferOutStatus(_) => WebhookEventType::TransferOutStatusEvent,
        }
    }

    pub fn event_id(&self) -> &EventId {
        match self {
            WebhookEvent::KycStatus(b) => &b.event_id,
            WebhookEvent::TransferInStatus(b) | WebhookEvent::TransferOutStatus(b) => &b.event_id,
        }
    }

    pub fn provider(&self) -> &ProviderId {
        match self {
            WebhookEvent::KycStatus(b) => &b.provider,
            WebhookEvent::TransferInStatus(b) | WebhookEvent::TransferOutStatus(b) => &b.provider,
        }
    }

    pub fn account_address(&self) -> AccountAddress {
        match self {
            WebhookEvent::KycStatus(b) => b.account_address,
            WebhookEvent::TransferInStatus(b) | WebhookEvent::TransferOutStatus(b) => {
                b.account_address
            }
        }
    }

    pub fn as_kyc_status(&self) -> Option<&WebhookKycStatusRequestBody> {
        match self {
            WebhookEvent::KycStatus(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_transfer_status(&self) -> Option<&WebhookTransferInStatusRequestBody> {
        match self {
            WebhookEvent::TransferInStatus(b) | WebhookEvent::TransferOutStatus(b) => Some(b),
            _ => None,
        }
    }
}

impl Serialize for WebhookEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            WebhookEvent::KycStatus(b) => b.serialize(serializer),
            WebhookEvent::TransferInStatus(b) | WebhookEvent::TransferOutStatus(b) => {
                b.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for WebhookEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = AnyJson::deserialize(deserializer)?;
        let event_type = value
            .get("eventType")
            .cloned()
            .ok_or_else(|| serde::de::Error::missing_field("eventType"))?;
        let event_type: WebhookEventType =
            serde_json::from_value(event_type).map_err(serde::de::Error::custom)?;

        match event_type {
            WebhookEventType::KycStatusEvent => serde_json::from_value(value)
                .map(WebhookEvent::KycStatus)
                .map_err(serde::de::Error::custom),
            WebhookEventType::TransferInStatusEvent => serde_json::from_value(value)
                .map(WebhookEvent::TransferInStatus)
                .map_err(serde::de::Error::custom),
            WebhookEventType::TransferOutStatusEvent => serde_json::from_value(value)
                .map(WebhookEvent::TransferOutStatus)
                .map_err(serde::de::Error::custom),
        }
    }
}
