use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use chrono::{DateTime, Utc};

use super::rules::{kyc_transition_allowed, transfer_transition_allowed};
use crate::{
    config::KycPolicy,
    errors::EntityStatus,
    transport::TransferStatusResponse,
    types::{
        AccountAddress, AnyJson, CryptoType, DecimalAmount, EventId, FiatAccountId, FiatType,
        KycSchema, KycStatus, ProviderId, TransferId, TransferStatus, TransferType,
    },
    webhook::body::{KycStatusPayload, WebhookEvent, WebhookEventType, WebhookRequestBody},
};

/// An entity whose status is governed by the lifecycle rules.
pub trait LifecycleEntity: Debug + Clone + Send + Sync + 'static {
    /// Prefix of the entity's outbox key.
    const KIND: &'static str;

    type Key: Debug + Display + Clone + Eq + Hash + Send + Sync + 'static;
    type Status: Debug + Display + Copy + Eq + Into<EntityStatus>;

    fn key(&self) -> Self::Key;

    fn status(&self) -> Self::Status;

    fn transition_allowed(from: Self::Status, to: Self::Status, policy: &KycPolicy) -> bool;

    /// Record the new status. Only called after the transition was validated.
    fn set_status(&mut self, status: Self::Status, now: DateTime<Utc>);

    /// The webhook announcing the entity's current status.
    fn webhook(&self, provider: &ProviderId, event_id: EventId) -> WebhookEvent;

    /// Key used to order this entity's webhooks.
    fn entity_key(&self) -> String {
        format!("{}:{}", Self::KIND, self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KycKey {
    pub account_address: AccountAddress,
    pub kyc_schema: KycSchema,
}

impl Display for KycKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account_address, self.kyc_schema)
    }
}

/// A KYC submission of one account under one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KycRecord {
    pub account_address: AccountAddress,
    pub kyc_schema: KycSchema,
    pub status: KycStatus,
    /// The last validated submission.
    pub data: Option<AnyJson>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl KycRecord {
    pub fn new(account_address: AccountAddress, kyc_schema: KycSchema, now: DateTime<Utc>) -> Self {
        KycRecord {
            account_address,
            kyc_schema,
            status: KycStatus::NotCreated,
            data: None,
            created_at: now,
            updated_at: now,
            approved_at: None,
        }
    }
}

impl LifecycleEntity for KycRecord {
    const KIND: &'static str = "kyc";

    type Key = KycKey;
    type Status = KycStatus;

    fn key(&self) -> KycKey {
        KycKey {
            account_address: self.account_address,
            kyc_schema: self.kyc_schema,
        }
    }

    fn status(&self) -> KycStatus {
        self.status
    }

    fn transition_allowed(from: KycStatus, to: KycStatus, policy: &KycPolicy) -> bool {
        kyc_transition_allowed(from, to, policy)
    }

    fn set_status(&mut self, status: KycStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
        if status == KycStatus::Approved {
            self.approved_at = Some(now);
        }
    }

    fn webhook(&self, provider: &ProviderId, event_id: EventId) -> WebhookEvent {
        WebhookEvent::KycStatus(WebhookRequestBody {
            event_type: WebhookEventType::KycStatusEvent,
            provider: provider.clone(),
            event_id,
            account_address: self.account_address,
            payload: KycStatusPayload {
                kyc_schema: self.kyc_schema,
                kyc_status: self.status,
            },
        })
    }
}

/// A transfer in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    pub account_address: AccountAddress,
    pub transfer_type: TransferType,
    pub status: TransferStatus,
    pub fiat_type: FiatType,
    pub crypto_type: CryptoType,
    pub amount_provided: DecimalAmount,
    pub amount_received: DecimalAmount,
    pub fee: Option<DecimalAmount>,
    pub fiat_account_id: FiatAccountId,
    pub transfer_address: AccountAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn status_response(&self) -> TransferStatusResponse {
        TransferStatusResponse {
            status: self.status,
            transfer_type: self.transfer_type,
            fiat_type: self.fiat_type,
            crypto_type: self.crypto_type,
            amount_provided: self.amount_provided,
            amount_received: self.amount_received,
            fee: self.fee,
            fiat_account_id: self.fiat_account_id.clone(),
        }
    }
}

impl LifecycleEntity for TransferRecord {
    const KIND: &'static str = "transfer";

    type Key = TransferId;
    type Status = TransferStatus;

    fn key(&self) -> TransferId {
        self.transfer_id.clone()
    }

    fn status(&self) -> TransferStatus {
        self.status
    }

    fn transition_allowed(from: TransferStatus, to: TransferStatus, _policy: &KycPolicy) -> bool {
        transfer_transition_allowed(from, to)
    }

    fn set_status(&mut self, status: TransferStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    fn webhook(&self, provider: &ProviderId, event_id: EventId) -> WebhookEvent {
        let event_type = match self.transfer_type {
            TransferType::TransferIn => WebhookEventType::TransferInStatusEvent,
            TransferType::TransferOut => WebhookEventType::TransferOutStatusEvent,
        };
        let body = WebhookRequestBody {
            event_type,
            provider: provider.clone(),
            event_id,
            account_address: self.account_address,
            payload: self.status_response(),
        };

        match self.transfer_type {
            TransferType::TransferIn => WebhookEvent::TransferInStatus(body),
            TransferType::TransferOut => WebhookEvent::TransferOutStatus(body),
        }
    }
}
