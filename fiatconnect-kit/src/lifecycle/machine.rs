use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, Utc};

use super::{
    entity::{KycKey, KycRecord, LifecycleEntity, TransferRecord},
    store::{EntityStore, Versioned},
};
use crate::{
    accounts::FiatAccountBook,
    config::KycPolicy,
    errors::{FiatConnectError, ProtocolError},
    transport::{
        KycRequirements, KycStatusResponse, QuoteResponse, TransferRequestBody, TransferResponse,
        TransferStatusResponse,
    },
    types::{
        AccountAddress, AnyJson, EventId, KycSchema, KycStatus, ProviderId, TransferId,
        TransferStatus, TransferType,
    },
    webhook::{EventPublisher, OutboxEntry},
};

/// Gives the machine's store for entities of kind `E`.
pub trait Tracks<E: LifecycleEntity> {
    fn store(&self) -> &EntityStore<E>;
}

/// The provider-side state machine for KYC records and transfers.
///
/// Every committed transition publishes one webhook through `P` while the entity is still
/// locked: if publishing fails, the transition is not committed.
///
/// ```
/// use std::sync::Arc;
///
/// use fiatconnect_kit::{
///     accounts::FiatAccountBook,
///     lifecycle::LifecycleMachine,
///     registry::SchemaRegistry,
///     types::{KycSchema, KycStatus},
///     webhook::MemoryOutbox,
/// };
///
/// let address = "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20".parse().unwrap();
/// let machine = LifecycleMachine::builder()
///     .provider("test-provider")
///     .transfer_address(address)
///     .accounts(Arc::new(FiatAccountBook::new(Arc::new(SchemaRegistry::with_mock_schemas()))))
///     .publisher(MemoryOutbox::new())
///     .build();
///
/// let status = machine.kyc_status(address, KycSchema::MockNameAndAddress);
/// assert_eq!(status.kyc_status, KycStatus::NotCreated);
/// ```
#[derive(Builder)]
pub struct LifecycleMachine<P: EventPublisher> {
    #[builder(into)]
    provider: ProviderId,
    transfer_address: AccountAddress,
    accounts: Arc<FiatAccountBook>,
    publisher: P,
    #[builder(default)]
    policy: KycPolicy,
    #[builder(skip)]
    kyc: EntityStore<KycRecord>,
    #[builder(skip)]
    transfers: EntityStore<TransferRecord>,
}

impl<P: EventPublisher> Tracks<KycRecord> for LifecycleMachine<P> {
    fn store(&self) -> &EntityStore<KycRecord> {
        &self.kyc
    }
}

impl<P: EventPublisher> Tracks<TransferRecord> for LifecycleMachine<P> {
    fn store(&self) -> &EntityStore<TransferRecord> {
        &self.transfers
    }
}

impl<P: EventPublisher> LifecycleMachine<P> {
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }

    pub fn policy(&self) -> &KycPolicy {
        &self.policy
    }

    pub fn accounts(&self) -> &FiatAccountBook {
        &self.accounts
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Move the entity of `snapshot` to `proposed`, publishing its webhook.
    ///
    /// Fails with `InvalidTransition` if the edge is not allowed from the current status and
    /// with `Conflict` if the entity changed since `snapshot` was taken.
    pub fn apply_transition<E>(
        &self,
        snapshot: &Versioned<E>,
        proposed: E::Status,
        now: DateTime<Utc>,
    ) -> Result<Versioned<E>, ProtocolError>
    where
        E: LifecycleEntity,
        Self: Tracks<E>,
    {
        <Self as Tracks<E>>::store(self).transition(
            snapshot,
            proposed,
            &self.policy,
            now,
            |_| {},
            |next| self.emit(&next.entity, now),
        )
    }

    fn emit<E: LifecycleEntity>(&self, entity: &E, now: DateTime<Utc>) -> Result<(), ProtocolError> {
        let event = entity.webhook(&self.provider, EventId(uuid::Uuid::new_v4().to_string()));
        self.publisher
            .publish(OutboxEntry::new(entity.entity_key(), event, now))?;
        Ok(())
    }

    /*
     * KYC
     */

    /// Submit a KYC payload, moving the record to `Pending`.
    ///
    /// Fails with `ResourceExists` while a submission is pending or approved. A denied record
    /// may be resubmitted if the policy allows it.
    pub fn submit_kyc(
        &self,
        account: AccountAddress,
        schema: KycSchema,
        payload: AnyJson,
        now: DateTime<Utc>,
    ) -> Result<KycStatusResponse, ProtocolError> {
        let decoded = self.accounts.registry().decode_kyc(schema, payload)?;
        let key = KycKey {
            account_address: account,
            kyc_schema: schema,
        };
        let snapshot = self
            .kyc
            .get_or_insert_with(key, || KycRecord::new(account, schema, now));

        if matches!(snapshot.status, KycStatus::Pending | KycStatus::Approved) {
            return Err(FiatConnectError::ResourceExists.into());
        }

        let next = self.kyc.transition(
            &snapshot,
            KycStatus::Pending,
            &self.policy,
            now,
            |record| record.data = Some(decoded.data),
            |next| self.emit(&next.entity, now),
        )?;

        Ok(KycStatusResponse {
            kyc_status: next.status,
        })
    }

    pub fn kyc(&self, account: AccountAddress, schema: KycSchema) -> Option<Versioned<KycRecord>> {
        self.kyc.get(&KycKey {
            account_address: account,
            kyc_schema: schema,
        })
    }

    /// Current KYC status; `NotCreated` if nothing was submitted.
    pub fn kyc_status(&self, account: AccountAddress, schema: KycSchema) -> KycStatusResponse {
        let kyc_status = self
            .kyc(account, schema)
            .map_or(KycStatus::NotCreated, |record| record.status);
        KycStatusResponse { kyc_status }
    }

    /// Delete a KYC record so the account can start over. No webhook is sent.
    pub fn delete_kyc(&self, account: AccountAddress, schema: KycSchema) -> Result<(), ProtocolError> {
        let key = KycKey {
            account_address: account,
            kyc_schema: schema,
        };
        match self.kyc.remove(&key) {
            Some(record) if record.status != KycStatus::NotCreated => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Deleted KYC record {key} in status {}", record.status);
                Ok(())
            }
            _ => Err(FiatConnectError::ResourceNotFound.into()),
        }
    }

    /// Expire every approval older than the policy's `approval_ttl`.
    ///
    /// Records changed concurrently are skipped; they are picked up by the next sweep if still
    /// due.
    pub fn expire_kyc(&self, now: DateTime<Utc>) -> Result<Vec<Versioned<KycRecord>>, ProtocolError> {
        let Some(ttl) = self.policy.approval_ttl else {
            return Ok(Vec::new());
        };

        let due = self.kyc.snapshots().into_iter().filter(|record| {
            record.status == KycStatus::Approved
                && record
                    .approved_at
                    .and_then(|at| at.checked_add_signed(ttl))
                    .is_some_and(|deadline| deadline < now)
        });

        let mut expired = Vec::new();
        for snapshot in due {
            match self.apply_transition(&snapshot, KycStatus::Expired, now) {
                Ok(next) => expired.push(next),
                Err(err) if err.is_conflict() => continue,
                Err(err) => return Err(err),
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Expired {} KYC approvals", expired.len());

        Ok(expired)
    }

    /*
     * Transfers
     */

    /// Create a transfer in `TransferStarted` from a previously issued quote.
    ///
    /// The request must match the quote's currencies and the amount the user provides. An
    /// expired quote is reported as `ResourceNotFound`.
    pub fn start_transfer(
        &self,
        account: AccountAddress,
        transfer_type: TransferType,
        request: &TransferRequestBody,
        quote: &QuoteResponse,
        now: DateTime<Utc>,
    ) -> Result<TransferResponse, ProtocolError> {
        let q = &quote.quote;
        if !q.is_valid(now) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Rejected transfer for {account}: quote expired");
            return Err(FiatConnectError::ResourceNotFound.into());
        }
        if request.fiat_type != q.fiat_type || request.crypto_type != q.crypto_type {
            return Err(FiatConnectError::TransferNotAllowed.into());
        }

        let (quoted_provided, quoted_received) = match transfer_type {
            TransferType::TransferIn => (q.fiat_amount, q.crypto_amount),
            TransferType::TransferOut => (q.crypto_amount, q.fiat_amount),
        };
        if request.amount != quoted_provided {
            return Err(FiatConnectError::TransferNotAllowed.into());
        }

        let fiat_account = self.accounts.get(&account, &request.fiat_account_id)?;
        if fiat_account
            .fiat_type
            .is_some_and(|fiat_type| fiat_type != request.fiat_type)
        {
            return Err(FiatConnectError::TransferNotAllowed.into());
        }
        let account_terms = quote.fiat_account.get(&fiat_account.fiat_account_type);
        if !quote.fiat_account.is_empty() && account_terms.is_none() {
            return Err(FiatConnectError::TransferNotAllowed.into());
        }

        self.check_kyc(account, &quote.kyc)?;

        let record = TransferRecord {
            transfer_id: TransferId(uuid::Uuid::new_v4().to_string()),
            account_address: account,
            transfer_type,
            status: TransferStatus::TransferStarted,
            fiat_type: request.fiat_type,
            crypto_type: request.crypto_type,
            amount_provided: request.amount,
            amount_received: quoted_received,
            fee: account_terms.and_then(|terms| terms.fee),
            fiat_account_id: request.fiat_account_id.clone(),
            transfer_address: self.transfer_address,
            created_at: now,
            updated_at: now,
        };
        let created = self
            .transfers
            .insert(record, |created| self.emit(&created.entity, now))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Transfer started: id='{}' type={transfer_type} account='{account}'",
            created.transfer_id
        );

        Ok(TransferResponse {
            transfer_id: created.transfer_id.clone(),
            transfer_status: created.status,
            transfer_address: created.transfer_address,
        })
    }

    /// Any approved schema among the quote's passes. Otherwise an expired one yields
    /// `KycExpired` and anything else `TransferNotAllowed`.
    fn check_kyc(
        &self,
        account: AccountAddress,
        requirements: &KycRequirements,
    ) -> Result<(), ProtocolError> {
        if !requirements.kyc_required {
            return Ok(());
        }

        let statuses: Vec<KycStatus> = requirements
            .kyc_schemas
            .iter()
            .map(|schema| self.kyc_status(account, *schema).kyc_status)
            .collect();

        if statuses.contains(&KycStatus::Approved) {
            Ok(())
        } else if statuses.contains(&KycStatus::Expired) {
            Err(FiatConnectError::KycExpired.into())
        } else {
            Err(FiatConnectError::TransferNotAllowed.into())
        }
    }

    pub fn transfer(&self, id: &TransferId) -> Result<Versioned<TransferRecord>, ProtocolError> {
        self.transfers
            .get(id)
            .ok_or_else(|| FiatConnectError::ResourceNotFound.into())
    }

    /// Status of a transfer owned by `account`. Other accounts' transfers are reported missing.
    pub fn transfer_status(
        &self,
        account: AccountAddress,
        id: &TransferId,
    ) -> Result<TransferStatusResponse, ProtocolError> {
        let transfer = self.transfer(id)?;
        if transfer.account_address != account {
            return Err(FiatConnectError::ResourceNotFound.into());
        }
        Ok(transfer.status_response())
    }
}
