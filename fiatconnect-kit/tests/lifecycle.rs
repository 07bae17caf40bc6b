use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use fiatconnect_kit::{
    accounts::FiatAccountBook,
    config::KycPolicy,
    errors::{EntityStatus, ErrorCode, FiatConnectError, LifecycleErrorCode, ProtocolError},
    lifecycle::{LifecycleMachine, TransferRecord, Versioned},
    registry::SchemaRegistry,
    transport::{
        FiatAccountTypeQuoteData, KycRequirements, Quote, QuoteResponse, TransferRequestBody,
    },
    types::{
        AccountAddress, AnyJson, CryptoType, FiatAccountId, FiatAccountSchema, FiatAccountType,
        FiatType, KycSchema, KycStatus, TransferStatus, TransferType,
    },
    webhook::{
        EventPublisher, MemoryOutbox, Outbox, OutboxEntry, OutboxError,
        body::{WebhookEvent, WebhookEventType},
    },
};
use serde_json::json;

const ALICE: &str = "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20";
const PROVIDER_WALLET: &str = "0x000000000000000000000000000000000000dEaD";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn alice() -> AccountAddress {
    ALICE.parse().unwrap()
}

fn kyc_payload() -> AnyJson {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "address": {
            "address1": "1 Main St",
            "city": "San Francisco",
            "region": "CA",
            "postalCode": "94105",
            "isoCountryCode": "US"
        }
    })
}

fn checking_payload() -> AnyJson {
    json!({
        "bankName": "Chase",
        "accountName": "Checking Account",
        "fiatType": "USD",
        "accountNumber": "12345678",
        "routingNumber": "021000021"
    })
}

fn machine_with<P: EventPublisher>(publisher: P, policy: KycPolicy) -> LifecycleMachine<P> {
    let registry = Arc::new(SchemaRegistry::with_mock_schemas());
    LifecycleMachine::builder()
        .provider("test-provider")
        .transfer_address(PROVIDER_WALLET.parse().unwrap())
        .accounts(Arc::new(FiatAccountBook::new(registry)))
        .publisher(publisher)
        .policy(policy)
        .build()
}

fn machine() -> LifecycleMachine<MemoryOutbox> {
    machine_with(MemoryOutbox::new(), KycPolicy::default())
}

fn quote(kyc_required: bool) -> QuoteResponse {
    QuoteResponse {
        quote: Quote::builder()
            .fiat_type(FiatType::Usd)
            .crypto_type(CryptoType::CUsd)
            .fiat_amount(100u32.into())
            .crypto_amount(99u32.into())
            .guaranteed_until(t0() + Duration::minutes(10))
            .build(),
        kyc: KycRequirements::builder()
            .kyc_required(kyc_required)
            .kyc_schemas(vec![KycSchema::MockNameAndAddress])
            .build(),
        fiat_account: BTreeMap::from([(
            FiatAccountType::MockCheckingAccount,
            FiatAccountTypeQuoteData::builder()
                .fiat_account_schemas(vec![FiatAccountSchema::MockCheckingAccount])
                .fee("0.5".parse().unwrap())
                .build(),
        )]),
    }
}

fn add_account<P: EventPublisher>(machine: &LifecycleMachine<P>) -> FiatAccountId {
    machine
        .accounts()
        .add(
            alice(),
            FiatAccountSchema::MockCheckingAccount,
            checking_payload(),
            t0(),
        )
        .unwrap()
        .fiat_account_id
}

fn approve_kyc<P: EventPublisher>(machine: &LifecycleMachine<P>, at: DateTime<Utc>) {
    machine
        .submit_kyc(alice(), KycSchema::MockNameAndAddress, kyc_payload(), at)
        .unwrap();
    let pending = machine.kyc(alice(), KycSchema::MockNameAndAddress).unwrap();
    machine
        .apply_transition(&pending, KycStatus::Approved, at)
        .unwrap();
}

fn transfer_in<P: EventPublisher>(
    machine: &LifecycleMachine<P>,
    account: &FiatAccountId,
) -> Result<Versioned<TransferRecord>, ProtocolError> {
    let request = TransferRequestBody::builder()
        .fiat_type(FiatType::Usd)
        .crypto_type(CryptoType::CUsd)
        .amount(100u32)
        .fiat_account_id(account.clone())
        .build();
    let response = machine.start_transfer(
        alice(),
        TransferType::TransferIn,
        &request,
        &quote(true),
        t0(),
    )?;
    machine.transfer(&response.transfer_id)
}

fn protocol_code(err: &ProtocolError) -> ErrorCode {
    err.code()
}

#[test]
fn test_transfer_lifecycle_scenario() {
    let machine = machine();
    let account = add_account(&machine);
    approve_kyc(&machine, t0());

    let started = transfer_in(&machine, &account).unwrap();
    assert_eq!(started.status, TransferStatus::TransferStarted);
    assert_eq!(started.amount_received, 99u32.into());
    assert_eq!(started.fee, Some("0.5".parse().unwrap()));

    let pending = machine
        .apply_transition(&started, TransferStatus::TransferPending, t0())
        .unwrap();
    let complete = machine
        .apply_transition(&pending, TransferStatus::TransferComplete, t0())
        .unwrap();
    assert_eq!(complete.version, 2);

    let err = machine
        .apply_transition(&complete, TransferStatus::TransferPending, t0())
        .unwrap_err();
    match err {
        ProtocolError::InvalidTransition { current, proposed } => {
            assert_eq!(
                current,
                EntityStatus::Transfer(TransferStatus::TransferComplete)
            );
            assert_eq!(
                proposed,
                EntityStatus::Transfer(TransferStatus::TransferPending)
            );
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }

    let status = machine
        .transfer_status(alice(), &complete.transfer_id)
        .unwrap();
    assert_eq!(status.status, TransferStatus::TransferComplete);
    assert_eq!(status.fiat_account_id, account);
}

#[test]
fn test_terminal_transfer_accepts_nothing() {
    let machine = machine();
    let account = add_account(&machine);
    approve_kyc(&machine, t0());

    let started = transfer_in(&machine, &account).unwrap();
    let failed = machine
        .apply_transition(&started, TransferStatus::TransferFailed, t0())
        .unwrap();

    for proposed in TransferStatus::ALL {
        let err = machine
            .apply_transition(&failed, proposed, t0())
            .unwrap_err();
        assert_eq!(
            protocol_code(&err),
            LifecycleErrorCode::InvalidTransition.into()
        );
    }
}

#[test]
fn test_transitions_publish_webhooks_in_order() {
    let machine = machine();
    let account = add_account(&machine);
    approve_kyc(&machine, t0());

    let started = transfer_in(&machine, &account).unwrap();
    let pending = machine
        .apply_transition(&started, TransferStatus::TransferPending, t0())
        .unwrap();
    machine
        .apply_transition(&pending, TransferStatus::TransferComplete, t0())
        .unwrap();

    let entity_key = format!("transfer:{}", started.transfer_id);
    let statuses: Vec<TransferStatus> = machine
        .publisher()
        .pending()
        .unwrap()
        .into_iter()
        .filter(|entry| entry.entity_key == entity_key)
        .map(|entry| {
            assert_eq!(
                entry.event.event_type(),
                WebhookEventType::TransferInStatusEvent
            );
            entry.event.as_transfer_status().unwrap().payload.status
        })
        .collect();

    assert_eq!(
        statuses,
        vec![
            TransferStatus::TransferStarted,
            TransferStatus::TransferPending,
            TransferStatus::TransferComplete,
        ]
    );

    let ids: std::collections::HashSet<_> = machine
        .publisher()
        .pending()
        .unwrap()
        .iter()
        .map(|entry| entry.event_id().clone())
        .collect();
    assert_eq!(ids.len(), machine.publisher().pending().unwrap().len());
}

#[test]
fn test_racing_transitions_conflict() {
    let machine = machine();
    let account = add_account(&machine);
    approve_kyc(&machine, t0());
    let started = transfer_in(&machine, &account).unwrap();
    let machine = Arc::new(machine);

    let handles: Vec<_> = [TransferStatus::TransferPending, TransferStatus::TransferFailed]
        .into_iter()
        .map(|proposed| {
            let machine = machine.clone();
            let snapshot = started.clone();
            std::thread::spawn(move || machine.apply_transition(&snapshot, proposed, t0()))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let committed = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(ProtocolError::Conflict { .. })))
        .count();
    assert_eq!(committed, 1);
    assert_eq!(conflicts, 1);

    let stored = machine.transfer(&started.transfer_id).unwrap();
    assert_eq!(stored.version, 1);
}

struct FailingPublisher {
    fail: AtomicBool,
    inner: MemoryOutbox,
}

impl EventPublisher for FailingPublisher {
    fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OutboxError::Closed);
        }
        self.inner.publish(entry)
    }
}

#[test]
fn test_failed_publish_rolls_back_transition() {
    let machine = machine_with(
        FailingPublisher {
            fail: AtomicBool::new(false),
            inner: MemoryOutbox::new(),
        },
        KycPolicy::default(),
    );
    let account = add_account(&machine);
    approve_kyc(&machine, t0());
    let started = transfer_in(&machine, &account).unwrap();

    machine.publisher().fail.store(true, Ordering::SeqCst);
    let err = machine
        .apply_transition(&started, TransferStatus::TransferPending, t0())
        .unwrap_err();
    assert_eq!(
        protocol_code(&err),
        LifecycleErrorCode::InternalError.into()
    );

    let stored = machine.transfer(&started.transfer_id).unwrap();
    assert_eq!(stored, started);

    // Nothing was committed, so the same snapshot still applies.
    machine.publisher().fail.store(false, Ordering::SeqCst);
    assert!(
        machine
            .apply_transition(&started, TransferStatus::TransferPending, t0())
            .is_ok()
    );
}

#[test]
fn test_failed_publish_does_not_create_transfer() {
    let machine = machine_with(
        FailingPublisher {
            fail: AtomicBool::new(false),
            inner: MemoryOutbox::new(),
        },
        KycPolicy::default(),
    );
    let account = add_account(&machine);
    approve_kyc(&machine, t0());

    machine.publisher().fail.store(true, Ordering::SeqCst);
    assert!(transfer_in(&machine, &account).is_err());
    // Only the two KYC webhooks.
    assert_eq!(machine.publisher().inner.pending().unwrap().len(), 2);
}

#[test]
fn test_kyc_lifecycle() {
    let machine = machine();
    let schema = KycSchema::MockNameAndAddress;

    assert_eq!(
        machine.kyc_status(alice(), schema).kyc_status,
        KycStatus::NotCreated
    );

    let submitted = machine
        .submit_kyc(alice(), schema, kyc_payload(), t0())
        .unwrap();
    assert_eq!(submitted.kyc_status, KycStatus::Pending);

    let err = machine
        .submit_kyc(alice(), schema, kyc_payload(), t0())
        .unwrap_err();
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::ResourceExists.into()
    );

    let pending = machine.kyc(alice(), schema).unwrap();
    let approved = machine
        .apply_transition(&pending, KycStatus::Approved, t0())
        .unwrap();
    assert_eq!(approved.approved_at, Some(t0()));

    let err = machine
        .apply_transition(&approved, KycStatus::Pending, t0())
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::InvalidTransition {
            current: EntityStatus::Kyc(KycStatus::Approved),
            proposed: EntityStatus::Kyc(KycStatus::Pending),
        }
    ));

    let webhooks: Vec<KycStatus> = machine
        .publisher()
        .pending()
        .unwrap()
        .iter()
        .filter_map(|entry| match &entry.event {
            WebhookEvent::KycStatus(body) => Some(body.payload.kyc_status),
            _ => None,
        })
        .collect();
    assert_eq!(webhooks, vec![KycStatus::Pending, KycStatus::Approved]);
}

#[test]
fn test_kyc_rejects_invalid_payloads() {
    let machine = machine();
    let mut payload = kyc_payload();
    payload["address"]["isoCountryCode"] = json!("USA");

    let err = machine
        .submit_kyc(alice(), KycSchema::MockNameAndAddress, payload, t0())
        .unwrap_err();
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::InvalidSchema.into()
    );
    assert_eq!(
        machine
            .kyc_status(alice(), KycSchema::MockNameAndAddress)
            .kyc_status,
        KycStatus::NotCreated
    );
}

#[test]
fn test_kyc_resubmission_after_denial() {
    let schema = KycSchema::MockNameAndAddress;

    for allow in [true, false] {
        let machine = machine_with(
            MemoryOutbox::new(),
            KycPolicy::builder()
                .allow_resubmission_after_denial(allow)
                .build(),
        );
        machine
            .submit_kyc(alice(), schema, kyc_payload(), t0())
            .unwrap();
        let pending = machine.kyc(alice(), schema).unwrap();
        machine
            .apply_transition(&pending, KycStatus::Denied, t0())
            .unwrap();

        let result = machine.submit_kyc(alice(), schema, kyc_payload(), t0());
        assert_eq!(result.is_ok(), allow, "allow_resubmission_after_denial={allow}");
        if !allow {
            assert_eq!(
                protocol_code(&result.unwrap_err()),
                LifecycleErrorCode::InvalidTransition.into()
            );
        }
    }
}

#[test]
fn test_kyc_expiry_sweep() {
    let machine = machine_with(
        MemoryOutbox::new(),
        KycPolicy::builder().approval_ttl(Duration::days(30)).build(),
    );
    approve_kyc(&machine, t0());

    assert!(machine.expire_kyc(t0() + Duration::days(30)).unwrap().is_empty());

    let expired = machine
        .expire_kyc(t0() + Duration::days(31))
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].status, KycStatus::Expired);

    // Expired is terminal; the account has to start over.
    let err = machine
        .submit_kyc(alice(), KycSchema::MockNameAndAddress, kyc_payload(), t0())
        .unwrap_err();
    assert_eq!(
        protocol_code(&err),
        LifecycleErrorCode::InvalidTransition.into()
    );
    machine
        .delete_kyc(alice(), KycSchema::MockNameAndAddress)
        .unwrap();
    assert!(
        machine
            .submit_kyc(alice(), KycSchema::MockNameAndAddress, kyc_payload(), t0())
            .is_ok()
    );
}

#[test]
fn test_transfer_requires_approved_kyc() {
    let machine = machine_with(
        MemoryOutbox::new(),
        KycPolicy::builder().approval_ttl(Duration::days(1)).build(),
    );
    let account = add_account(&machine);

    let err = transfer_in(&machine, &account).unwrap_err();
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::TransferNotAllowed.into()
    );

    machine
        .submit_kyc(alice(), KycSchema::MockNameAndAddress, kyc_payload(), t0())
        .unwrap();
    let err = transfer_in(&machine, &account).unwrap_err();
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::TransferNotAllowed.into()
    );

    let pending = machine.kyc(alice(), KycSchema::MockNameAndAddress).unwrap();
    machine
        .apply_transition(&pending, KycStatus::Approved, t0() - Duration::days(2))
        .unwrap();
    machine.expire_kyc(t0()).unwrap();

    let err = transfer_in(&machine, &account).unwrap_err();
    assert_eq!(protocol_code(&err), FiatConnectError::KycExpired.into());
}

#[test]
fn test_transfer_without_kyc_requirement() {
    let machine = machine();
    let account = add_account(&machine);
    let request = TransferRequestBody::builder()
        .fiat_type(FiatType::Usd)
        .crypto_type(CryptoType::CUsd)
        .amount(99u32)
        .fiat_account_id(account)
        .build();

    let response = machine
        .start_transfer(
            alice(),
            TransferType::TransferOut,
            &request,
            &quote(false),
            t0(),
        )
        .unwrap();
    assert_eq!(response.transfer_status, TransferStatus::TransferStarted);
    assert_eq!(response.transfer_address, PROVIDER_WALLET.parse().unwrap());

    let status = machine
        .transfer_status(alice(), &response.transfer_id)
        .unwrap();
    assert_eq!(status.transfer_type, TransferType::TransferOut);
    assert_eq!(status.amount_received, 100u32.into());
}

#[test]
fn test_transfer_preconditions() {
    let machine = machine();
    let account = add_account(&machine);
    approve_kyc(&machine, t0());
    let base = TransferRequestBody::builder()
        .fiat_type(FiatType::Usd)
        .crypto_type(CryptoType::CUsd)
        .amount(100u32)
        .fiat_account_id(account.clone())
        .build();
    let start = |request: &TransferRequestBody, at: DateTime<Utc>| {
        machine
            .start_transfer(alice(), TransferType::TransferIn, request, &quote(true), at)
            .unwrap_err()
    };

    // Equality with guaranteedUntil is still valid; one millisecond later is not.
    let until = t0() + Duration::minutes(10);
    assert!(
        machine
            .start_transfer(alice(), TransferType::TransferIn, &base, &quote(true), until)
            .is_ok()
    );
    let err = start(&base, until + Duration::milliseconds(1));
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::ResourceNotFound.into()
    );

    let mut wrong_currency = base.clone();
    wrong_currency.crypto_type = CryptoType::CEur;
    let err = start(&wrong_currency, t0());
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::TransferNotAllowed.into()
    );

    let mut wrong_amount = base.clone();
    wrong_amount.amount = 150u32.into();
    let err = start(&wrong_amount, t0());
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::TransferNotAllowed.into()
    );

    let mut unknown_account = base.clone();
    unknown_account.fiat_account_id = "missing".into();
    let err = start(&unknown_account, t0());
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::ResourceNotFound.into()
    );
}

#[test]
fn test_transfer_status_is_private() {
    let machine = machine();
    let account = add_account(&machine);
    approve_kyc(&machine, t0());
    let started = transfer_in(&machine, &account).unwrap();

    let stranger: AccountAddress = PROVIDER_WALLET.parse().unwrap();
    let err = machine
        .transfer_status(stranger, &started.transfer_id)
        .unwrap_err();
    assert_eq!(
        protocol_code(&err),
        FiatConnectError::ResourceNotFound.into()
    );
    assert_eq!(err.status_code().as_u16(), 404);
}
