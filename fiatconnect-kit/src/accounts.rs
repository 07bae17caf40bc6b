//! Fiat accounts registered by users.
//!
//! Accounts are created from a schema payload, never mutated and deleted by id. Only the
//! obfuscated view ever leaves the book.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::{
    errors::{FiatConnectError, ProtocolError},
    registry::SchemaRegistry,
    transport::{AddFiatAccountResponse, GetFiatAccountsResponse, ObfuscatedFiatAccountData},
    types::{
        AccountAddress, AnyJson, FiatAccountId, FiatAccountSchema, FiatAccountType, FiatType,
    },
};

/// A stored fiat account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiatAccount {
    pub id: FiatAccountId,
    pub owner: AccountAddress,
    pub schema: FiatAccountSchema,
    pub fiat_account_type: FiatAccountType,
    pub institution: String,
    pub name: String,
    pub fiat_type: Option<FiatType>,
    pub created_at: DateTime<Utc>,
    fingerprint: String,
}

impl FiatAccount {
    pub fn obfuscated(&self) -> ObfuscatedFiatAccountData {
        ObfuscatedFiatAccountData {
            fiat_account_id: self.id.clone(),
            name: self.name.clone(),
            institution: self.institution.clone(),
            fiat_account_type: self.fiat_account_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FingerprintKey {
    owner: AccountAddress,
    schema: FiatAccountSchema,
    fingerprint: String,
}

/// In-memory fiat account storage keyed by [`FiatAccountId`].
#[derive(Debug)]
pub struct FiatAccountBook {
    registry: Arc<SchemaRegistry>,
    accounts: DashMap<FiatAccountId, FiatAccount>,
    fingerprints: DashMap<FingerprintKey, FiatAccountId>,
}

impl FiatAccountBook {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        FiatAccountBook {
            registry,
            accounts: DashMap::new(),
            fingerprints: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Register a fiat account for `owner` from a `schema` payload.
    ///
    /// The same underlying account can be added once per owner; a second add fails with
    /// `ResourceExists`.
    pub fn add(
        &self,
        owner: AccountAddress,
        schema: FiatAccountSchema,
        json: AnyJson,
        now: DateTime<Utc>,
    ) -> Result<AddFiatAccountResponse, ProtocolError> {
        let decoded = self.registry.decode_fiat_account(schema, json)?;
        let key = FingerprintKey {
            owner,
            schema,
            fingerprint: decoded.fingerprint.clone(),
        };

        let slot = match self.fingerprints.entry(key) {
            Entry::Occupied(_) => return Err(FiatConnectError::ResourceExists.into()),
            Entry::Vacant(slot) => slot,
        };

        let id = FiatAccountId(uuid::Uuid::new_v4().to_string());
        let account = FiatAccount {
            id: id.clone(),
            owner,
            schema,
            fiat_account_type: decoded.fiat_account_type,
            institution: decoded.institution,
            name: decoded.name,
            fiat_type: decoded.fiat_type,
            created_at: now,
            fingerprint: decoded.fingerprint,
        };
        let response = account.obfuscated();

        self.accounts.insert(id.clone(), account);
        slot.insert(id);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Added fiat account: id='{}' owner='{owner}' schema='{schema}'",
            response.fiat_account_id
        );

        Ok(response)
    }

    /// Look up an account owned by `owner`. Accounts of other owners are reported as missing.
    pub fn get(
        &self,
        owner: &AccountAddress,
        id: &FiatAccountId,
    ) -> Result<FiatAccount, ProtocolError> {
        self.accounts
            .get(id)
            .filter(|account| account.owner == *owner)
            .map(|account| account.value().clone())
            .ok_or_else(|| FiatConnectError::ResourceNotFound.into())
    }

    /// All accounts of `owner`, grouped by account type.
    pub fn list(&self, owner: &AccountAddress) -> GetFiatAccountsResponse {
        let mut accounts: Vec<FiatAccount> = self
            .accounts
            .iter()
            .filter(|entry| entry.owner == *owner)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut grouped = GetFiatAccountsResponse::new();
        for account in accounts {
            grouped
                .entry(account.fiat_account_type)
                .or_default()
                .push(account.obfuscated());
        }
        grouped
    }

    pub fn delete(&self, owner: &AccountAddress, id: &FiatAccountId) -> Result<(), ProtocolError> {
        let (_, account) = self
            .accounts
            .remove_if(id, |_, account| account.owner == *owner)
            .ok_or(FiatConnectError::ResourceNotFound)?;

        self.fingerprints.remove(&FingerprintKey {
            owner: account.owner,
            schema: account.schema,
            fingerprint: account.fingerprint,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!("Deleted fiat account: id='{id}' owner='{owner}'");

        Ok(())
    }
}
