//! In-memory wallet custody and transaction signing.
//!
//! # Security
//! - Keys live only in process memory and are never persisted
//! - Keys are never logged; `Debug` prints the address only
//! - The only place a key leaves the store is the `eth_createWallet` result

use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::blockchain::format::checksum;
use crate::blockchain::types::{ChainError, ChainResult};
use crate::errors::api::{ApiError, ApiResult};

/// A named signing key.
#[derive(Clone)]
pub struct ManagedWallet {
    name: String,
    signer: PrivateKeySigner,
}

impl ManagedWallet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// 0x-prefixed hex of the secret key.
    pub fn private_key_hex(&self) -> String {
        self.signer.to_bytes().to_string()
    }

    /// Sign `request` and return the EIP-2718 encoded transaction.
    ///
    /// The request must carry nonce, gas limit, gas price and chain id.
    pub async fn sign_transaction(&self, request: TransactionRequest) -> ChainResult<Bytes> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let envelope = request
            .with_from(self.address())
            .build(&wallet)
            .await
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        Ok(Bytes::from(envelope.encoded_2718()))
    }
}

impl std::fmt::Debug for ManagedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedWallet")
            .field("name", &self.name)
            .field("address", &self.address())
            .finish()
    }
}

/// Wallets keyed by name, with an address index.
#[derive(Debug, Clone, Default)]
pub struct WalletStore {
    by_name: Arc<DashMap<String, ManagedWallet>>,
    by_address: Arc<DashMap<Address, String>>,
}

impl WalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh key. `name` defaults to the checksummed address.
    pub fn create(&self, name: Option<String>) -> ApiResult<ManagedWallet> {
        self.insert(name, PrivateKeySigner::random())
    }

    /// Import an already validated 32-byte secret.
    pub fn import(&self, secret: B256, name: Option<String>) -> ApiResult<ManagedWallet> {
        let signer = PrivateKeySigner::from_bytes(&secret)
            .map_err(|e| ApiError::invalid_private_key(Some(&e.to_string())))?;
        self.insert(name, signer)
    }

    fn insert(&self, name: Option<String>, signer: PrivateKeySigner) -> ApiResult<ManagedWallet> {
        let address = signer.address();
        let name = name.unwrap_or_else(|| checksum(address));

        if let Some(existing) = self.by_address.get(&address) {
            return Err(ApiError::wallet_already_exists(existing.value()));
        }

        match self.by_name.entry(name.clone()) {
            Entry::Occupied(_) => Err(ApiError::wallet_already_exists(&name)),
            Entry::Vacant(slot) => {
                let wallet = ManagedWallet {
                    name: name.clone(),
                    signer,
                };
                slot.insert(wallet.clone());
                self.by_address.insert(address, name);
                tracing::info!(wallet = %wallet.name, address = %address, "Wallet added");
                Ok(wallet)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<ManagedWallet> {
        self.by_name.get(name).map(|w| w.value().clone())
    }

    pub fn get_by_address(&self, address: Address) -> Option<ManagedWallet> {
        let name = self.by_address.get(&address).map(|n| n.value().clone())?;
        self.get(&name)
    }

    /// Wallet that signs for `address`, or wallet-not-found.
    pub fn require(&self, address: Address) -> ApiResult<ManagedWallet> {
        self.get_by_address(address)
            .ok_or_else(|| ApiError::wallet_not_found(&checksum(address)))
    }

    /// `(name, address)` pairs sorted by name.
    pub fn list(&self) -> Vec<(String, Address)> {
        let mut wallets: Vec<(String, Address)> = self
            .by_name
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().address()))
            .collect();
        wallets.sort_by(|a, b| a.0.cmp(&b.0));
        wallets
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
