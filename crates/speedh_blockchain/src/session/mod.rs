//! # Player Sessions
//!
//! A [`Session`] is one connected player: an optional bound account, the
//! active chain, the signer that talks to their wallet, and a small typed
//! storage that per-session caches hang off. Sessions share nothing; two
//! sessions never see each other's cached state.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::backend::{ChainBackend, TxDescriptor, TxHash, TxReceipt};
use crate::error::{ChainError, ChainResult};

/// What a signer hands back after submitting.
///
/// Wallets differ in how they report completion; all three shapes are
/// awaited the same way by the pipeline.
pub enum Submission {
    /// Only a hash; inclusion is observed by polling the chain.
    Hash(TxHash),
    /// A hash plus a future that resolves on inclusion.
    Future {
        /// Submitted hash.
        hash: TxHash,
        /// Resolves with the receipt.
        completion: BoxFuture<'static, ChainResult<TxReceipt>>,
    },
    /// A hash plus a one-shot completion notification.
    Notify {
        /// Submitted hash.
        hash: TxHash,
        /// Receives the receipt.
        completion: oneshot::Receiver<ChainResult<TxReceipt>>,
    },
}

impl Submission {
    /// Submitted hash, whatever the completion shape.
    #[must_use]
    pub fn hash(&self) -> TxHash {
        match self {
            Self::Hash(hash) | Self::Future { hash, .. } | Self::Notify { hash, .. } => *hash,
        }
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Hash(_) => "Hash",
            Self::Future { .. } => "Future",
            Self::Notify { .. } => "Notify",
        };
        f.debug_struct("Submission")
            .field("kind", &kind)
            .field("hash", &self.hash())
            .finish()
    }
}

/// Signs and submits on behalf of a session's account.
#[async_trait]
pub trait SessionSigner: Send + Sync {
    /// Signs `tx` for `from` and submits it.
    ///
    /// # Errors
    ///
    /// [`ChainError::Rejected`] when the user or wallet refuses, or any
    /// network error from submission.
    async fn sign_and_submit(&self, from: Address, tx: &TxDescriptor) -> ChainResult<Submission>;
}

/// Signer that delegates to a backend's node-managed accounts.
pub struct BackendSigner {
    backend: Arc<dyn ChainBackend>,
}

impl BackendSigner {
    /// Wraps `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ChainBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl SessionSigner for BackendSigner {
    async fn sign_and_submit(&self, from: Address, tx: &TxDescriptor) -> ChainResult<Submission> {
        self.backend
            .send_transaction(from, tx)
            .await
            .map(Submission::Hash)
    }
}

/// Typed per-session storage keyed by static names.
#[derive(Default)]
pub struct SessionStorage {
    slots: Mutex<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl SessionStorage {
    /// Returns the value under `key`, creating it with `init` on first use.
    ///
    /// A value of a different type under the same key is replaced.
    pub fn get_or_init<T, F>(&self, key: &'static str, init: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut slots = self.slots.lock();
        if let Some(existing) = slots.get(key) {
            if let Ok(typed) = Arc::clone(existing).downcast::<T>() {
                return typed;
            }
        }
        let value = Arc::new(init());
        slots.insert(key, Arc::clone(&value) as Arc<dyn Any + Send + Sync>);
        value
    }

    /// Whether `key` has been initialized.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.slots.lock().contains_key(key)
    }

    /// Drops the value under `key`.
    pub fn remove(&self, key: &str) {
        self.slots.lock().remove(key);
    }
}

/// One connected player.
pub struct Session {
    address: Option<Address>,
    chain_id: u64,
    signer: Arc<dyn SessionSigner>,
    storage: SessionStorage,
}

impl Session {
    /// Creates a session. `address` is `None` until a wallet is connected.
    #[must_use]
    pub fn new(chain_id: u64, address: Option<Address>, signer: Arc<dyn SessionSigner>) -> Self {
        Self {
            address,
            chain_id,
            signer,
            storage: SessionStorage::default(),
        }
    }

    /// Bound account, if any.
    #[must_use]
    pub const fn address(&self) -> Option<Address> {
        self.address
    }

    /// Active chain.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Wallet signer.
    #[must_use]
    pub fn signer(&self) -> &dyn SessionSigner {
        self.signer.as_ref()
    }

    /// Per-session storage.
    #[must_use]
    pub const fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Bound account or [`ChainError::Configuration`].
    ///
    /// # Errors
    ///
    /// When no account is bound.
    pub fn require_address(&self) -> ChainResult<Address> {
        self.address
            .ok_or_else(|| ChainError::Configuration("no account bound to session".to_string()))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
