//! In-memory watch registry.
//!
//! Holds two mappings, address -> [`AddressWatch`] and txid -> [`TxWatch`],
//! each behind its own lock. Every operation takes the lock it needs for its
//! own duration only, so callers never hold a lock across node queries or
//! notification delivery.

use crate::models::{AddressWatch, NotificationTarget, TxWatch, WatchId};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, Txid};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use txnotify_sdk::objects::WatchKind;
use uuid::Uuid;

/// Errors returned to registration callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("identifier was neither a bitcoin address nor a bitcoin txid: {0}")]
    InvalidIdentifier(String),
}

/// Shared registry of watched addresses and transactions.
///
/// Cheap to clone; all clones see the same state.
#[derive(Clone, Default)]
pub struct WatchRegistry {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    addresses: Mutex<HashMap<Address, AddressWatch>>,
    transactions: Mutex<HashMap<Txid, TxWatch>>,
    /// Locked after `transactions` when both are needed.
    retired: Mutex<RetiredTxids>,
}

/// How many fired txids are remembered to suppress repeated notifications.
const RETIRED_CAPACITY: usize = 4096;

/// Txids whose watch already fired, oldest evicted first.
#[derive(Default)]
struct RetiredTxids {
    members: HashSet<Txid>,
    order: VecDeque<Txid>,
}

impl RetiredTxids {
    fn insert(&mut self, txid: Txid) {
        if !self.members.insert(txid) {
            return;
        }
        self.order.push_back(txid);
        if self.order.len() > RETIRED_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
    }

    fn contains(&self, txid: &Txid) -> bool {
        self.members.contains(txid)
    }

    fn forget(&mut self, txid: &Txid) {
        if self.members.remove(txid) {
            self.order.retain(|t| t != txid);
        }
    }
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch an address. Replaces any existing watch on the same address.
    pub async fn register_address(
        &self,
        address: Address,
        target: NotificationTarget,
        description: Option<String>,
        want_confirmations: u32,
    ) -> WatchId {
        let id = Uuid::new_v4();
        let watch = AddressWatch {
            id,
            address: address.clone(),
            target,
            want_confirmations,
            description,
        };
        let replaced = self
            .inner
            .addresses
            .lock()
            .await
            .insert(address.clone(), watch)
            .is_some();
        info!(%id, %address, want_confirmations, replaced, "Watching address");
        id
    }

    /// Watch a transaction given its hex txid. Replaces any existing watch on
    /// the same txid.
    pub async fn register_transaction(
        &self,
        txid: &str,
        target: NotificationTarget,
        description: Option<String>,
        want_confirmations: u32,
    ) -> Result<WatchId, RegistrationError> {
        let txid = Txid::from_str(txid.trim())
            .map_err(|_| RegistrationError::InvalidIdentifier(txid.to_string()))?;
        Ok(self
            .insert_transaction(txid, target, description, want_confirmations)
            .await)
    }

    /// Watch an identifier that is either an address valid on `network` or a txid.
    pub async fn register_identifier(
        &self,
        identifier: &str,
        network: Network,
        target: NotificationTarget,
        description: Option<String>,
        want_confirmations: u32,
    ) -> Result<(WatchId, WatchKind), RegistrationError> {
        let identifier = identifier.trim();
        if let Some(address) = parse_address(identifier, network) {
            let id = self
                .register_address(address, target, description, want_confirmations)
                .await;
            return Ok((id, WatchKind::Address));
        }
        let id = self
            .register_transaction(identifier, target, description, want_confirmations)
            .await?;
        Ok((id, WatchKind::Transaction))
    }

    async fn insert_transaction(
        &self,
        txid: Txid,
        target: NotificationTarget,
        description: Option<String>,
        want_confirmations: u32,
    ) -> WatchId {
        let id = Uuid::new_v4();
        let watch = TxWatch {
            id,
            txid,
            target,
            want_confirmations,
            confirmed_at_height: None,
            description,
            output: None,
        };
        let mut transactions = self.inner.transactions.lock().await;
        let replaced = transactions.insert(txid, watch).is_some();
        // An explicit registration may watch a txid that already fired
        self.inner.retired.lock().await.forget(&txid);
        drop(transactions);
        info!(%id, %txid, want_confirmations, replaced, "Watching transaction");
        id
    }

    pub async fn lookup_address(&self, address: &Address) -> Option<AddressWatch> {
        self.inner.addresses.lock().await.get(address).cloned()
    }

    pub async fn lookup_transaction(&self, txid: &Txid) -> Option<TxWatch> {
        self.inner.transactions.lock().await.get(txid).cloned()
    }

    /// Stop watching a transaction. Removing an absent txid is a no-op.
    pub async fn remove_transaction(&self, txid: &Txid) -> Option<TxWatch> {
        self.inner.transactions.lock().await.remove(txid)
    }

    /// Visit every transaction watch as of the moment of the call.
    ///
    /// The visitor runs on a snapshot, so it may call back into the registry.
    pub async fn for_each_transaction<F>(&self, mut visit: F)
    where
        F: FnMut(&TxWatch),
    {
        let snapshot: Vec<TxWatch> = self
            .inner
            .transactions
            .lock()
            .await
            .values()
            .cloned()
            .collect();
        snapshot.iter().for_each(&mut visit);
    }

    /// Insert a watch derived from a matched address output.
    ///
    /// A txid can be announced again (once from the mempool, once from its
    /// block). An existing confirmation height carries over to the new watch,
    /// and a txid whose watch already fired is not watched again. Returns
    /// whether the watch was stored.
    pub async fn watch_derived(&self, mut watch: TxWatch) -> bool {
        let mut transactions = self.inner.transactions.lock().await;
        if self.inner.retired.lock().await.contains(&watch.txid) {
            debug!(id = %watch.id, txid = %watch.txid, "Transaction already notified, ignoring");
            return false;
        }
        debug!(id = %watch.id, txid = %watch.txid, "Watching derived transaction");
        match transactions.entry(watch.txid) {
            Entry::Occupied(mut existing) => {
                if watch.confirmed_at_height.is_none() {
                    watch.confirmed_at_height = existing.get().confirmed_at_height;
                }
                existing.insert(watch);
            }
            Entry::Vacant(slot) => {
                slot.insert(watch);
            }
        }
        true
    }

    /// Record `height` as the confirming block of every watched txid in
    /// `txids` that has not been confirmed yet.
    ///
    /// Returns the txids that were newly confirmed.
    pub async fn mark_confirmed<I>(&self, txids: I, height: u64) -> Vec<Txid>
    where
        I: IntoIterator<Item = Txid>,
    {
        let mut transactions = self.inner.transactions.lock().await;
        if transactions.is_empty() {
            return Vec::new();
        }
        txids
            .into_iter()
            .filter(|txid| match transactions.get_mut(txid) {
                Some(watch) if watch.confirmed_at_height.is_none() => {
                    watch.confirmed_at_height = Some(height);
                    true
                }
                _ => false,
            })
            .collect()
    }

    /// Remove and return every watch that wants to hear about the transaction
    /// as soon as it is seen.
    pub async fn take_seen(&self) -> Vec<TxWatch> {
        self.take_where(|watch| watch.want_confirmations == 0).await
    }

    /// Remove and return every confirmed watch whose target depth is reached
    /// at `height`.
    pub async fn take_confirmed(&self, height: u64) -> Vec<TxWatch> {
        self.take_where(|watch| watch.target_height().is_some_and(|target| height >= target))
            .await
    }

    async fn take_where<P>(&self, mut due: P) -> Vec<TxWatch>
    where
        P: FnMut(&TxWatch) -> bool,
    {
        let mut transactions = self.inner.transactions.lock().await;
        let txids: Vec<Txid> = transactions
            .values()
            .filter(|watch| due(watch))
            .map(|watch| watch.txid)
            .collect();
        if txids.is_empty() {
            return Vec::new();
        }
        let mut retired = self.inner.retired.lock().await;
        txids
            .iter()
            .filter_map(|txid| {
                retired.insert(*txid);
                transactions.remove(txid)
            })
            .collect()
    }

    pub async fn address_count(&self) -> usize {
        self.inner.addresses.lock().await.len()
    }

    pub async fn transaction_count(&self) -> usize {
        self.inner.transactions.lock().await.len()
    }
}

/// Parse `identifier` as an address valid on `network`.
pub fn parse_address(identifier: &str, network: Network) -> Option<Address> {
    identifier
        .parse::<Address<NetworkUnchecked>>()
        .ok()?
        .require_network(network)
        .ok()
}
