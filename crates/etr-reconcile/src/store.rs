//! Aggregate persistence seam.
//!
//! Each reconciliation runs inside one [`AggregateTxn`]: read the company,
//! stage the mutated copy, commit. Transactions on the same TIN are
//! serialized by the store; dropping a transaction without committing
//! discards what was staged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::model::{Company, Tin};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("stored aggregate for tin={tin} is corrupt: {reason}")]
    Corrupt { tin: String, reason: String },

    #[error("transaction for tin={expected} cannot write tin={got}")]
    TinMismatch { expected: String, got: String },
}

#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Open a transaction scoped to `tin`. Waits while another transaction
    /// on the same TIN is open.
    async fn begin(&self, tin: &Tin) -> Result<Box<dyn AggregateTxn>, StoreError>;
}

#[async_trait]
pub trait AggregateTxn: Send {
    /// The company as seen by this transaction (staged write wins).
    async fn get(&mut self) -> Result<Option<Company>, StoreError>;

    /// Stage `company` for commit. Must carry the transaction's TIN.
    async fn put(&mut self, company: &Company) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// In-process store. Used by tests and by the daemon when no database is
/// configured.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    companies: Mutex<HashMap<Tin, Company>>,
    locks: Mutex<HashMap<Tin, Arc<AsyncMutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed company, bypassing transactions.
    pub fn insert(&self, company: Company) -> Result<(), StoreError> {
        let mut map = self.inner.companies.lock().map_err(poisoned)?;
        map.insert(company.tin.clone(), company);
        Ok(())
    }

    pub fn get_committed(&self, tin: &Tin) -> Result<Option<Company>, StoreError> {
        let map = self.inner.companies.lock().map_err(poisoned)?;
        Ok(map.get(tin).cloned())
    }

    pub fn len(&self) -> usize {
        self.inner
            .companies
            .lock()
            .map(|m| m.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tin_lock(&self, tin: &Tin) -> Result<Arc<AsyncMutex<()>>, StoreError> {
        let mut locks = self.inner.locks.lock().map_err(poisoned)?;
        Ok(locks
            .entry(tin.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn begin(&self, tin: &Tin) -> Result<Box<dyn AggregateTxn>, StoreError> {
        let guard = self.tin_lock(tin)?.lock_owned().await;
        Ok(Box::new(MemoryTxn {
            store: self.clone(),
            tin: tin.clone(),
            staged: None,
            _guard: guard,
        }))
    }
}

struct MemoryTxn {
    store: MemoryStore,
    tin: Tin,
    staged: Option<Company>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl AggregateTxn for MemoryTxn {
    async fn get(&mut self) -> Result<Option<Company>, StoreError> {
        if let Some(c) = &self.staged {
            return Ok(Some(c.clone()));
        }
        self.store.get_committed(&self.tin)
    }

    async fn put(&mut self, company: &Company) -> Result<(), StoreError> {
        if company.tin != self.tin {
            return Err(StoreError::TinMismatch {
                expected: self.tin.to_string(),
                got: company.tin.to_string(),
            });
        }
        self.staged = Some(company.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut txn = self;
        if let Some(company) = txn.staged.take() {
            txn.store.insert(company)?;
        }
        Ok(())
    }
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        // The guard still holds its clone here, so 2 means no other
        // transaction holds or waits on this TIN's lock.
        if let Ok(mut locks) = self.store.inner.locks.lock() {
            if locks.get(&self.tin).is_some_and(|l| Arc::strong_count(l) <= 2) {
                locks.remove(&self.tin);
            }
        }
    }
}
