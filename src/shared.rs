//! Thread-safe handle over a [`Ledger`].

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::Points;
use crate::ledger::{Ledger, LedgerError};
use crate::model::{Deduction, Payer, Seq};

/// A cloneable, shareable ledger.
///
/// Writers hold the lock for the whole operation, so adds and spends never
/// interleave. Readers share the lock.
#[derive(Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_points(
        &self,
        payer: &str,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<Seq, LedgerError> {
        self.write().add_points(payer, points, timestamp)
    }

    pub fn spend_points(&self, points: Points) -> Result<Vec<Deduction>, LedgerError> {
        self.write().spend_points(points)
    }

    pub fn balances(&self) -> BTreeMap<Payer, Points> {
        self.read().balances()
    }

    pub fn balance_of(&self, payer: &str) -> Points {
        self.read().balance_of(payer)
    }

    pub fn total(&self) -> Points {
        self.read().total()
    }

    // Ledger operations validate before mutating, a poisoned lock still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Ledger> for SharedLedger {
    fn from(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }
}
