//! Core domain types for the points ledger.

use chrono::{DateTime, Utc};

use crate::Points;

/// Payer identifier (a brand or partner the points come from).
pub type Payer = String;

/// Arrival number assigned by the ledger to every recorded transaction.
pub type Seq = u64;

/// Origin of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Points granted by a payer (non-negative add).
    Grant,
    /// Points withdrawn by a payer (negative add).
    Clawback,
    /// Synthetic deduction recorded by a spend.
    Spend,
}

/// A single point movement in the ledger history.
///
/// Everything but `remaining` is fixed at creation. `remaining` is the part of
/// a grant that has not been consumed by spends yet; it is always zero for
/// clawbacks and spend entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub seq: Seq,
    pub payer: Payer,
    pub points: Points,
    pub timestamp: DateTime<Utc>,
    pub kind: TransactionKind,
    pub remaining: Points,
}

impl Transaction {
    /// Create a transaction recorded through `add_points`.
    pub fn added(seq: Seq, payer: Payer, points: Points, timestamp: DateTime<Utc>) -> Self {
        let (kind, remaining) = if points.is_negative() {
            (TransactionKind::Clawback, Points::ZERO)
        } else {
            (TransactionKind::Grant, points)
        };
        Self {
            seq,
            payer,
            points,
            timestamp,
            kind,
            remaining,
        }
    }

    /// Create the synthetic entry recording a spend deduction (`points` < 0).
    pub fn spend(seq: Seq, payer: Payer, points: Points, timestamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            payer,
            points,
            timestamp,
            kind: TransactionKind::Spend,
            remaining: Points::ZERO,
        }
    }

    /// Whether a spend can still draw points from this entry.
    pub fn is_spendable(&self) -> bool {
        self.kind == TransactionKind::Grant && self.remaining.is_positive()
    }
}

/// Points taken from one payer by a single spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduction {
    pub payer: Payer,
    /// Stored as a negative ledger amount.
    pub points: Points,
}

impl Deduction {
    /// The deducted amount as a positive number, the way callers report it.
    pub fn magnitude(&self) -> Points {
        self.points.abs()
    }
}

/// An operation fed to [`Ledger::run`](crate::Ledger::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Record points contributed by a payer at a point in time.
    Add {
        payer: Payer,
        points: Points,
        timestamp: DateTime<Utc>,
    },
    /// Spend points, oldest first.
    Spend { points: Points },
    /// Report the current balances.
    Balance,
}
