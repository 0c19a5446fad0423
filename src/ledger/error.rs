//! Error types for ledger operations.

use thiserror::Error;

use crate::Points;
use crate::model::Payer;

/// Top-level error returned by the [`Ledger`](super::Ledger) operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("add points failed: {0}")]
    Add(#[from] AddError),

    #[error("spend points failed: {0}")]
    Spend(#[from] SpendError),
}

/// Error while recording points for a payer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddError {
    #[error("payer must not be empty")]
    EmptyPayer,
    #[error("payer {0} balance would overflow")]
    Overflow(Payer),
    #[error("insufficient balance for payer {payer}: balance {balance}, requested {requested}")]
    InsufficientPayerBalance {
        payer: Payer,
        balance: Points,
        requested: Points,
    },
}

/// Error while spending points.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpendError {
    #[error("points to spend must be positive, got {0}")]
    NonPositive(Points),
    #[error("not enough points: available {available}, requested {requested}")]
    InsufficientTotalPoints { available: Points, requested: Points },
    #[error("ledger inconsistency: {unaccounted} of {requested} points could not be located")]
    InternalInconsistency {
        requested: Points,
        unaccounted: Points,
    },
}

/// Coarse classification of a [`LedgerError`], for callers that map failures to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InsufficientPayerBalance,
    InsufficientTotalPoints,
    InternalInconsistency,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Add(AddError::EmptyPayer | AddError::Overflow(_)) => {
                ErrorKind::InvalidInput
            }
            LedgerError::Add(AddError::InsufficientPayerBalance { .. }) => {
                ErrorKind::InsufficientPayerBalance
            }
            LedgerError::Spend(SpendError::NonPositive(_)) => ErrorKind::InvalidInput,
            LedgerError::Spend(SpendError::InsufficientTotalPoints { .. }) => {
                ErrorKind::InsufficientTotalPoints
            }
            LedgerError::Spend(SpendError::InternalInconsistency { .. }) => {
                ErrorKind::InternalInconsistency
            }
        }
    }
}
