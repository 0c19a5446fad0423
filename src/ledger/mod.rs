//! Points ledger.
//!
//! The ledger records point grants and clawbacks per payer in chronological
//! order and spends points oldest first, across payers, without letting any
//! payer balance go negative. Also supports an async stream of operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::Points;
use crate::model::{Deduction, Operation, Payer, Seq, Transaction};

mod history;
pub use history::{BalanceWindow, History};

mod state;
pub use state::Balances;

mod error;
pub use error::{AddError, ErrorKind, LedgerError, SpendError};

/// The points ledger.
///
/// Every operation validates completely before it mutates anything, so a
/// failed call leaves the ledger untouched.
#[derive(Debug, Default)]
pub struct Ledger {
    history: History,
    balances: Balances,
}

/// Public API
impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the ledger over the given operation stream.
    pub async fn run(&mut self, mut stream: impl Stream<Item = Operation> + Unpin) {
        while let Some(op) = stream.next().await {
            // a rejected operation is logged and must not stop the run
            let _ = self.apply(op);
        }
    }

    /// Apply a single operation on top of the current ledger state.
    pub fn apply(&mut self, op: Operation) -> Result<(), LedgerError> {
        match op {
            Operation::Add {
                payer,
                points,
                timestamp,
            } => {
                let result = self.add_points(&payer, points, timestamp);
                match &result {
                    Ok(seq) => {
                        info!(payer = %payer, points = %points, %timestamp, seq, "points added")
                    }
                    Err(e) => Self::log_rejection("add", e),
                }
                result?;
            }
            Operation::Spend { points } => {
                let result = self.spend_points(points);
                match &result {
                    Ok(deductions) => {
                        for d in deductions {
                            info!(payer = %d.payer, points = %d.magnitude(), "points spent");
                        }
                    }
                    Err(e) => Self::log_rejection("spend", e),
                }
                result?;
            }
            Operation::Balance => {
                for (payer, points) in self.balances() {
                    info!(payer = %payer, points = %points, "balance");
                }
                info!(total = %self.total(), "balance total");
            }
        }
        Ok(())
    }

    /// Record that `payer` contributed `points` at `timestamp`.
    ///
    /// `timestamp` may precede already recorded transactions. The payer's
    /// balance just before `timestamp`, and every running balance of the payer
    /// after it, must stay non-negative once `points` is applied.
    pub fn add_points(
        &mut self,
        payer: &str,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<Seq, LedgerError> {
        if payer.trim().is_empty() {
            return Err(AddError::EmptyPayer.into());
        }

        if self.balances.preview(payer, points).is_none() {
            return Err(AddError::Overflow(payer.to_owned()).into());
        }

        let overflow = || AddError::Overflow(payer.to_owned());
        let window = self
            .history
            .balance_window(payer, timestamp)
            .ok_or_else(overflow)?;
        let as_of = window.as_of.checked_add(points).ok_or_else(overflow)?;
        if as_of.is_negative() {
            return Err(AddError::InsufficientPayerBalance {
                payer: payer.to_owned(),
                balance: window.as_of,
                requested: points,
            }
            .into());
        }
        if points.is_negative() && (window.lowest + points).is_negative() {
            return Err(AddError::InsufficientPayerBalance {
                payer: payer.to_owned(),
                balance: window.lowest,
                requested: points,
            }
            .into());
        }
        // a grant lifts every later running balance of the payer
        if points.is_positive() {
            window.highest.checked_add(points).ok_or_else(overflow)?;
        }

        let seq = self.history.insert(payer.to_owned(), points, timestamp);
        self.balances.apply(payer, points);

        Ok(seq)
    }

    /// Spend `points`, stamping the deductions with the current time.
    pub fn spend_points(&mut self, points: Points) -> Result<Vec<Deduction>, LedgerError> {
        self.spend_points_at(points, Utc::now())
    }

    /// Spend `points`, oldest first across payers.
    ///
    /// Returns one deduction per payer (negative amounts), in the order the
    /// payers were first drawn from. The deduction entries are stamped with
    /// `now`, or with the latest recorded timestamp if that is later.
    pub fn spend_points_at(
        &mut self,
        points: Points,
        now: DateTime<Utc>,
    ) -> Result<Vec<Deduction>, LedgerError> {
        if !points.is_positive() {
            return Err(SpendError::NonPositive(points).into());
        }

        let available = self.balances.total();
        if available < points {
            return Err(SpendError::InsufficientTotalPoints {
                available,
                requested: points,
            }
            .into());
        }

        let plan = self.plan_spend(points)?;

        for &(index, take) in &plan.draws {
            self.history.consume(index, take);
        }

        let timestamp = self.history.latest().map_or(now, |latest| latest.max(now));
        for deduction in &plan.deductions {
            self.balances.apply(&deduction.payer, deduction.points);
            self.history
                .push_spend(deduction.payer.clone(), deduction.points, timestamp);
        }

        Ok(plan.deductions)
    }

    /// Current balance of every payer that ever recorded points.
    pub fn balances(&self) -> BTreeMap<Payer, Points> {
        self.balances.snapshot()
    }

    pub fn balance_of(&self, payer: &str) -> Points {
        self.balances.get(payer)
    }

    /// Payer balance from the transactions strictly before `timestamp`.
    ///
    /// `None` only if the running sum overflows, which `add_points` rules out.
    pub fn balance_as_of(&self, payer: &str, timestamp: DateTime<Utc>) -> Option<Points> {
        self.history.balance_as_of(payer, timestamp)
    }

    /// Grand total of all points currently held.
    pub fn total(&self) -> Points {
        self.balances.total()
    }

    /// Recorded transactions in chronological order.
    pub fn history(&self) -> &[Transaction] {
        self.history.entries()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Draws computed by the read-only pass of a spend.
struct SpendPlan {
    /// (history index, points taken from that entry)
    draws: Vec<(usize, Points)>,
    deductions: Vec<Deduction>,
}

/// Private API
impl Ledger {
    fn log_rejection(op: &str, e: &LedgerError) {
        match e.kind() {
            ErrorKind::InternalInconsistency => error!(reason = %e, "{op} aborted"),
            _ => warn!(reason = %e, "{op} rejected"),
        }
    }

    /// Walk the history oldest first and decide how much to take from each grant.
    ///
    /// A grant never yields more than its remaining capacity, nor more than
    /// what its payer still holds once earlier draws of this spend are counted.
    fn plan_spend(&self, points: Points) -> Result<SpendPlan, SpendError> {
        let mut needed = points;
        let mut draws = Vec::new();
        let mut deductions: Vec<Deduction> = Vec::new();
        // payer -> position in `deductions`
        let mut by_payer: BTreeMap<&str, usize> = BTreeMap::new();

        for (index, tx) in self.history.entries().iter().enumerate() {
            if !needed.is_positive() {
                break;
            }
            if !tx.is_spendable() {
                continue;
            }

            let deduction = by_payer.get(tx.payer.as_str()).copied();
            let already_taken = deduction.map_or(Points::ZERO, |i| deductions[i].points.abs());
            let held = self.balances.get(&tx.payer) - already_taken;
            if !held.is_positive() {
                continue;
            }

            let take = tx.remaining.min(held).min(needed);
            draws.push((index, take));
            needed -= take;
            match deduction {
                Some(i) => deductions[i].points -= take,
                None => {
                    by_payer.insert(&tx.payer, deductions.len());
                    deductions.push(Deduction {
                        payer: tx.payer.clone(),
                        points: -take,
                    });
                }
            }
        }

        if needed.is_positive() {
            return Err(SpendError::InternalInconsistency {
                requested: points,
                unaccounted: needed,
            });
        }

        Ok(SpendPlan { draws, deductions })
    }
}
