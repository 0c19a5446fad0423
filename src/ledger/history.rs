//! Chronological transaction log.
//!
//! Entries are kept sorted by timestamp. Entries sharing a timestamp stay in
//! arrival order, so an insert lands after every entry with an equal or
//! earlier timestamp.

use chrono::{DateTime, Utc};

use crate::Points;
use crate::model::{Payer, Seq, Transaction};

/// A payer's running balances around an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceWindow {
    /// Sum of the payer's entries strictly before the instant.
    pub as_of: Points,
    /// Lowest running balance of the payer from the insertion point of the
    /// instant onwards, down to the current balance.
    pub lowest: Points,
    /// Highest running balance over the same range as `lowest`.
    pub highest: Points,
}

#[derive(Debug, Default)]
pub struct History {
    entries: Vec<Transaction>,
    next_seq: Seq,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    /// Timestamp of the chronologically last entry.
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.entries.last().map(|tx| tx.timestamp)
    }

    /// Record an added transaction at its chronological position.
    pub fn insert(&mut self, payer: Payer, points: Points, timestamp: DateTime<Utc>) -> Seq {
        let seq = self.take_seq();
        let pos = self.entries.partition_point(|tx| tx.timestamp <= timestamp);
        self.entries
            .insert(pos, Transaction::added(seq, payer, points, timestamp));
        seq
    }

    /// Record a spend deduction. `timestamp` must not precede [`History::latest`].
    pub fn push_spend(&mut self, payer: Payer, points: Points, timestamp: DateTime<Utc>) -> Seq {
        debug_assert!(self.latest().is_none_or(|latest| latest <= timestamp));
        let seq = self.take_seq();
        self.entries
            .push(Transaction::spend(seq, payer, points, timestamp));
        seq
    }

    /// Draw `points` from the remaining capacity of the entry at `index`.
    pub fn consume(&mut self, index: usize, points: Points) {
        self.entries[index].remaining -= points;
    }

    /// Sum of the payer's entries strictly before `timestamp`, `None` on overflow.
    pub fn balance_as_of(&self, payer: &str, timestamp: DateTime<Utc>) -> Option<Points> {
        self.entries
            .iter()
            .take_while(|tx| tx.timestamp < timestamp)
            .filter(|tx| tx.payer == payer)
            .try_fold(Points::ZERO, |acc, tx| acc.checked_add(tx.points))
    }

    /// Running balances of `payer` around the position an entry stamped
    /// `timestamp` would be inserted at. `None` on overflow.
    ///
    /// `as_of` stops before entries sharing the timestamp. The `lowest` and
    /// `highest` range starts after them, where [`History::insert`] puts the
    /// new entry.
    pub fn balance_window(&self, payer: &str, timestamp: DateTime<Utc>) -> Option<BalanceWindow> {
        let mut running = Points::ZERO;
        let mut as_of = None;
        let mut range: Option<(Points, Points)> = None;

        for tx in &self.entries {
            if as_of.is_none() && tx.timestamp >= timestamp {
                as_of = Some(running);
            }
            if range.is_none() && tx.timestamp > timestamp {
                range = Some((running, running));
            }
            if tx.payer != payer {
                continue;
            }
            running = running.checked_add(tx.points)?;
            if let Some((lowest, highest)) = range.as_mut() {
                *lowest = (*lowest).min(running);
                *highest = (*highest).max(running);
            }
        }

        // entries up to the insertion point make up the whole history
        let (lowest, highest) = range.unwrap_or((running, running));
        Some(BalanceWindow {
            as_of: as_of.unwrap_or(running),
            lowest,
            highest,
        })
    }

    fn take_seq(&mut self) -> Seq {
        self.next_seq += 1;
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn payers(history: &History) -> Vec<&str> {
        history.entries().iter().map(|tx| tx.payer.as_str()).collect()
    }

    #[test]
    fn new_history_is_empty() {
        let history = History::default();
        assert!(history.is_empty());
        assert_eq!(history.latest(), None);
    }

    #[test]
    fn insert_keeps_timestamp_order() {
        let mut history = History::default();
        history.insert("B".into(), Points::new(200), at(2));
        history.insert("C".into(), Points::new(300), at(3));
        history.insert("A".into(), Points::new(100), at(1));

        assert_eq!(payers(&history), ["A", "B", "C"]);
        assert_eq!(history.latest(), Some(at(3)));
    }

    #[test]
    fn equal_timestamps_stay_in_arrival_order() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(1), at(5));
        history.insert("B".into(), Points::new(1), at(5));
        history.insert("Z".into(), Points::new(1), at(1));
        history.insert("C".into(), Points::new(1), at(5));

        assert_eq!(payers(&history), ["Z", "A", "B", "C"]);
    }

    #[test]
    fn seq_follows_arrival_not_position() {
        let mut history = History::default();
        let first = history.insert("A".into(), Points::new(1), at(5));
        let second = history.insert("B".into(), Points::new(1), at(1));

        assert!(first < second);
        assert_eq!(history.entries()[0].seq, second);
        assert_eq!(history.entries()[1].seq, first);
    }

    #[test]
    fn balance_as_of_excludes_the_instant_itself() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(50), at(1));
        history.insert("A".into(), Points::new(-50), at(5));
        history.insert("B".into(), Points::new(70), at(2));

        assert_eq!(history.balance_as_of("A", at(1)), Some(Points::ZERO));
        assert_eq!(history.balance_as_of("A", at(3)), Some(Points::new(50)));
        assert_eq!(history.balance_as_of("A", at(5)), Some(Points::new(50)));
        assert_eq!(history.balance_as_of("A", at(6)), Some(Points::ZERO));
        assert_eq!(history.balance_as_of("B", at(6)), Some(Points::new(70)));
    }

    #[test]
    fn balance_window_tracks_lowest_later_balance() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(100), at(1));
        history.insert("A".into(), Points::new(-80), at(5));
        history.insert("A".into(), Points::new(30), at(7));

        let window = history.balance_window("A", at(3)).unwrap();
        assert_eq!(window.as_of, Points::new(100));
        assert_eq!(window.lowest, Points::new(20));
        assert_eq!(window.highest, Points::new(100));

        let window = history.balance_window("A", at(9)).unwrap();
        assert_eq!(window.as_of, Points::new(50));
        assert_eq!(window.lowest, Points::new(50));
        assert_eq!(window.highest, Points::new(50));
    }

    #[test]
    fn balance_window_range_starts_after_equal_timestamps() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(100), at(1));
        history.insert("A".into(), Points::new(-100), at(5));
        history.insert("A".into(), Points::new(100), at(5));

        let window = history.balance_window("A", at(5)).unwrap();
        assert_eq!(window.as_of, Points::new(100));
        assert_eq!(window.lowest, Points::new(100));
        assert_eq!(window.highest, Points::new(100));
    }

    #[test]
    fn balance_window_for_unknown_payer_is_zero() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(100), at(1));

        let window = history.balance_window("B", at(0)).unwrap();
        assert_eq!(window.as_of, Points::ZERO);
        assert_eq!(window.lowest, Points::ZERO);
        assert_eq!(window.highest, Points::ZERO);
    }

    #[test]
    fn running_sums_report_overflow() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(i64::MAX), at(2));
        history.insert("A".into(), Points::new(1), at(3));

        assert_eq!(history.balance_window("A", at(1)), None);
        assert_eq!(history.balance_as_of("A", at(5)), None);
        assert_eq!(history.balance_as_of("A", at(3)), Some(Points::new(i64::MAX)));
    }

    #[test]
    fn push_spend_appends_and_consume_draws_capacity() {
        let mut history = History::default();
        history.insert("A".into(), Points::new(100), at(1));
        history.consume(0, Points::new(40));
        history.push_spend("A".into(), Points::new(-40), at(2));

        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.entries()[0].remaining, Points::new(60));
        assert!(!history.entries()[1].is_spendable());
    }
}
