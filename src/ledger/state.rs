use std::collections::BTreeMap;

use crate::Points;
use crate::model::Payer;

/// Current per-payer balances and their running grand total.
#[derive(Debug, Default, Clone)]
pub struct Balances {
    by_payer: BTreeMap<Payer, Points>,
    total: Points,
}

impl Balances {
    pub fn get(&self, payer: &str) -> Points {
        self.by_payer.get(payer).copied().unwrap_or_default()
    }

    pub fn total(&self) -> Points {
        self.total
    }

    pub fn snapshot(&self) -> BTreeMap<Payer, Points> {
        self.by_payer.clone()
    }

    /// Balance and total after applying `points` to `payer`, or `None` on overflow.
    pub fn preview(&self, payer: &str, points: Points) -> Option<(Points, Points)> {
        Some((
            self.get(payer).checked_add(points)?,
            self.total.checked_add(points)?,
        ))
    }

    /// Apply a signed movement to a payer. Callers validate beforehand.
    pub fn apply(&mut self, payer: &str, points: Points) {
        match self.by_payer.get_mut(payer) {
            Some(balance) => *balance += points,
            None => {
                self.by_payer.insert(payer.to_owned(), points);
            }
        }
        self.total += points;
    }
}
