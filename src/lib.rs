pub mod csv;
pub mod ledger;
pub mod model;
pub mod points;
pub mod shared;

pub use ledger::{ErrorKind, Ledger, LedgerError};
pub use model::{Deduction, Operation, Payer, Transaction};
pub use points::Points;
pub use shared::SharedLedger;
