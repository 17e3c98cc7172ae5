//! Credit accounting.
//!
//! Credits are granted in batches (purchases, subscription allotments,
//! manual grants, refunds) that may expire. Consumption debits the batches
//! that expire soonest first. Every movement is recorded in a transaction
//! log.

mod ledger;
mod types;

pub use ledger::CreditLedger;
pub use types::{AddCredits, CreditTransaction, CreditTransactionKind};
