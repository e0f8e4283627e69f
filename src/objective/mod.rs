pub mod ledger;

pub use ledger::{ObjectiveLedger, HISTORY_LIMIT};
