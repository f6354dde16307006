//! Transaction handlers.

mod reconcile_transaction;

pub use reconcile_transaction::{ReconcileOutcome, TransactionReconciler};
