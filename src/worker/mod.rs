pub mod reconciliation;

pub use reconciliation::{ReconciliationWorker, WorkerConfig};
