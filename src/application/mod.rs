// Application layer - use cases and orchestration.
// The CLI drives WalletService; the service owns the ledger rules and the
// per-wallet locking discipline, and treats storage and metrics as
// collaborators.

pub mod error;
pub mod metrics;
pub mod service;

pub use error::*;
pub use metrics::*;
pub use service::*;
