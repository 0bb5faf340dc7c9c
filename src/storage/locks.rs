use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::WalletId;

/// Exclusive per-wallet locks.
///
/// Every balance mutation holds its wallet's lock for the whole unit of
/// work (load, compute, persist), which serializes same-wallet operations
/// while leaving different wallets fully concurrent. Without it, two
/// concurrent withdrawals could both pass the usable-balance check against
/// a stale read and overdraw the wallet.
#[derive(Debug)]
pub struct WalletLocks {
    inner: StdMutex<HashMap<WalletId, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl WalletLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: StdMutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Acquire the lock for one wallet, waiting at most the configured
    /// timeout. Returns None when the wait is exceeded; the caller surfaces
    /// that as a retryable failure.
    pub async fn acquire(&self, wallet_id: WalletId) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self.inner.lock().expect("wallet lock registry poisoned");
            Arc::clone(map.entry(wallet_id).or_default())
        };

        tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .ok()
    }
}
