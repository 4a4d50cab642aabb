use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use crate::backend::interface::{Accounts, BackendError, Result, SnapshotStore};

/// Keeps the snapshot in memory. Useful for tests and for ledgers that
/// do not need to outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Accounts>,
    saves: AtomicUsize,
    failing: AtomicBool
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn with_accounts(accounts: Accounts) -> MemoryStore {
        MemoryStore { snapshot: Mutex::new(accounts), ..MemoryStore::default() }
    }

    /// Copy of the last saved snapshot.
    pub fn snapshot(&self) -> Accounts {
        self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every following save fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Accounts> {
        return Ok(self.snapshot());
    }

    fn save(&self, accounts: &Accounts) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("memory store set to fail".to_owned()));
        }
        *self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = accounts.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        return Ok(());
    }
}
