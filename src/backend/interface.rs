use std::collections::BTreeMap;
use std::{io, path::PathBuf};

use thiserror::Error;

use crate::core::account::{Account, UserName};

/// The full account set, keyed by username.
pub type Accounts = BTreeMap<UserName, Account>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to access snapshot {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error
    },
    #[error("corrupt snapshot {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error
    },
    #[error("unsupported snapshot version {found}, expected {expected}")]
    Version {
        found: u32,
        expected: u32
    },
    /// The snapshot parsed but breaks a ledger invariant.
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String)
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Full-snapshot persistence for a ledger. Stateless apart from where it stores data.
pub trait SnapshotStore {
    /// A missing snapshot yields an empty account set.
    fn load(&self) -> Result<Accounts>;
    /// Replaces the stored snapshot with the given account set.
    fn save(&self, accounts: &Accounts) -> Result<()>;
    /// Moves an unreadable snapshot out of the way so the next save does not
    /// replace it. Returns where it went, if anywhere.
    fn set_aside(&self) -> Result<Option<PathBuf>> {
        return Ok(None);
    }
}
