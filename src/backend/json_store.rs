use std::{fs, io::{self, Write}, path::{Path, PathBuf}};

use serde::{Serialize, Deserialize};

use crate::backend::interface::{Accounts, BackendError, Result, SnapshotStore};

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    accounts: Accounts
}

/// Stores the ledger as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf
}

impl JsonStore {
    pub const VERSION: u32 = 1;

    pub fn new(path: impl AsRef<Path>) -> JsonStore {
        JsonStore { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> BackendError {
        BackendError::Io { path: self.path.clone(), source }
    }

    fn sibling(&self, suffix: &str) -> io::Result<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "snapshot path has no file name")
        })?;
        Ok(self.path.with_file_name(format!("{}.{}", file_name.to_string_lossy(), suffix)))
    }

    /// Writes next to the target and renames over it, so a crash mid-write
    /// leaves the previous snapshot in place.
    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let tmp_path = self.sibling("tmp")?;
        let written = JsonStore::write_file(&tmp_path, bytes)
            .and_then(|_| fs::rename(&tmp_path, &self.path));

        if written.is_err() {
            match fs::remove_file(&tmp_path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => {
                    log::warn!("failed to remove {}: {}", tmp_path.display(), err);
                },
                _ => ()
            }
        }
        return written;
    }

    fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(bytes)?;
        file.write_all(b"\n")?;
        file.sync_all()
    }
}

impl SnapshotStore for JsonStore {
    fn load(&self) -> Result<Accounts> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("no snapshot at {}, starting fresh", self.path.display());
                return Ok(Accounts::new());
            },
            Err(err) => return Err(self.io_error(err))
        };

        let snapshot: SnapshotFile = serde_json::from_slice(&bytes)
            .map_err(|source| BackendError::Format { path: self.path.clone(), source })?;
        if snapshot.version != Self::VERSION {
            return Err(BackendError::Version { found: snapshot.version, expected: Self::VERSION });
        }

        log::info!("loaded {} accounts from {}", snapshot.accounts.len(), self.path.display());
        return Ok(snapshot.accounts);
    }

    fn save(&self, accounts: &Accounts) -> Result<()> {
        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            version: u32,
            accounts: &'a Accounts
        }

        let bytes = serde_json::to_vec_pretty(&SnapshotRef { version: Self::VERSION, accounts })
            .map_err(|source| BackendError::Format { path: self.path.clone(), source })?;
        self.write_atomic(&bytes).map_err(|err| self.io_error(err))?;

        log::debug!("saved {} accounts to {}", accounts.len(), self.path.display());
        return Ok(());
    }

    /// Renames the snapshot to `<file>.corrupt`, or `<file>.corrupt.<n>` when
    /// earlier ones are still around.
    fn set_aside(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut target = self.sibling("corrupt").map_err(|err| self.io_error(err))?;
        let mut attempt = 1;
        while target.exists() {
            target = self.sibling(&format!("corrupt.{}", attempt)).map_err(|err| self.io_error(err))?;
            attempt += 1;
        }

        fs::rename(&self.path, &target).map_err(|err| self.io_error(err))?;
        return Ok(Some(target));
    }
}
