//! Tracking and release of OS resources acquired during discovery.
//!
//! Every file opened while scanning a spec folder is handed to a
//! [`HandleLedger`]. The ledger releases each handle exactly once, keeps
//! going past failures, and reports the first failure with the offending
//! path. Handles still tracked when the ledger is dropped are released then.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{HistoryError, Result};

/// A resource that must be released explicitly.
pub trait Release: Send {
    /// Releases the resource, reporting any failure.
    fn release(self: Box<Self>) -> io::Result<()>;
}

impl Release for File {
    fn release(self: Box<Self>) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

struct TrackedHandle {
    path: PathBuf,
    handle: Box<dyn Release>,
}

/// Owns open resource handles until they are released.
///
/// # Examples
///
/// ```no_run
/// use spec_history_chain::HandleLedger;
///
/// let mut ledger = HandleLedger::new();
/// let file = std::fs::File::open("specs/pet.1_0_0.yaml").unwrap();
/// ledger.track("specs/pet.1_0_0.yaml", file);
/// assert_eq!(ledger.open_count(), 1);
///
/// ledger.release_all().unwrap();
/// assert_eq!(ledger.open_count(), 0);
/// ```
#[derive(Default)]
pub struct HandleLedger {
    open: Vec<TrackedHandle>,
    released: usize,
}

impl HandleLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `handle`, recording `path` for error reports.
    pub fn track(&mut self, path: impl AsRef<Path>, handle: impl Release + 'static) {
        self.open.push(TrackedHandle {
            path: path.as_ref().to_path_buf(),
            handle: Box::new(handle),
        });
    }

    /// Number of handles still held.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Number of handles released so far, including failed releases.
    pub fn released_count(&self) -> usize {
        self.released
    }

    /// Releases every tracked handle.
    ///
    /// All handles are attempted even when one fails; each is released at
    /// most once, so calling this again after it returns is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ResourceRelease`] for the first handle that
    /// failed to release.
    pub fn release_all(&mut self) -> Result<()> {
        let mut first_failure = None;

        for tracked in self.open.drain(..) {
            self.released += 1;
            match tracked.handle.release() {
                Ok(()) => debug!(path = %tracked.path.display(), "released file handle"),
                Err(source) => {
                    warn!(path = %tracked.path.display(), error = %source, "failed to release file handle");
                    if first_failure.is_none() {
                        first_failure = Some(HistoryError::ResourceRelease {
                            path: tracked.path,
                            source,
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for HandleLedger {
    fn drop(&mut self) {
        if !self.open.is_empty() {
            let _ = self.release_all();
        }
    }
}

impl std::fmt::Debug for HandleLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleLedger")
            .field("open", &self.open.iter().map(|t| &t.path).collect::<Vec<_>>())
            .field("released", &self.released)
            .finish()
    }
}
