use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// Moves an uploaded file from its temporary location to its destination.
#[cfg_attr(test, mockall::automock)]
pub trait Relocate: Send + Sync {
    /// # Errors
    ///
    /// Returns the underlying I/O error when the file can not be moved.
    fn relocate(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Renames any path it is given, copying then removing it when the rename crosses devices.
///
/// Fit for command-line contexts where the temporary file was not produced by a web server.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustedRelocate;

impl Relocate for TrustedRelocate {
    fn relocate(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                debug!(from = %from.display(), to = %to.display(), "rename crosses devices, copying");
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            Err(e) => Err(e),
        }
    }
}

/// Only relocates paths that were registered as genuine uploads.
///
/// The server side adapter registers every temporary file it received, so a forged descriptor
/// pointing at an arbitrary file is refused. A path can be relocated once.
#[derive(Debug, Default)]
pub struct UploadRegistry {
    uploads: Mutex<HashSet<PathBuf>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: Into<PathBuf>>(&self, path: P) {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner).insert(path.into());
    }

    pub fn is_upload(&self, path: &Path) -> bool {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner).contains(path)
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for UploadRegistry {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self { uploads: Mutex::new(iter.into_iter().map(Into::into).collect()) }
    }
}

impl Relocate for UploadRegistry {
    fn relocate(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut uploads = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
        if !uploads.contains(from) {
            warn!(path = %from.display(), "refusing to relocate a file that was not uploaded");
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not an uploaded file", from.display()),
            ));
        }

        TrustedRelocate.relocate(from, to)?;
        uploads.remove(from);
        Ok(())
    }
}
