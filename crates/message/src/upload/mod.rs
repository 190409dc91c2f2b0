//! Uploaded files and their move-once lifecycle.
//!
//! An [`UploadedFile`] is backed either by a temporary file path or by a [`Stream`]. It can be
//! moved to its final destination exactly once; afterwards every access fails with
//! [`MessageError::AlreadyMoved`]. Uploads that did not complete carry their
//! [`UploadStatus`] and refuse any access to their content.
//!
//! Clones share the moved flag, so moving one clone moves them all. Like [`Stream`], an
//! uploaded file should only be driven from one place at a time.

mod normalize;
mod relocate;
mod status;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, info};

pub use normalize::normalize_files;
pub use relocate::{Relocate, TrustedRelocate, UploadRegistry};
pub use status::UploadStatus;

#[cfg(test)]
pub(crate) use relocate::MockRelocate;

use crate::error::{MessageError, Result};
use crate::stream::{Resource, Stream};
use crate::utils::ensure;

/// Chunk size used when copying a stream backed upload to its destination.
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

/// Where the content of an upload lives.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Path(PathBuf),
    Stream(Stream),
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for UploadSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for UploadSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for UploadSource {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Stream> for UploadSource {
    fn from(stream: Stream) -> Self {
        Self::Stream(stream)
    }
}

impl From<Resource> for UploadSource {
    fn from(resource: Resource) -> Self {
        Self::Stream(Stream::new(resource))
    }
}

#[derive(Debug, Default)]
struct MoveState {
    moved: bool,
    opened: Option<Stream>,
}

/// A file received through a multipart form.
#[derive(Clone)]
pub struct UploadedFile {
    source: UploadSource,
    size: Option<u64>,
    status: UploadStatus,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    relocate: Arc<dyn Relocate>,
    state: Arc<Mutex<MoveState>>,
}

impl UploadedFile {
    /// Builds an upload relocated by [`TrustedRelocate`].
    ///
    /// The source is only checked when `status` is [`UploadStatus::Ok`].
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] for an empty path on a completed upload.
    pub fn new<S: Into<UploadSource>>(
        source: S,
        size: Option<u64>,
        status: UploadStatus,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Result<Self> {
        let source = source.into();
        if status.is_ok() {
            if let UploadSource::Path(path) = &source {
                ensure!(
                    !path.as_os_str().is_empty(),
                    MessageError::invalid_argument("invalid stream or file provided for uploaded file")
                );
            }
        }

        Ok(Self {
            source,
            size,
            status,
            client_filename,
            client_media_type,
            relocate: Arc::new(TrustedRelocate),
            state: Arc::new(Mutex::new(MoveState::default())),
        })
    }

    /// Replaces the strategy used to move a path backed upload.
    #[must_use]
    pub fn relocated_by(mut self, relocate: Arc<dyn Relocate>) -> Self {
        self.relocate = relocate;
        self
    }

    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[inline]
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// The file name sent by the client. Never trust it.
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    /// The media type sent by the client. Never trust it.
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    pub fn is_moved(&self) -> bool {
        self.state().moved
    }

    fn state(&self) -> MutexGuard<'_, MoveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn validate_active(&self, state: &MoveState) -> Result<()> {
        ensure!(self.status.is_ok(), MessageError::UploadError { status: self.status });
        ensure!(!state.moved, MessageError::AlreadyMoved);
        Ok(())
    }

    /// Returns the content of the upload, opening a path backed upload on first access.
    ///
    /// # Errors
    ///
    /// Fails with [`MessageError::UploadError`] for an incomplete upload,
    /// [`MessageError::AlreadyMoved`] after a move and [`MessageError::Io`] when the file can
    /// not be opened.
    pub fn stream(&self) -> Result<Stream> {
        let mut state = self.state();
        self.validate_active(&state)?;

        match &self.source {
            UploadSource::Stream(stream) => Ok(stream.clone()),
            UploadSource::Path(path) => {
                if let Some(stream) = &state.opened {
                    return Ok(stream.clone());
                }
                let stream = Stream::from_path(path, "r")?;
                state.opened = Some(stream.clone());
                Ok(stream)
            }
        }
    }

    /// Moves the upload to `target`. Succeeds at most once.
    ///
    /// # Errors
    ///
    /// Fails with [`MessageError::UploadError`], [`MessageError::AlreadyMoved`],
    /// [`MessageError::InvalidArgument`] for an empty target, or [`MessageError::Io`] when the
    /// move itself fails. A failed move can be retried.
    pub fn move_to<P: AsRef<Path>>(&self, target: P) -> Result<()> {
        let target = target.as_ref();
        let mut state = self.state();
        self.validate_active(&state)?;
        ensure!(
            !target.as_os_str().is_empty(),
            MessageError::invalid_argument("invalid path provided for move operation; must be a non-empty path")
        );

        match &self.source {
            UploadSource::Path(path) => {
                if let Some(opened) = state.opened.take() {
                    opened.close();
                }
                self.relocate.relocate(path, target).map_err(|e| {
                    MessageError::io(format!("uploaded file could not be moved to {}", target.display()), e)
                })?;
            }
            UploadSource::Stream(stream) => copy_stream(stream, target)?,
        }

        state.moved = true;
        info!(destination = %target.display(), "uploaded file moved");
        Ok(())
    }
}

fn copy_stream(source: &Stream, target: &Path) -> Result<()> {
    if source.is_seekable() {
        source.rewind()?;
    }

    let dest = Stream::from_path(target, "w")?;
    let copied = copy_into(source, &dest)?;
    dest.close();

    debug!(copied, destination = %target.display(), "copied uploaded stream");
    Ok(())
}

/// Copies `source` from its position to the end, chunk by chunk. Every chunk is written out
/// completely; a destination that stops accepting bytes fails the copy.
fn copy_into(source: &Stream, dest: &Stream) -> Result<usize> {
    let mut copied = 0;
    while !source.eof() {
        let chunk = source.read(COPY_CHUNK_SIZE)?;
        let mut rest = &chunk[..];
        while !rest.is_empty() {
            let written = dest.write(rest)?;
            ensure!(
                written > 0,
                MessageError::io(
                    format!("destination accepted {copied} bytes, then stopped"),
                    io::Error::from(io::ErrorKind::WriteZero)
                )
            );
            rest = &rest[written..];
            copied += written;
        }
    }
    Ok(copied)
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("source", &self.source)
            .field("size", &self.size)
            .field("status", &self.status)
            .field("client_filename", &self.client_filename)
            .field("client_media_type", &self.client_media_type)
            .field("moved", &self.is_moved())
            .finish_non_exhaustive()
    }
}

/// A node of the uploaded files tree, shaped like the form field names.
#[derive(Debug, Clone)]
pub enum UploadedNode {
    File(UploadedFile),
    List(Vec<UploadedNode>),
    Map(IndexMap<String, UploadedNode>),
}

impl UploadedNode {
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Looks up a child by key, list children by their index.
    pub fn get(&self, key: &str) -> Option<&UploadedNode> {
        match self {
            Self::File(_) => None,
            Self::List(list) => key.parse::<usize>().ok().and_then(|index| list.get(index)),
            Self::Map(map) => map.get(key),
        }
    }

    /// Every file below this node, depth first.
    pub fn files(&self) -> Vec<&UploadedFile> {
        let mut files = Vec::new();
        self.collect(&mut files);
        files
    }

    fn collect<'a>(&'a self, files: &mut Vec<&'a UploadedFile>) {
        match self {
            Self::File(file) => files.push(file),
            Self::List(list) => list.iter().for_each(|node| node.collect(files)),
            Self::Map(map) => map.values().for_each(|node| node.collect(files)),
        }
    }
}

impl From<UploadedFile> for UploadedNode {
    fn from(file: UploadedFile) -> Self {
        Self::File(file)
    }
}
