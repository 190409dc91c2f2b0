use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::SpooledTempFile;

use super::OpenMode;
use crate::error::{MessageError, Result};

/// A raw byte resource owned by a [`Stream`](super::Stream).
///
/// Memory and spooled resources are always readable, writable and seekable. Files take their
/// capabilities from the mode they were opened with, while readers and writers are one-way
/// and never seekable.
pub enum Resource {
    Memory(Cursor<Vec<u8>>),
    Spooled(SpooledTempFile),
    File { file: File, mode: OpenMode, path: Option<PathBuf> },
    Reader(Box<dyn Read + Send>),
    Writer(Box<dyn Write + Send>),
}

impl Resource {
    pub fn memory(bytes: Vec<u8>) -> Self {
        Self::Memory(Cursor::new(bytes))
    }

    /// Opens `path` with a `fopen` style `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] for an empty path or an invalid mode and
    /// [`MessageError::Io`] when the file can not be opened.
    pub fn open<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(MessageError::invalid_argument("path cannot be empty"));
        }
        let mode = OpenMode::parse(mode)?;

        let file = mode
            .open_options()
            .open(path)
            .map_err(|e| MessageError::io(format!("the file {} cannot be opened", path.display()), e))?;
        Ok(Self::File { file, mode, path: Some(path.to_path_buf()) })
    }

    /// Wraps an already opened file, `mode` describes how it was opened.
    pub fn file(file: File, mode: OpenMode) -> Self {
        Self::File { file, mode, path: None }
    }

    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        Self::Reader(Box::new(reader))
    }

    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::Writer(Box::new(writer))
    }

    /// Spools `bytes` into a temporary file once they reach `threshold`.
    pub(crate) fn spooled(bytes: &[u8], threshold: usize) -> io::Result<Self> {
        let mut spooled = SpooledTempFile::new(threshold);
        spooled.write_all(bytes)?;
        if bytes.len() >= threshold {
            spooled.roll()?;
        }
        spooled.rewind()?;
        Ok(Self::Spooled(spooled))
    }

    pub fn mode(&self) -> OpenMode {
        match self {
            Self::Memory(_) | Self::Spooled(_) => OpenMode::internal("w+b"),
            Self::File { mode, .. } => mode.clone(),
            Self::Reader(_) => OpenMode::internal("rb"),
            Self::Writer(_) => OpenMode::internal("wb"),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn is_seekable(&mut self) -> bool {
        match self {
            Self::Memory(_) | Self::Spooled(_) => true,
            Self::File { file, .. } => file.metadata().is_ok_and(|meta| meta.is_file()) && file.stream_position().is_ok(),
            Self::Reader(_) | Self::Writer(_) => false,
        }
    }

    /// Size of the underlying data if it can be known without consuming it.
    pub(crate) fn size(&mut self) -> Option<u64> {
        match self {
            Self::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            Self::Spooled(spooled) => {
                let position = spooled.stream_position().ok()?;
                let end = spooled.seek(SeekFrom::End(0)).ok()?;
                spooled.seek(SeekFrom::Start(position)).ok()?;
                Some(end)
            }
            Self::File { file, .. } => file.metadata().ok().map(|meta| meta.len()),
            Self::Reader(_) | Self::Writer(_) => None,
        }
    }
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::Spooled(spooled) => spooled.read(buf),
            Self::File { file, .. } => file.read(buf),
            Self::Reader(reader) => reader.read(buf),
            Self::Writer(_) => Err(io::Error::new(io::ErrorKind::Unsupported, "resource is write only")),
        }
    }
}

impl Write for Resource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.write(buf),
            Self::Spooled(spooled) => spooled.write(buf),
            Self::File { file, .. } => file.write(buf),
            Self::Writer(writer) => writer.write(buf),
            Self::Reader(_) => Err(io::Error::new(io::ErrorKind::Unsupported, "resource is read only")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Memory(cursor) => cursor.flush(),
            Self::Spooled(spooled) => spooled.flush(),
            Self::File { file, .. } => file.flush(),
            Self::Writer(writer) => writer.flush(),
            Self::Reader(_) => Ok(()),
        }
    }
}

impl Seek for Resource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::Spooled(spooled) => spooled.seek(pos),
            Self::File { file, .. } => file.seek(pos),
            Self::Reader(_) | Self::Writer(_) => {
                Err(io::Error::new(io::ErrorKind::Unsupported, "resource is not seekable"))
            }
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(cursor) => f.debug_struct("Memory").field("len", &cursor.get_ref().len()).finish(),
            Self::Spooled(spooled) => f.debug_struct("Spooled").field("rolled", &spooled.is_rolled()).finish(),
            Self::File { mode, path, .. } => f.debug_struct("File").field("mode", mode).field("path", path).finish(),
            Self::Reader(_) => f.write_str("Reader"),
            Self::Writer(_) => f.write_str("Writer"),
        }
    }
}
