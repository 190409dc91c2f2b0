//! Byte streams over memory buffers, files and one-way readers or writers.
//!
//! A [`Stream`] owns exactly one [`Resource`]. Its readable, writable and seekable flags are
//! fixed when the stream is built and only drop to `false` once the resource is detached or
//! closed. The size is computed lazily and cached until the next write.
//!
//! Clones of a `Stream` are handles to the same resource and share its cursor. Operations are
//! serialized internally but interleaving them from several threads still yields an
//! unpredictable cursor position, so a stream should only be driven from one place at a time.

mod mode;
mod resource;

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, trace, warn};
use triomphe::Arc;

pub use mode::OpenMode;
pub use resource::Resource;

use crate::error::{MessageError, Result};

/// Byte buffers of at least this size are spooled to a temporary file instead of memory.
pub const MEMORY_THRESHOLD: usize = 200_000;

/// What a [`Stream`] can be created from.
#[derive(Debug)]
pub enum StreamSource {
    Stream(Stream),
    Bytes(Bytes),
    Resource(Resource),
}

impl From<Stream> for StreamSource {
    fn from(stream: Stream) -> Self {
        Self::Stream(stream)
    }
}

impl From<&Stream> for StreamSource {
    fn from(stream: &Stream) -> Self {
        Self::Stream(stream.clone())
    }
}

impl From<Resource> for StreamSource {
    fn from(resource: Resource) -> Self {
        Self::Resource(resource)
    }
}

impl From<Bytes> for StreamSource {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for StreamSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for StreamSource {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for StreamSource {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<&str> for StreamSource {
    fn from(text: &str) -> Self {
        Self::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// Stream metadata, available while a resource is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub mode: OpenMode,
    pub seekable: bool,
    pub uri: Option<PathBuf>,
}

struct State {
    resource: Option<Resource>,
    readable: bool,
    writable: bool,
    seekable: bool,
    size: Option<u64>,
    eof: bool,
}

impl State {
    fn attached(&mut self) -> Result<&mut Resource> {
        self.resource.as_mut().ok_or(MessageError::Detached)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let seekable = self.seekable;
        let resource = self.attached()?;
        if !seekable {
            return Err(MessageError::NotSeekable);
        }
        let position =
            resource.seek(pos).map_err(|e| MessageError::io(format!("unable to seek to stream position {pos:?}"), e))?;
        self.eof = false;
        Ok(position)
    }

    fn contents(&mut self) -> Result<Bytes> {
        let readable = self.readable;
        let resource = self.attached()?;
        if !readable {
            return Err(MessageError::NotReadable);
        }
        let mut buf = Vec::new();
        resource.read_to_end(&mut buf).map_err(|e| MessageError::io("unable to read stream contents", e))?;
        self.eof = true;
        Ok(Bytes::from(buf))
    }
}

/// A handle on a byte resource with capability flags and a lazily computed size.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<Mutex<State>>,
}

impl Stream {
    /// Wraps `resource` directly.
    pub fn new(mut resource: Resource) -> Self {
        let mode = resource.mode();
        let state = State {
            readable: mode.is_readable(),
            writable: mode.is_writable(),
            seekable: resource.is_seekable(),
            resource: Some(resource),
            size: None,
            eof: false,
        };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    /// Builds a stream from any [`StreamSource`].
    ///
    /// An existing stream is returned as is. Byte buffers below [`MEMORY_THRESHOLD`] stay in
    /// memory, anything from the threshold up is spooled to a temporary file. Both are
    /// positioned at the start.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::Io`] when a large buffer can not be spooled.
    pub fn create<S: Into<StreamSource>>(source: S) -> Result<Self> {
        match source.into() {
            StreamSource::Stream(stream) => Ok(stream),
            StreamSource::Resource(resource) => Ok(Self::new(resource)),
            StreamSource::Bytes(bytes) if bytes.len() < MEMORY_THRESHOLD => {
                trace!(len = bytes.len(), "buffering stream in memory");
                Ok(Self::new(Resource::memory(bytes.to_vec())))
            }
            StreamSource::Bytes(bytes) => {
                trace!(len = bytes.len(), "spooling stream to temporary file");
                let resource = Resource::spooled(&bytes, MEMORY_THRESHOLD)
                    .map_err(|e| MessageError::io("unable to spool stream content", e))?;
                Ok(Self::new(resource))
            }
        }
    }

    pub fn empty() -> Self {
        Self::new(Resource::memory(Vec::new()))
    }

    /// Opens `path` with a `fopen` style `mode`.
    ///
    /// # Errors
    ///
    /// See [`Resource::open`].
    pub fn from_path<P: AsRef<Path>>(path: P, mode: &str) -> Result<Self> {
        Resource::open(path, mode).map(Self::new)
    }

    /// Returns true when both handles refer to the same stream.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_readable(&self) -> bool {
        self.state().readable
    }

    pub fn is_writable(&self) -> bool {
        self.state().writable
    }

    pub fn is_seekable(&self) -> bool {
        self.state().seekable
    }

    /// Size in bytes, `None` when detached or when the resource can not tell.
    pub fn size(&self) -> Option<u64> {
        let mut state = self.state();
        if state.size.is_none() {
            state.size = state.resource.as_mut().and_then(Resource::size);
        }
        state.size
    }

    /// # Errors
    ///
    /// Fails when detached or when the position can not be determined.
    pub fn tell(&self) -> Result<u64> {
        self.state()
            .attached()?
            .stream_position()
            .map_err(|e| MessageError::io("unable to determine stream position", e))
    }

    /// Returns true once a read reached the end of the resource, or when detached.
    pub fn eof(&self) -> bool {
        let state = self.state();
        state.resource.is_none() || state.eof
    }

    /// # Errors
    ///
    /// Fails with [`MessageError::Detached`], [`MessageError::NotSeekable`] or
    /// [`MessageError::Io`].
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.state().seek(pos)
    }

    /// # Errors
    ///
    /// Same as [`Stream::seek`].
    pub fn rewind(&self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Reads up to `len` bytes, fewer only when the end of the resource is reached.
    ///
    /// # Errors
    ///
    /// Fails with [`MessageError::Detached`], [`MessageError::NotReadable`] or
    /// [`MessageError::Io`].
    pub fn read(&self, len: usize) -> Result<Bytes> {
        let mut state = self.state();
        let readable = state.readable;
        let resource = state.attached()?;
        if !readable {
            return Err(MessageError::NotReadable);
        }

        let mut buf = Vec::with_capacity(len.min(8 * 1024));
        Read::by_ref(resource)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| MessageError::io("unable to read from stream", e))?;

        if buf.len() < len {
            state.eof = true;
        }
        Ok(Bytes::from(buf))
    }

    /// Writes `bytes` and returns how many were accepted.
    ///
    /// # Errors
    ///
    /// Fails with [`MessageError::Detached`], [`MessageError::NotWritable`] or
    /// [`MessageError::Io`].
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.state();
        let writable = state.writable;
        let resource = state.attached()?;
        if !writable {
            return Err(MessageError::NotWritable);
        }

        let written = resource.write(bytes).map_err(|e| MessageError::io("unable to write to stream", e))?;
        state.size = None;
        Ok(written)
    }

    /// Reads everything from the current position to the end.
    ///
    /// # Errors
    ///
    /// Fails with [`MessageError::Detached`], [`MessageError::NotReadable`] or
    /// [`MessageError::Io`].
    pub fn contents(&self) -> Result<Bytes> {
        self.state().contents()
    }

    pub fn metadata(&self) -> Option<StreamMetadata> {
        let state = self.state();
        let resource = state.resource.as_ref()?;
        Some(StreamMetadata { mode: resource.mode(), seekable: state.seekable, uri: resource.path().map(Path::to_path_buf) })
    }

    /// Takes the resource out of the stream, leaving it permanently unusable.
    ///
    /// Returns `None` when the resource was already detached.
    pub fn detach(&self) -> Option<Resource> {
        let mut state = self.state();
        let resource = state.resource.take()?;
        state.readable = false;
        state.writable = false;
        state.seekable = false;
        state.size = None;
        debug!(resource = ?resource, "stream detached");
        Some(resource)
    }

    /// Detaches and drops the resource.
    pub fn close(&self) {
        if let Some(mut resource) = self.detach() {
            if let Err(e) = resource.flush() {
                warn!(cause = %e, "flush on close failed");
            }
        }
    }

    /// Rewinds if possible and reads the whole stream, any failure yields an empty string.
    fn render(&self) -> String {
        let mut state = self.state();
        let rewound = if state.seekable { state.seek(SeekFrom::Start(0)).map(|_| ()) } else { Ok(()) };
        let rendered = rewound.and_then(|()| state.contents());
        match rendered {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(cause = %e, "unable to render stream");
                String::new()
            }
        }
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Stream")
            .field("resource", &state.resource)
            .field("readable", &state.readable)
            .field("writable", &state.writable)
            .field("seekable", &state.seekable)
            .field("size", &state.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn create_returns_existing_stream() {
        let stream = Stream::create("abc").unwrap();
        let same = Stream::create(&stream).unwrap();
        assert!(Stream::ptr_eq(&stream, &same));
    }

    #[test]
    fn memory_stream_capabilities() {
        let stream = Stream::create("hello").unwrap();
        assert!(stream.is_readable());
        assert!(stream.is_writable());
        assert!(stream.is_seekable());
        assert_eq!(stream.size(), Some(5));
        assert_eq!(stream.tell().unwrap(), 0);
        assert_eq!(stream.metadata().unwrap().mode.as_str(), "w+b");
    }

    #[test]
    fn large_buffers_are_spooled() {
        let stream = Stream::create(vec![b'a'; MEMORY_THRESHOLD - 1]).unwrap();
        assert!(matches!(stream.detach(), Some(Resource::Memory(_))));

        let stream = Stream::create(vec![b'a'; MEMORY_THRESHOLD]).unwrap();
        let Some(Resource::Spooled(spooled)) = stream.detach() else { panic!("not spooled") };
        assert!(spooled.is_rolled(), "a body of exactly the threshold is written to disk");

        let stream = Stream::create(vec![b'a'; MEMORY_THRESHOLD + 10]).unwrap();
        assert_eq!(stream.size(), Some(MEMORY_THRESHOLD as u64 + 10));
        assert_eq!(stream.read(3).unwrap(), "aaa");
        assert!(stream.is_seekable());
    }

    #[test]
    fn read_and_eof() {
        let stream = Stream::create("hello").unwrap();
        assert_eq!(stream.read(2).unwrap(), "he");
        assert!(!stream.eof());
        assert_eq!(stream.read(10).unwrap(), "llo");
        assert!(stream.eof());

        stream.rewind().unwrap();
        assert!(!stream.eof());
        assert_eq!(stream.contents().unwrap(), "hello");
        assert!(stream.eof());
    }

    #[test]
    fn write_invalidates_size() {
        let stream = Stream::create("abc").unwrap();
        assert_eq!(stream.size(), Some(3));

        stream.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(stream.write(b"def").unwrap(), 3);
        assert_eq!(stream.size(), Some(6));
        assert_eq!(stream.to_string(), "abcdef");
    }

    #[test]
    fn detach_leaves_stream_unusable() {
        let stream = Stream::create("abc").unwrap();
        assert!(stream.detach().is_some());
        assert!(stream.detach().is_none());

        assert!(matches!(stream.read(1), Err(MessageError::Detached)));
        assert!(matches!(stream.write(b"x"), Err(MessageError::Detached)));
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(MessageError::Detached)));
        assert!(matches!(stream.contents(), Err(MessageError::Detached)));
        assert!(matches!(stream.tell(), Err(MessageError::Detached)));
        assert!(!stream.is_readable() && !stream.is_writable() && !stream.is_seekable());
        assert!(stream.eof());
        assert_eq!(stream.size(), None);
        assert!(stream.metadata().is_none());
        assert_eq!(stream.to_string(), "");
    }

    #[test]
    fn reader_is_read_only_and_not_seekable() {
        let stream = Stream::new(Resource::reader(Cursor::new(b"pipe".to_vec())));
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert!(!stream.is_seekable());
        assert_eq!(stream.size(), None);

        assert!(matches!(stream.write(b"x"), Err(MessageError::NotWritable)));
        assert!(matches!(stream.rewind(), Err(MessageError::NotSeekable)));
        assert_eq!(stream.to_string(), "pipe");
    }

    #[test]
    fn writer_is_not_readable() {
        let stream = Stream::new(Resource::writer(Vec::new()));
        assert!(matches!(stream.read(1), Err(MessageError::NotReadable)));
        assert_eq!(stream.write(b"abc").unwrap(), 3);
        assert_eq!(stream.to_string(), "");
    }

    #[test]
    fn file_streams_follow_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");

        let stream = Stream::from_path(&path, "w").unwrap();
        assert!(!stream.is_readable());
        assert!(stream.is_writable());
        stream.write(b"file body").unwrap();
        stream.close();
        assert!(matches!(stream.write(b"x"), Err(MessageError::Detached)));

        let stream = Stream::from_path(&path, "r").unwrap();
        assert!(stream.is_seekable());
        assert_eq!(stream.size(), Some(9));
        assert_eq!(stream.metadata().unwrap().uri.as_deref(), Some(path.as_path()));
        assert!(matches!(stream.write(b"x"), Err(MessageError::NotWritable)));
        assert_eq!(stream.to_string(), "file body");
    }

    #[test]
    fn clones_share_the_cursor() {
        let stream = Stream::create("abcd").unwrap();
        let alias = stream.clone();
        stream.read(2).unwrap();
        assert_eq!(alias.read(2).unwrap(), "cd");
    }
}
