//! Factories for every message value type.
//!
//! Each concern has its own trait so that a consumer can depend on just the factory it
//! needs; [`HttpFactory`] implements all of them.

use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;
use crate::protocol::{Request, Response, ServerRequest};
use crate::stream::{Resource, Stream};
use crate::upload::{UploadStatus, UploadedFile};
use crate::uri::{IntoUri, Uri};

pub trait RequestFactory {
    /// # Errors
    ///
    /// Fails when `uri` can not be parsed.
    fn create_request<U: IntoUri>(&self, method: &str, uri: U) -> Result<Request>;
}

pub trait ResponseFactory {
    /// Without `reason` the standard phrase of `code` is used, `Some("")` keeps it empty.
    ///
    /// # Errors
    ///
    /// Fails unless `100 <= code <= 599`.
    fn create_response(&self, code: u16, reason: Option<&str>) -> Result<Response>;
}

pub trait ServerRequestFactory {
    /// # Errors
    ///
    /// Fails when `uri` can not be parsed.
    fn create_server_request<U: IntoUri>(
        &self,
        method: &str,
        uri: U,
        server_params: IndexMap<String, String>,
    ) -> Result<ServerRequest>;
}

pub trait StreamFactory {
    /// # Errors
    ///
    /// Fails when large content can not be spooled.
    fn create_stream(&self, content: &str) -> Result<Stream>;

    /// # Errors
    ///
    /// Fails on an empty filename or an invalid mode, and when the file can not be opened.
    fn create_stream_from_file(&self, filename: &Path, mode: &str) -> Result<Stream>;

    fn create_stream_from_resource(&self, resource: Resource) -> Stream;
}

pub trait UploadedFileFactory {
    /// `size` defaults to the size of `stream`.
    ///
    /// # Errors
    ///
    /// See [`UploadedFile::new`].
    fn create_uploaded_file(
        &self,
        stream: Stream,
        size: Option<u64>,
        status: UploadStatus,
        client_filename: Option<&str>,
        client_media_type: Option<&str>,
    ) -> Result<UploadedFile>;
}

pub trait UriFactory {
    /// # Errors
    ///
    /// Fails when `uri` can not be parsed.
    fn create_uri(&self, uri: &str) -> Result<Uri>;
}

/// Creates the value types of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFactory;

impl RequestFactory for HttpFactory {
    fn create_request<U: IntoUri>(&self, method: &str, uri: U) -> Result<Request> {
        Request::new(method, uri)
    }
}

impl ResponseFactory for HttpFactory {
    fn create_response(&self, code: u16, reason: Option<&str>) -> Result<Response> {
        let builder = Response::builder().status(code);
        match reason {
            Some(reason) => builder.reason(reason).build(),
            None => builder.build(),
        }
    }
}

impl ServerRequestFactory for HttpFactory {
    fn create_server_request<U: IntoUri>(
        &self,
        method: &str,
        uri: U,
        server_params: IndexMap<String, String>,
    ) -> Result<ServerRequest> {
        ServerRequest::new(method, uri, server_params)
    }
}

impl StreamFactory for HttpFactory {
    fn create_stream(&self, content: &str) -> Result<Stream> {
        Stream::create(content)
    }

    fn create_stream_from_file(&self, filename: &Path, mode: &str) -> Result<Stream> {
        Stream::from_path(filename, mode)
    }

    fn create_stream_from_resource(&self, resource: Resource) -> Stream {
        Stream::new(resource)
    }
}

impl UploadedFileFactory for HttpFactory {
    fn create_uploaded_file(
        &self,
        stream: Stream,
        size: Option<u64>,
        status: UploadStatus,
        client_filename: Option<&str>,
        client_media_type: Option<&str>,
    ) -> Result<UploadedFile> {
        let size = size.or_else(|| stream.size());
        UploadedFile::new(stream, size, status, client_filename.map(str::to_owned), client_media_type.map(str::to_owned))
    }
}

impl UriFactory for HttpFactory {
    fn create_uri(&self, uri: &str) -> Result<Uri> {
        Uri::parse(uri)
    }
}
