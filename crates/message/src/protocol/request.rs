use super::message::{DEFAULT_PROTOCOL_VERSION, HttpMessage, Message};
use crate::error::{MessageError, Result};
use crate::header::{HeaderCollection, IntoHeaderValues};
use crate::stream::{Stream, StreamSource};
use crate::uri::{IntoUri, Uri};
use crate::utils::ensure;

/// An outgoing or incoming request: method, target uri and the message parts.
#[derive(Debug, Clone)]
pub struct Request {
    message: Message,
    method: String,
    uri: Uri,
    request_target: Option<String>,
}

impl Request {
    /// Builds a request with no headers besides the `Host` derived from `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidUri`] when `uri` can not be parsed.
    pub fn new<M: Into<String>, U: IntoUri>(method: M, uri: U) -> Result<Self> {
        Self::builder().method(method).uri(uri).build()
    }

    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Sets `Host` from the uri, first among the headers. A uri without host changes nothing.
    fn update_host_from_uri(mut self) -> Result<Self> {
        let host = self.uri.host();
        if host.is_empty() {
            return Ok(self);
        }
        let host = match self.uri.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };

        let headers = self.message.headers().with_header_first("Host", &host)?;
        self.message.set_headers(headers);
        Ok(self)
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn with_message(&self, message: Message) -> Self {
        Self { message, ..self.clone() }
    }
}

/// Request specific accessors and derivations, shared with [`ServerRequest`](super::ServerRequest).
pub trait HttpRequest: HttpMessage {
    fn request(&self) -> &Request;

    /// Returns a copy of `self` carrying `request`.
    #[must_use]
    fn with_request(&self, request: Request) -> Self;

    fn method(&self) -> &str {
        &self.request().method
    }

    fn uri(&self) -> &Uri {
        &self.request().uri
    }

    /// The explicit request target, or the origin form derived from the uri: its path
    /// (`/` when empty) followed by `?query` when there is a query.
    fn request_target(&self) -> String {
        let request = self.request();
        if let Some(target) = &request.request_target {
            return target.clone();
        }

        let mut target = request.uri.path().into_owned();
        if target.is_empty() {
            target.push('/');
        }
        let query = request.uri.query();
        if !query.is_empty() {
            target.push('?');
            target.push_str(query);
        }
        target
    }

    /// Replaces the method. Methods are case-sensitive and never validated.
    #[must_use]
    fn with_method(&self, method: &str) -> Self {
        if self.method() == method {
            return self.clone();
        }
        self.with_request(Request { method: method.to_owned(), ..self.request().clone() })
    }

    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] when `target` contains whitespace.
    fn with_request_target(&self, target: &str) -> Result<Self> {
        ensure!(
            !target.chars().any(char::is_whitespace),
            MessageError::invalid_argument("invalid request target provided; cannot contain whitespace")
        );
        if self.request().request_target.as_deref() == Some(target) {
            return Ok(self.clone());
        }
        Ok(self.with_request(Request { request_target: Some(target.to_owned()), ..self.request().clone() }))
    }

    /// Replaces the uri and updates `Host` from it, unless `preserve_host` is set and a `Host`
    /// header is already present.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidUri`] when `uri` can not be parsed.
    fn with_uri<U: IntoUri>(&self, uri: U, preserve_host: bool) -> Result<Self> {
        let uri = uri.into_uri()?;
        if Uri::ptr_eq(&uri, self.uri()) {
            return Ok(self.clone());
        }

        let request = Request { uri, ..self.request().clone() };
        let request =
            if preserve_host && request.message.headers().contains("Host") { request } else { request.update_host_from_uri()? };
        Ok(self.with_request(request))
    }
}

impl HttpRequest for Request {
    fn request(&self) -> &Request {
        self
    }

    fn with_request(&self, request: Request) -> Self {
        request
    }
}

/// Builds a [`Request`], deferring every validation error to [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: String,
    uri: Result<Uri>,
    headers: Vec<(String, Vec<String>)>,
    body: Option<StreamSource>,
    protocol: String,
}

impl RequestBuilder {
    fn new() -> Self {
        Self {
            method: "GET".to_owned(),
            uri: Ok(Uri::default()),
            headers: Vec::new(),
            body: None,
            protocol: DEFAULT_PROTOCOL_VERSION.to_owned(),
        }
    }

    pub fn method<M: Into<String>>(mut self, method: M) -> Self {
        self.method = method.into();
        self
    }

    pub fn uri<U: IntoUri>(mut self, uri: U) -> Self {
        self.uri = uri.into_uri();
        self
    }

    /// Adds values to `name`, merging names that only differ in case.
    pub fn header<V: IntoHeaderValues>(mut self, name: &str, values: V) -> Self {
        self.headers.push((name.to_owned(), values.into_header_values()));
        self
    }

    pub fn headers<I, N, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: IntoHeaderValues,
    {
        self.headers.extend(headers.into_iter().map(|(name, values)| (name.into(), values.into_header_values())));
        self
    }

    /// Sets the body. An empty byte buffer leaves the body to be created on first access.
    pub fn body<B: Into<StreamSource>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn protocol_version<P: Into<String>>(mut self, version: P) -> Self {
        self.protocol = version.into();
        self
    }

    /// # Errors
    ///
    /// Returns the first uri, header or body error met while building.
    pub fn build(self) -> Result<Request> {
        let uri = self.uri?;
        let headers = HeaderCollection::from_pairs(self.headers)?;
        let body = match self.body {
            None => None,
            Some(StreamSource::Bytes(bytes)) if bytes.is_empty() => None,
            Some(source) => Some(Stream::create(source)?),
        };

        let request = Request {
            message: Message::new(self.protocol, headers, body),
            method: self.method,
            uri,
            request_target: None,
        };
        if request.message.headers().contains("Host") { Ok(request) } else { request.update_host_from_uri() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_uri() {
        let request = Request::new("GET", "http://u:p@site.test:8972/hello/world?day=good#frag").unwrap();
        let uri = request.uri();

        assert_eq!(uri.scheme(), "http");
        assert_eq!(uri.authority(), "u:p@site.test:8972");
        assert_eq!(uri.host(), "site.test");
        assert_eq!(uri.port(), Some(8972));
        assert_eq!(uri.path(), "/hello/world");
        assert_eq!(uri.query(), "day=good");
        assert_eq!(uri.fragment(), "frag");
        assert_eq!(request.method(), "GET");
        assert_eq!(request.protocol_version(), "1.1");
    }

    #[test]
    fn host_is_synthesized_first() {
        let request = Request::builder()
            .uri("http://example.com:8080/path")
            .header("Accept", "text/html")
            .build()
            .unwrap();

        let names: Vec<_> = request.headers().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Host", "Accept"]);
        assert_eq!(request.header_line("host"), "example.com:8080");

        let request = Request::new("GET", "https://example.com:443/").unwrap();
        assert_eq!(request.header_line("host"), "example.com");
    }

    #[test]
    fn explicit_host_is_kept() {
        let request = Request::builder().uri("http://example.com/").header("host", "other.test").build().unwrap();
        assert_eq!(request.header("Host"), ["other.test"]);
    }

    #[test]
    fn no_host_without_uri_host() {
        let request = Request::new("GET", "/relative?x=1").unwrap();
        assert!(!request.has_header("Host"));
    }

    #[test]
    fn request_target() {
        let request = Request::new("GET", "http://example.com").unwrap();
        assert_eq!(request.request_target(), "/");

        let request = Request::new("GET", "http://example.com/index?a=1#frag").unwrap();
        assert_eq!(request.request_target(), "/index?a=1");

        let request = request.with_request_target("*").unwrap();
        assert_eq!(request.request_target(), "*");
        assert!(request.with_request_target("/a b").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn with_method_is_case_sensitive() {
        let request = Request::new("get", "/").unwrap();
        let same = request.with_method("get");
        assert!(Uri::ptr_eq(same.uri(), request.uri()));
        assert_eq!(request.with_method("PATCH").method(), "PATCH");
        assert_eq!(request.method(), "get");
    }

    #[test]
    fn with_uri_updates_host() {
        let request = Request::new("GET", "http://first.test/").unwrap();

        let moved = request.with_uri("http://second.test:81/x", false).unwrap();
        assert_eq!(moved.header_line("Host"), "second.test:81");
        assert_eq!(request.header_line("Host"), "first.test");

        let preserved = request.with_uri("http://second.test/x", true).unwrap();
        assert_eq!(preserved.header_line("Host"), "first.test");
        assert_eq!(preserved.uri().host(), "second.test");

        let hostless = Request::new("GET", "/").unwrap().with_uri("http://third.test/", true).unwrap();
        assert_eq!(hostless.header_line("Host"), "third.test");

        let same = request.with_uri(request.uri(), false).unwrap();
        assert!(HeaderCollection::ptr_eq(same.headers(), request.headers()));
    }

    #[test]
    fn body_from_builder() {
        let request = Request::builder().method("POST").uri("/").body("payload").build().unwrap();
        assert_eq!(request.body().to_string(), "payload");

        let request = Request::builder().body("").build().unwrap();
        assert_eq!(request.body().size(), Some(0));
    }

    #[test]
    fn invalid_parts_fail_build() {
        assert!(Request::new("GET", "http://host:99999/").unwrap_err().is_invalid_argument());
        assert!(Request::builder().header("Bad Name", "x").build().unwrap_err().is_invalid_argument());
    }
}
