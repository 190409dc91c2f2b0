use once_cell::sync::OnceCell;

use crate::error::Result;
use crate::header::{HeaderCollection, IntoHeaderValues};
use crate::stream::Stream;

/// Protocol version used when none is given.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

/// The part shared by every message: protocol version, headers and body.
///
/// The body is created lazily as an empty stream the first time it is read, then kept.
#[derive(Debug, Clone)]
pub struct Message {
    protocol: String,
    headers: HeaderCollection,
    body: OnceCell<Stream>,
}

impl Default for Message {
    fn default() -> Self {
        Self::new(DEFAULT_PROTOCOL_VERSION, HeaderCollection::new(), None)
    }
}

impl Message {
    pub fn new<P: Into<String>>(protocol: P, headers: HeaderCollection, body: Option<Stream>) -> Self {
        Self { protocol: protocol.into(), headers, body: body.map_or_else(OnceCell::new, OnceCell::with_value) }
    }

    #[inline]
    pub fn protocol_version(&self) -> &str {
        &self.protocol
    }

    #[inline]
    pub fn headers(&self) -> &HeaderCollection {
        &self.headers
    }

    pub fn body(&self) -> &Stream {
        self.body.get_or_init(Stream::empty)
    }

    pub(crate) fn set_headers(&mut self, headers: HeaderCollection) {
        self.headers = headers;
    }

    fn replace_body(&self, body: Stream) -> Self {
        Self::new(self.protocol.clone(), self.headers.clone(), Some(body))
    }
}

/// Read access and copy-on-write derivation shared by requests and responses.
///
/// Every `with_*` method leaves the receiver untouched and returns a copy with one part
/// replaced. When nothing changes, the copy shares all of its parts with the receiver.
pub trait HttpMessage: Clone {
    fn message(&self) -> &Message;

    /// Returns a copy of `self` carrying `message`.
    #[must_use]
    fn with_message(&self, message: Message) -> Self;

    fn protocol_version(&self) -> &str {
        self.message().protocol_version()
    }

    #[must_use]
    fn with_protocol_version(&self, version: &str) -> Self {
        if self.protocol_version() == version {
            return self.clone();
        }
        let message = self.message();
        self.with_message(Message {
            protocol: version.to_owned(),
            headers: message.headers.clone(),
            body: message.body.clone(),
        })
    }

    fn headers(&self) -> &HeaderCollection {
        self.message().headers()
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    /// Every value of `name`, empty when absent.
    fn header(&self, name: &str) -> &[String] {
        self.headers().get(name)
    }

    fn header_line(&self, name: &str) -> String {
        self.headers().line(name)
    }

    /// # Errors
    ///
    /// See [`HeaderCollection::with_header`].
    fn with_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let headers = self.headers().with_header(name, values)?;
        Ok(self.with_headers(headers))
    }

    /// # Errors
    ///
    /// See [`HeaderCollection::with_added_header`].
    fn with_added_header<V: IntoHeaderValues>(&self, name: &str, values: V) -> Result<Self> {
        let headers = self.headers().with_added_header(name, values)?;
        Ok(self.with_headers(headers))
    }

    #[must_use]
    fn without_header(&self, name: &str) -> Self {
        let headers = self.headers().without_header(name);
        self.with_headers(headers)
    }

    #[doc(hidden)]
    #[must_use]
    fn with_headers(&self, headers: HeaderCollection) -> Self {
        if HeaderCollection::ptr_eq(&headers, self.headers()) {
            return self.clone();
        }
        let mut message = self.message().clone();
        message.set_headers(headers);
        self.with_message(message)
    }

    fn body(&self) -> &Stream {
        self.message().body()
    }

    #[must_use]
    fn with_body(&self, body: Stream) -> Self {
        if self.message().body.get().is_some_and(|current| Stream::ptr_eq(current, &body)) {
            return self.clone();
        }
        self.with_message(self.message().replace_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Plain(Message);

    impl HttpMessage for Plain {
        fn message(&self) -> &Message {
            &self.0
        }

        fn with_message(&self, message: Message) -> Self {
            Self(message)
        }
    }

    #[test]
    fn body_is_created_once() {
        let message = Plain::default();
        let first = message.body().clone();
        assert!(Stream::ptr_eq(&first, message.body()));
        assert_eq!(first.size(), Some(0));
    }

    #[test]
    fn with_body_identity() {
        let body = Stream::create("abc").unwrap();
        let message = Plain::default().with_body(body.clone());
        assert!(Stream::ptr_eq(message.body(), &body));

        let same = message.with_body(body.clone());
        assert!(HeaderCollection::ptr_eq(same.headers(), message.headers()));
        assert!(Stream::ptr_eq(same.body(), &body));
    }

    #[test]
    fn protocol_version() {
        let message = Plain::default();
        assert_eq!(message.protocol_version(), "1.1");

        let body = message.body().clone();
        let upgraded = message.with_protocol_version("2");
        assert_eq!(upgraded.protocol_version(), "2");
        assert_eq!(message.protocol_version(), "1.1");
        assert!(Stream::ptr_eq(upgraded.body(), &body));
    }

    #[test]
    fn header_derivation_keeps_receiver() {
        let first = Plain::default();
        let second = first.with_header("A", "1").unwrap();

        assert!(first.header("A").is_empty());
        assert_eq!(second.header("a"), ["1"]);
        assert!(!second.without_header("A").has_header("a"));

        let untouched = second.without_header("missing");
        assert!(HeaderCollection::ptr_eq(untouched.headers(), second.headers()));
    }

    #[test]
    fn invalid_header_leaves_receiver() {
        let message = Plain::default().with_header("X-Foo", "a").unwrap();
        assert!(message.with_header("X Foo", "b").is_err());
        assert!(message.with_added_header("X-Foo", "bad\nvalue").is_err());
        assert_eq!(message.header_line("x-foo"), "a");
    }
}
