//! HTTP messages: the shared [`Message`] part, [`Request`], [`ServerRequest`] and [`Response`].
//!
//! All of them are immutable. Reads go through the [`HttpMessage`] and [`HttpRequest`] traits,
//! and every `with_*` call returns a new value that shares whatever it did not change with the
//! receiver.
//!
//! ```
//! use micro_message::protocol::{HttpMessage, HttpRequest, Request};
//!
//! let request = Request::new("GET", "http://example.com:8080/items?page=2").unwrap();
//! let traced = request.with_header("X-Trace-Id", "abc").unwrap();
//!
//! assert_eq!(traced.header_line("host"), "example.com:8080");
//! assert_eq!(traced.request_target(), "/items?page=2");
//! assert!(!request.has_header("x-trace-id"));
//! ```

mod message;
mod request;
mod response;
mod server_request;

pub use message::{DEFAULT_PROTOCOL_VERSION, HttpMessage, Message};
pub use request::{HttpRequest, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use server_request::{Attribute, ServerRequest, ServerRequestBuilder};
