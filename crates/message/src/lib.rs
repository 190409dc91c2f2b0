//! Immutable HTTP message value objects
//!
//! This crate models an HTTP message as a set of side-effect-free values that can be passed
//! between the layers of a server or client: routing, middleware and business logic.
//!
//! # Features
//!
//! - Uri parsing with per-component percent-encoding and default port filtering
//! - Case-insensitive, grammar validated header collections
//! - Byte streams over memory, temporary files, files and one-way pipes
//! - Requests, server requests and responses with copy-on-write derivation
//! - Query and body decoding into structured values
//! - Uploaded files with move-once semantics and multipart descriptor normalization
//!
//! # Example
//!
//! ```
//! use micro_message::protocol::{HttpMessage, HttpRequest, ServerRequest};
//! use serde_json::json;
//!
//! let request = ServerRequest::builder()
//!     .method("POST")
//!     .uri("https://example.com/login?next=%2Fhome")
//!     .header("Content-Type", "application/json")
//!     .body(r#"{"user":"zava"}"#)
//!     .build()
//!     .unwrap();
//!
//! let body = micro_message::params::decode_parsed_body(
//!     Some(request.header_line("content-type").as_str()),
//!     &request.body().contents().unwrap(),
//!     None,
//! )
//! .unwrap();
//! let request = request.with_parsed_body(body).unwrap();
//!
//! assert_eq!(request.uri().authority(), "example.com");
//! assert_eq!(request.query_params()["next"], "/home");
//! assert_eq!(request.parsed_body(), &json!({"user": "zava"}));
//! ```
//!
//! # Architecture
//!
//! - [`uri`]: the [`Uri`](uri::Uri) value
//! - [`header`]: the [`HeaderCollection`](header::HeaderCollection)
//! - [`stream`]: [`Stream`](stream::Stream) and the raw resources it wraps
//! - [`protocol`]: messages, requests and responses
//! - [`params`]: query string and body decoding
//! - [`upload`]: uploaded files and their normalization
//! - [`factory`]: factories for all of the above
//!
//! # Concurrency
//!
//! Uris, headers and messages are plain immutable values and can be shared freely. Streams
//! and uploaded files hold a cursor and a moved flag; they are safe to send between threads
//! but should only be driven from one place at a time.

pub mod factory;
pub mod header;
pub mod params;
pub mod protocol;
pub mod stream;
pub mod upload;
pub mod uri;

mod error;
mod utils;

pub use error::{MessageError, Result};
