//! Builds [`micro_message`] requests from CGI/1.1 meta-variables.
//!
//! A gateway describes a request through variables such as `REQUEST_METHOD`, `SERVER_NAME`,
//! `PATH_INFO`, `QUERY_STRING` and one `HTTP_*` variable per header, and hands the body over on
//! stdin. [`Environment`] captures those, [`Adapter`] turns them into a
//! [`Request`](micro_message::protocol::Request) or a
//! [`ServerRequest`](micro_message::protocol::ServerRequest).
//!
//! ```
//! use micro_cgi::{Adapter, Environment};
//! use micro_message::protocol::{HttpMessage, HttpRequest};
//!
//! let environment = Environment::from_vars([
//!     ("REQUEST_METHOD", "POST"),
//!     ("SERVER_NAME", "localhost"),
//!     ("SERVER_PORT", "8972"),
//!     ("PATH_INFO", "/api"),
//!     ("QUERY_STRING", "page=2"),
//!     ("CONTENT_TYPE", "application/json"),
//! ])
//! .with_body(r#"{"hello":"world"}"#);
//!
//! let request = Adapter::default().server_request(&environment).unwrap();
//! assert_eq!(request.uri().to_string(), "http://localhost:8972/api?page=2");
//! assert_eq!(request.header_line("content-type"), "application/json");
//! assert_eq!(request.query_params()["page"], "2");
//! assert_eq!(request.parsed_body()["hello"], "world");
//! ```

mod adapter;
mod config;
mod env;
mod error;

pub use adapter::Adapter;
pub use config::{AdapterConfig, AdapterConfigBuilder};
pub use env::Environment;
pub use error::{AdapterError, Result};
