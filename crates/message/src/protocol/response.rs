use http::StatusCode;

use super::message::{DEFAULT_PROTOCOL_VERSION, HttpMessage, Message};
use crate::error::{MessageError, Result};
use crate::header::{HeaderCollection, IntoHeaderValues};
use crate::stream::{Stream, StreamSource};
use crate::utils::ensure;

/// A response: status code, reason phrase and the message parts.
#[derive(Debug, Clone)]
pub struct Response {
    message: Message,
    status: u16,
    reason: String,
}

impl Default for Response {
    fn default() -> Self {
        Self { message: Message::default(), status: 200, reason: standard_reason(200).to_owned() }
    }
}

impl Response {
    /// A response with the standard reason phrase of `status`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] unless `100 <= status <= 599`.
    pub fn new(status: u16) -> Result<Self> {
        Self::builder().status(status).build()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[inline]
    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Replaces the status. An empty `reason` selects the standard phrase of `status`, or no
    /// phrase when the code has none.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] unless `100 <= status <= 599`.
    pub fn with_status(&self, status: u16, reason: &str) -> Result<Self> {
        validate_status(status)?;
        let reason = if reason.is_empty() { standard_reason(status) } else { reason };
        if self.status == status && self.reason == reason {
            return Ok(self.clone());
        }
        Ok(Self { message: self.message.clone(), status, reason: reason.to_owned() })
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn with_message(&self, message: Message) -> Self {
        Self { message, ..self.clone() }
    }
}

fn validate_status(status: u16) -> Result<()> {
    ensure!(
        (100..=599).contains(&status),
        MessageError::invalid_argument(format!("status code has to be between 100 and 599, got {status}"))
    );
    Ok(())
}

fn standard_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status).ok().and_then(|code| code.canonical_reason()).unwrap_or_default()
}

/// Builds a [`Response`]. Without an explicit reason the standard phrase is used, while an
/// explicit empty reason is kept empty.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    reason: Option<String>,
    headers: Vec<(String, Vec<String>)>,
    body: Option<StreamSource>,
    protocol: String,
}

impl ResponseBuilder {
    fn new() -> Self {
        Self { status: 200, reason: None, headers: Vec::new(), body: None, protocol: DEFAULT_PROTOCOL_VERSION.to_owned() }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn reason<R: Into<String>>(mut self, reason: R) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn header<V: IntoHeaderValues>(mut self, name: &str, values: V) -> Self {
        self.headers.push((name.to_owned(), values.into_header_values()));
        self
    }

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
    /// Returns the status, header or body error met while building.
    pub fn build(self) -> Result<Response> {
        validate_status(self.status)?;
        let headers = HeaderCollection::from_pairs(self.headers)?;
        let body = match self.body {
            None => None,
            Some(StreamSource::Bytes(bytes)) if bytes.is_empty() => None,
            Some(source) => Some(Stream::create(source)?),
        };
        let reason = self.reason.unwrap_or_else(|| standard_reason(self.status).to_owned());

        Ok(Response { message: Message::new(self.protocol, headers, body), status: self.status, reason })
    }
}
