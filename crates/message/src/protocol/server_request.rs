use std::any::{Any, type_name};
use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use triomphe::Arc;

use super::message::{HttpMessage, Message};
use super::request::{HttpRequest, Request, RequestBuilder};
use crate::error::{MessageError, Result};
use crate::header::IntoHeaderValues;
use crate::params;
use crate::stream::StreamSource;
use crate::upload::UploadedNode;
use crate::uri::IntoUri;
use crate::utils::ensure;

/// An arbitrary value attached to a [`ServerRequest`] by the application.
#[derive(Clone)]
pub struct Attribute {
    value: std::sync::Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Attribute {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { value: std::sync::Arc::new(value), type_name: type_name::<T>() }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute<{}>", self.type_name)
    }
}

/// A request as received by a server, with the facets extracted from its environment.
///
/// Each facet is immutable and shared between derived requests; `with_*` replaces exactly one
/// of them.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    request: Request,
    server_params: Arc<IndexMap<String, String>>,
    cookie_params: Arc<IndexMap<String, String>>,
    query_params: Arc<Map<String, Value>>,
    parsed_body: Arc<Value>,
    attributes: Arc<IndexMap<String, Attribute>>,
    uploaded_files: Arc<IndexMap<String, UploadedNode>>,
}

impl ServerRequest {
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidUri`] when `uri` can not be parsed.
    pub fn new<M, U>(method: M, uri: U, server_params: IndexMap<String, String>) -> Result<Self>
    where
        M: Into<String>,
        U: IntoUri,
    {
        Self::builder().method(method).uri(uri).server_params(server_params).build()
    }

    pub fn builder() -> ServerRequestBuilder {
        ServerRequestBuilder { request: Request::builder(), server_params: IndexMap::new() }
    }

    /// Wraps `request`, parsing its uri query into the query parameters.
    pub fn from_request(request: Request, server_params: IndexMap<String, String>) -> Self {
        let query_params = params::parse_query(request.uri().query());
        Self {
            request,
            server_params: Arc::new(server_params),
            cookie_params: Arc::default(),
            query_params: Arc::new(query_params),
            parsed_body: Arc::new(Value::Null),
            attributes: Arc::default(),
            uploaded_files: Arc::default(),
        }
    }

    /// The environment the request was received in, as captured at construction.
    pub fn server_params(&self) -> &IndexMap<String, String> {
        &self.server_params
    }

    pub fn cookie_params(&self) -> &IndexMap<String, String> {
        &self.cookie_params
    }

    #[must_use]
    pub fn with_cookie_params(&self, cookies: IndexMap<String, String>) -> Self {
        Self { cookie_params: Arc::new(cookies), ..self.clone() }
    }

    pub fn query_params(&self) -> &Map<String, Value> {
        &self.query_params
    }

    #[must_use]
    pub fn with_query_params(&self, query: Map<String, Value>) -> Self {
        Self { query_params: Arc::new(query), ..self.clone() }
    }

    /// Decodes the uri query into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] when the query does not fit `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T> {
        params::query_as(self.uri().query())
    }

    /// The decoded body, [`Value::Null`] when none was supplied.
    pub fn parsed_body(&self) -> &Value {
        &self.parsed_body
    }

    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] unless `data` is null, an object or an array.
    pub fn with_parsed_body(&self, data: Value) -> Result<Self> {
        ensure!(
            matches!(data, Value::Null | Value::Object(_) | Value::Array(_)),
            MessageError::invalid_argument("parsed body must be null, an object or an array")
        );
        if *self.parsed_body == data {
            return Ok(self.clone());
        }
        Ok(Self { parsed_body: Arc::new(data), ..self.clone() })
    }

    /// Decodes the parsed body into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] when the body does not fit `T`.
    pub fn parsed_body_as<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&*self.parsed_body)
            .map_err(|e| MessageError::invalid_argument(format!("unable to decode parsed body: {e}")))
    }

    pub fn uploaded_files(&self) -> &IndexMap<String, UploadedNode> {
        &self.uploaded_files
    }

    #[must_use]
    pub fn with_uploaded_files(&self, files: IndexMap<String, UploadedNode>) -> Self {
        Self { uploaded_files: Arc::new(files), ..self.clone() }
    }

    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// The attribute `name` if present and of type `T`, `default` otherwise.
    pub fn attribute_or<T: Any + Clone>(&self, name: &str, default: T) -> T {
        self.attributes.get(name).and_then(Attribute::downcast_ref::<T>).cloned().unwrap_or(default)
    }

    #[must_use]
    pub fn with_attribute<T: Any + Send + Sync>(&self, name: &str, value: T) -> Self {
        let mut attributes = IndexMap::clone(&self.attributes);
        attributes.insert(name.to_owned(), Attribute::new(value));
        Self { attributes: Arc::new(attributes), ..self.clone() }
    }

    #[must_use]
    pub fn without_attribute(&self, name: &str) -> Self {
        if !self.attributes.contains_key(name) {
            return self.clone();
        }
        let mut attributes = IndexMap::clone(&self.attributes);
        attributes.shift_remove(name);
        Self { attributes: Arc::new(attributes), ..self.clone() }
    }
}

impl HttpMessage for ServerRequest {
    fn message(&self) -> &Message {
        self.request.message()
    }

    fn with_message(&self, message: Message) -> Self {
        Self { request: self.request.with_message(message), ..self.clone() }
    }
}

impl HttpRequest for ServerRequest {
    fn request(&self) -> &Request {
        &self.request
    }

    fn with_request(&self, request: Request) -> Self {
        Self { request, ..self.clone() }
    }
}

/// Builds a [`ServerRequest`] the way [`RequestBuilder`] builds a request.
#[derive(Debug)]
pub struct ServerRequestBuilder {
    request: RequestBuilder,
    server_params: IndexMap<String, String>,
}

impl ServerRequestBuilder {
    pub fn method<M: Into<String>>(mut self, method: M) -> Self {
        self.request = self.request.method(method);
        self
    }

    pub fn uri<U: IntoUri>(mut self, uri: U) -> Self {
        self.request = self.request.uri(uri);
        self
    }

    pub fn header<V: IntoHeaderValues>(mut self, name: &str, values: V) -> Self {
        self.request = self.request.header(name, values);
        self
    }

    pub fn headers<I, N, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: IntoHeaderValues,
    {
        self.request = self.request.headers(headers);
        self
    }

    pub fn body<B: Into<StreamSource>>(mut self, body: B) -> Self {
        self.request = self.request.body(body);
        self
    }

    pub fn protocol_version<P: Into<String>>(mut self, version: P) -> Self {
        self.request = self.request.protocol_version(version);
        self
    }

    pub fn server_params(mut self, server_params: IndexMap<String, String>) -> Self {
        self.server_params = server_params;
        self
    }

    /// # Errors
    ///
    /// See [`RequestBuilder::build`].
    pub fn build(self) -> Result<ServerRequest> {
        let request = self.request.build()?;
        Ok(ServerRequest::from_request(request, self.server_params))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::stream::Stream;
    use crate::upload::{UploadStatus, UploadedFile};

    fn request() -> ServerRequest {
        let server = IndexMap::from([("REQUEST_METHOD".to_owned(), "GET".to_owned())]);
        ServerRequest::new("GET", "http://example.com/search?q=rust&tags[]=a&tags[]=b", server).unwrap()
    }

    #[test]
    fn query_is_parsed_at_construction() {
        let request = request();
        assert_eq!(Value::Object(request.query_params().clone()), json!({"q": "rust", "tags": ["a", "b"]}));
        assert_eq!(request.server_params()["REQUEST_METHOD"], "GET");
    }

    #[test]
    fn typed_query_with_bracket_keys() {
        #[derive(Deserialize)]
        struct Search {
            q: String,
            tags: Vec<String>,
        }
        let request = request();
        assert!(request.uri().query().contains("%5B%5D"), "{}", request.uri().query());

        let search = request.query_as::<Search>().unwrap();
        assert_eq!(search.q, "rust");
        assert_eq!(search.tags, ["a", "b"]);
    }

    #[test]
    fn facets_are_replaced_independently() {
        let first = request();
        let second = first
            .with_cookie_params(IndexMap::from([("session".to_owned(), "abc".to_owned())]))
            .with_query_params(Map::new());

        assert!(first.cookie_params().is_empty());
        assert_eq!(second.cookie_params()["session"], "abc");
        assert!(second.query_params().is_empty());
        assert_eq!(first.query_params().len(), 2);
        assert_eq!(second.server_params(), first.server_params());
        assert_eq!(second.uri(), first.uri());
    }

    #[test]
    fn parsed_body_accepts_structures_only() {
        let request = request();
        assert_eq!(request.parsed_body(), &Value::Null);

        let with_body = request.with_parsed_body(json!({"a": 1})).unwrap();
        assert_eq!(with_body.parsed_body(), &json!({"a": 1}));
        assert!(with_body.with_parsed_body(json!([1, 2])).is_ok());
        assert!(with_body.with_parsed_body(Value::Null).unwrap().parsed_body().is_null());

        for invalid in [json!("text"), json!(1), json!(true)] {
            assert!(request.with_parsed_body(invalid).unwrap_err().is_invalid_argument());
        }
    }

    #[test]
    fn typed_parsed_body() {
        #[derive(Deserialize)]
        struct Login {
            user: String,
        }
        let request = request().with_parsed_body(json!({"user": "zava"})).unwrap();
        assert_eq!(request.parsed_body_as::<Login>().unwrap().user, "zava");
        assert!(request.parsed_body_as::<Vec<u8>>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn attributes_distinguish_absence() {
        let request = request().with_attribute("user_id", 42_u32).with_attribute("nothing", Option::<u32>::None);

        assert_eq!(request.attribute_or("user_id", 0_u32), 42);
        assert_eq!(request.attribute_or("missing", 7_u32), 7);
        assert!(request.has_attribute("nothing"));
        assert_eq!(request.attribute_or("nothing", Some(5_u32)), None);
        assert!(request.attribute("user_id").is_some_and(Attribute::is::<u32>));

        let removed = request.without_attribute("user_id");
        assert!(!removed.has_attribute("user_id"));
        assert!(request.has_attribute("user_id"));
        assert_eq!(removed.without_attribute("user_id").attributes().len(), 1);
    }

    #[test]
    fn uploaded_files() {
        let upload = UploadedFile::new(Stream::create("x").unwrap(), Some(1), UploadStatus::Ok, None, None).unwrap();
        let request = request().with_uploaded_files(IndexMap::from([("doc".to_owned(), UploadedNode::File(upload))]));
        assert_eq!(request.uploaded_files()["doc"].as_file().and_then(UploadedFile::size), Some(1));
    }

    #[test]
    fn message_derivation_keeps_facets() {
        let request = request().with_attribute("a", 1_i32).with_header("X-Trace", "t").unwrap().with_method("POST");
        assert_eq!(request.attribute_or("a", 0_i32), 1);
        assert_eq!(request.header_line("x-trace"), "t");
        assert_eq!(request.method(), "POST");
        assert_eq!(request.header_line("host"), "example.com");
    }

    #[test]
    fn builder_with_body() {
        let request = ServerRequest::builder()
            .method("POST")
            .uri("/submit")
            .header("Content-Type", "text/plain")
            .body("hello")
            .protocol_version("2")
            .build()
            .unwrap();
        assert_eq!(request.body().to_string(), "hello");
        assert_eq!(request.protocol_version(), "2");
        assert_eq!(request.request_target(), "/submit");
    }
}
