use std::sync::Arc;

use http::{HeaderName, HeaderValue};
use indexmap::IndexMap;
use micro_message::params::decode_parsed_body;
use micro_message::protocol::{HttpMessage, Request, ServerRequest};
use micro_message::upload::{Relocate, TrustedRelocate, UploadRegistry, normalize_files};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::AdapterConfig;
use crate::env::Environment;
use crate::error::Result;

/// Builds [`Request`] and [`ServerRequest`] values out of an [`Environment`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Adapter {
    config: AdapterConfig,
}

impl Adapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Fails when the environment describes an invalid uri.
    pub fn request(&self, environment: &Environment) -> Result<Request> {
        let request = Request::builder()
            .method(environment.method())
            .uri(environment.uri()?)
            .headers(self.headers(environment))
            .body(environment.body().clone())
            .protocol_version(environment.protocol_version())
            .build()?;
        Ok(request)
    }

    /// Builds a server request carrying the full meta-variable snapshot, the cookies, the
    /// query, the decoded body and the uploaded files.
    ///
    /// A body that can not be decoded is logged and left as null.
    ///
    /// # Errors
    ///
    /// Fails when the environment describes an invalid uri or malformed upload descriptors.
    pub fn server_request(&self, environment: &Environment) -> Result<ServerRequest> {
        let request = ServerRequest::builder()
            .method(environment.method())
            .uri(environment.uri()?)
            .headers(self.headers(environment))
            .body(environment.body().clone())
            .protocol_version(environment.protocol_version())
            .server_params(environment.vars().clone())
            .build()?
            .with_cookie_params(environment.cookies());

        let request = match parsed_body(&request, environment) {
            Value::Null => request,
            body => request.with_parsed_body(body).unwrap_or_else(|e| {
                warn!(cause = %e, "decoded body is not a structured value");
                request
            }),
        };

        if environment.files().is_empty() {
            return Ok(request);
        }
        let files = normalize_files(environment.files(), &self.relocate(environment.files()))?;
        debug!(fields = files.len(), trusted = self.config.trust_uploads(), "normalized uploaded files");
        Ok(request.with_uploaded_files(files))
    }

    /// The environment headers that are valid http, the others are logged and dropped.
    fn headers(&self, environment: &Environment) -> IndexMap<String, String> {
        let mut headers = environment.headers(self.config.title_case_headers());
        headers.retain(|name, value| {
            let valid = HeaderName::from_bytes(name.as_bytes()).is_ok() && HeaderValue::from_str(value).is_ok();
            if !valid {
                warn!(header = %name, "dropping invalid header");
            }
            valid
        });
        headers
    }

    fn relocate(&self, files: &Map<String, Value>) -> Arc<dyn Relocate> {
        if self.config.trust_uploads() {
            return Arc::new(TrustedRelocate);
        }
        let registry = UploadRegistry::new();
        for path in temporary_paths(files) {
            registry.register(path);
        }
        Arc::new(registry)
    }
}

/// The body decoded by media type. Form fields handed over by a front end stand in when the
/// body yields nothing.
fn parsed_body(request: &ServerRequest, environment: &Environment) -> Value {
    let content_type = request.header_line("content-type");
    let content_type = Some(content_type.as_str()).filter(|content_type| !content_type.is_empty());
    let body = decode_parsed_body(content_type, environment.body(), environment.form()).unwrap_or_else(|e| {
        warn!(cause = %e, content_type = ?content_type, "failed to decode request body");
        Value::Null
    });

    match (body, environment.form()) {
        (Value::Null, Some(form)) => Value::Object(form.clone()),
        (body, _) => body,
    }
}

/// Every `tmp_name` in the descriptors, however deeply they are nested.
fn temporary_paths(files: &Map<String, Value>) -> Vec<&str> {
    fn strings<'a>(value: &'a Value, paths: &mut Vec<&'a str>) {
        match value {
            Value::String(path) => paths.push(path),
            Value::Array(values) => values.iter().for_each(|value| strings(value, paths)),
            Value::Object(map) => map.values().for_each(|value| strings(value, paths)),
            _ => {}
        }
    }

    fn walk<'a>(map: &'a Map<String, Value>, paths: &mut Vec<&'a str>) {
        for (key, value) in map {
            match value {
                value if key == "tmp_name" => strings(value, paths),
                Value::Object(nested) => walk(nested, paths),
                Value::Array(values) => {
                    values.iter().filter_map(Value::as_object).for_each(|nested| walk(nested, paths));
                }
                _ => {}
            }
        }
    }

    let mut paths = Vec::new();
    walk(files, &mut paths);
    paths.retain(|path| !path.is_empty());
    paths
}
