//! Decoding of query strings and request bodies into structured values.
//!
//! Query strings and url encoded forms accept bracketed keys that build nested structures:
//!
//! ```not_rust
//! a=1&b[x]=2&b[y]=3&c[]=4&c[]=5  =>  {"a": "1", "b": {"x": "2", "y": "3"}, "c": ["4", "5"]}
//! ```
//!
//! A later key overrides an earlier one, and containers whose keys are exactly `0..n` are
//! rendered as lists.

use mime::Mime;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{MessageError, Result};

/// Deepest `a[b][c]` nesting decoded by [`query_as`].
const QUERY_MAX_DEPTH: usize = 5;

/// Parses a query string or url encoded form body.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let pairs = match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!(cause = %e, "unable to decode query string");
            return Map::new();
        }
    };

    let mut map = Map::new();
    for (key, value) in pairs {
        let (base, segments) = split_key(&key);
        if base.is_empty() {
            continue;
        }
        assign(&mut map, base.to_owned(), &segments, value);
    }

    map.values_mut().for_each(listify);
    map
}

/// Decodes a query string into `T`, nested keys included. Brackets may be percent-encoded, as
/// they are in a [`Uri`](crate::uri::Uri) query.
///
/// # Errors
///
/// Returns [`MessageError::InvalidArgument`] when the query does not fit `T`.
pub fn query_as<T: DeserializeOwned>(query: &str) -> Result<T> {
    serde_qs::Config::new(QUERY_MAX_DEPTH, false)
        .deserialize_str::<T>(query)
        .map_err(|e| MessageError::invalid_argument(format!("unable to decode query: {e}")))
}

/// Decodes a request body according to its content type.
///
/// Url encoded forms and json documents (including `+json` types) are decoded from `body`,
/// multipart forms yield the pre-parsed `form` fields, anything else is [`Value::Null`]. A
/// url encoded request with an empty body falls back to `form` as well.
///
/// # Errors
///
/// Returns [`MessageError::InvalidArgument`] when a json body is malformed.
pub fn decode_parsed_body(content_type: Option<&str>, body: &[u8], form: Option<&Map<String, Value>>) -> Result<Value> {
    let Some(mime) = content_type.and_then(|value| value.parse::<Mime>().ok()) else {
        return Ok(Value::Null);
    };
    let fields = || Value::Object(form.cloned().unwrap_or_default());

    if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED {
        if body.is_empty() {
            return Ok(fields());
        }
        trace!(len = body.len(), "decoding url encoded body");
        return Ok(Value::Object(parse_query(&String::from_utf8_lossy(body))));
    }

    if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA {
        return Ok(fields());
    }

    if mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON) {
        if body.is_empty() {
            return Ok(Value::Null);
        }
        trace!(len = body.len(), "decoding json body");
        return serde_json::from_slice(body)
            .map_err(|e| MessageError::invalid_argument(format!("malformed json body: {e}")));
    }

    Ok(Value::Null)
}

/// Splits `a[b][]` into `a` and `["b", ""]`. Text after the last complete bracket is dropped.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[').filter(|&open| open > 0) else {
        return (key, Vec::new());
    };

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else { break };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if segments.is_empty() {
        return (key, segments);
    }
    (&key[..open], segments)
}

fn assign(map: &mut Map<String, Value>, key: String, segments: &[&str], value: String) {
    let Some((next, rest)) = segments.split_first() else {
        map.insert(key, Value::String(value));
        return;
    };

    let entry = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        let next = if next.is_empty() { next_index(child).to_string() } else { (*next).to_owned() };
        assign(child, next, rest, value);
    }
}

fn next_index(map: &Map<String, Value>) -> u64 {
    map.keys().filter_map(|key| key.parse::<u64>().ok()).max().map_or(0, |max| max + 1)
}

fn listify(value: &mut Value) {
    let Value::Object(map) = value else { return };
    map.values_mut().for_each(listify);

    let sequential = map.keys().enumerate().all(|(index, key)| key.parse::<usize>().ok() == Some(index));
    if sequential && !map.is_empty() {
        let items = std::mem::take(map).into_iter().map(|(_, item)| item).collect();
        *value = Value::Array(items);
    }
}
