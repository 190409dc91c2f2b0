//! Turns raw multipart upload descriptors into an [`UploadedNode`] tree.
//!
//! CGI style servers describe a field holding several files by attribute instead of by file:
//!
//! ```not_rust
//! photos => { name => [a.png, b.png], type => [image/png, image/png], size => [10, 20], .. }
//! ```
//!
//! which is transposed into one record per file, `record[i][attr] = raw[attr][i]`, before any
//! [`UploadedFile`] is built. Deeper nesting (`photos[album][0]`) is transposed recursively.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Relocate, UploadStatus, UploadedFile, UploadedNode};
use crate::error::{MessageError, Result};

/// One upload, as described by the server.
#[derive(Debug, Deserialize)]
struct FileRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    media_type: Option<String>,
    #[serde(default)]
    tmp_name: String,
    #[serde(default)]
    error: UploadStatus,
    #[serde(default)]
    size: Option<u64>,
}

/// Builds the uploaded files tree from raw descriptors keyed by form field name.
///
/// Path backed uploads are moved with `relocate`.
///
/// # Errors
///
/// Returns [`MessageError::InvalidArgument`] when a descriptor is malformed.
pub fn normalize_files(raw: &Map<String, Value>, relocate: &Arc<dyn Relocate>) -> Result<IndexMap<String, UploadedNode>> {
    raw.iter().map(|(field, value)| Ok((field.clone(), normalize(field, value, relocate)?))).collect()
}

fn normalize(field: &str, value: &Value, relocate: &Arc<dyn Relocate>) -> Result<UploadedNode> {
    let descriptor = match value {
        Value::Array(items) => {
            return items.iter().map(|item| normalize(field, item, relocate)).collect::<Result<_>>().map(UploadedNode::List);
        }
        Value::Object(descriptor) => descriptor,
        _ => return Err(malformed(field, "expected an object or a list")),
    };

    match descriptor.get("name") {
        Some(Value::Array(names)) => (0..names.len())
            .map(|index| normalize(field, &Value::Object(transpose(descriptor, &index.to_string())), relocate))
            .collect::<Result<_>>()
            .map(UploadedNode::List),
        Some(Value::Object(names)) => names
            .keys()
            .map(|key| Ok((key.clone(), normalize(field, &Value::Object(transpose(descriptor, key)), relocate)?)))
            .collect::<Result<_>>()
            .map(UploadedNode::Map),
        Some(_) => file(field, descriptor, relocate).map(UploadedNode::File),
        None => descriptor
            .iter()
            .map(|(key, child)| Ok((key.clone(), normalize(field, child, relocate)?)))
            .collect::<Result<_>>()
            .map(UploadedNode::Map),
    }
}

/// Picks the `key` entry of every attribute.
fn transpose(descriptor: &Map<String, Value>, key: &str) -> Map<String, Value> {
    descriptor
        .iter()
        .filter_map(|(attribute, values)| {
            let value = match values {
                Value::Array(list) => key.parse::<usize>().ok().and_then(|index| list.get(index)),
                Value::Object(map) => map.get(key),
                _ => None,
            };
            value.map(|value| (attribute.clone(), value.clone()))
        })
        .collect()
}

fn file(field: &str, descriptor: &Map<String, Value>, relocate: &Arc<dyn Relocate>) -> Result<UploadedFile> {
    let record = FileRecord::deserialize(Value::Object(descriptor.clone())).map_err(|e| malformed(field, e))?;
    let file = UploadedFile::new(record.tmp_name, record.size, record.error, record.name, record.media_type)?;
    Ok(file.relocated_by(Arc::clone(relocate)))
}

fn malformed<E: std::fmt::Display>(field: &str, cause: E) -> MessageError {
    MessageError::invalid_argument(format!("malformed upload descriptor for field {field:?}: {cause}"))
}
