//! Echoes the received request as json. Install it as a cgi script or feed it by hand:
//!
//! ```not_rust
//! REQUEST_METHOD=POST SERVER_NAME=localhost PATH_INFO=/api CONTENT_TYPE=application/json \
//!     CONTENT_LENGTH=17 cargo run --example dump_request <<< '{"hello":"world"}'
//! ```

use micro_cgi::{Adapter, AdapterConfig, Environment};
use micro_message::protocol::{HttpMessage, HttpRequest};
use serde_json::{Map, Value, json};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).with_writer(std::io::stderr).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let environment = match Environment::from_process() {
        Ok(environment) => environment,
        Err(e) => {
            error!(cause = %e, "failed to read environment");
            return;
        }
    };

    let adapter = Adapter::new(AdapterConfig::builder().title_case_headers(true).build());
    let request = match adapter.server_request(&environment) {
        Ok(request) => request,
        Err(e) => {
            error!(cause = %e, "failed to build request");
            print!("Status: 400 Bad Request\r\n\r\n");
            return;
        }
    };
    info!(method = %request.method(), uri = %request.uri(), "received request");

    let headers: Map<String, Value> =
        request.headers().iter().map(|(name, values)| (name.to_owned(), json!(values))).collect();
    let cookies: Map<String, Value> =
        request.cookie_params().iter().map(|(name, value)| (name.clone(), json!(value))).collect();
    let files: Map<String, Value> = request
        .uploaded_files()
        .iter()
        .map(|(field, node)| {
            let files: Vec<_> = node
                .files()
                .into_iter()
                .map(|file| json!({"name": file.client_filename(), "type": file.client_media_type(), "size": file.size()}))
                .collect();
            (field.clone(), json!(files))
        })
        .collect();

    let dump = json!({
        "method": request.method(),
        "uri": request.uri().to_string(),
        "protocol_version": request.protocol_version(),
        "headers": headers,
        "query_params": request.query_params(),
        "cookie_params": cookies,
        "parsed_body": request.parsed_body(),
        "uploaded_files": files,
        "custom_header": request.header_line("x-custom-header"),
    });

    print!("Content-Type: application/json; charset=utf-8\r\n\r\n");
    match serde_json::to_string_pretty(&dump) {
        Ok(body) => println!("{body}"),
        Err(e) => error!(cause = %e, "failed to serialize request"),
    }
}
