use std::io;

use micro_message::MessageError;
use thiserror::Error;

pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("invalid server port `{value}`")]
    InvalidServerPort { value: String },

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("failed to read request body: {0}")]
    Io(#[from] io::Error),
}

impl AdapterError {
    pub(crate) fn invalid_server_port<S: Into<String>>(value: S) -> Self {
        Self::InvalidServerPort { value: value.into() }
    }
}
