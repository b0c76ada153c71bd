use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to read file '{}': {source}", path.display())]
pub struct FileAccessError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error(
        "Connection refused by chat API at '{url}'. \
         Check OPENAI_BASE_URL and network connectivity."
    )]
    ConnectionRefused { url: String },

    #[error(
        "Failed to connect to chat API at '{url}'. \
         Check OPENAI_BASE_URL and network connectivity."
    )]
    Connect { url: String },

    #[error("Failed to call chat API at '{url}': {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Chat API rejected the request with status {status}: {message}. Check OPENAI_API_KEY.")]
    Unauthorized { status: StatusCode, message: String },

    #[error("Chat request failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Malformed chat response: {0}")]
    MalformedResponse(String),
}
