use reqwest::StatusCode;
use serde_json::Value;
use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::error::RemoteCallError;

const EMPTY_BODY_MESSAGE: &str = "<empty response body>";

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

pub(crate) fn api_request_error(err: reqwest::Error, api_url: &str) -> RemoteCallError {
    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return RemoteCallError::ConnectionRefused {
                url: api_url.to_string(),
            };
        }

        return RemoteCallError::Connect {
            url: api_url.to_string(),
        };
    }

    RemoteCallError::Request {
        url: api_url.to_string(),
        source: err,
    }
}

pub(crate) fn error_body_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => EMPTY_BODY_MESSAGE.to_string(),
        None => body.trim().to_string(),
    }
}

pub(crate) fn api_status_error(status: StatusCode, body: &str) -> RemoteCallError {
    let message = error_body_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteCallError::Unauthorized { status, message }
        }
        _ => RemoteCallError::Status { status, message },
    }
}
