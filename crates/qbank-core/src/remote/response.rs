//! Decoding remote replies at the transport boundary

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of one remote call
pub type Response<T> = std::result::Result<T, RemoteError>;

/// Why a remote call produced no usable payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The server reported an exception
    #[error("{message}")]
    Exception {
        exception: Option<String>,
        message: String,
        debuginfo: Option<String>,
    },

    /// The reply was not JSON or did not have the expected shape
    #[error("Malformed response: {reason}")]
    Malformed { reason: String },

    /// The transport could not complete the round trip
    #[error("Transport failure: {message}")]
    Transport { message: String },
}

impl RemoteError {
    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception {
            exception: None,
            message: message.into(),
            debuginfo: None,
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
        }
    }
}

/// Decode a raw reply into `T`.
///
/// Replies that are not JSON, or that are a JSON object carrying an
/// `exception` key, are errors; nothing past this point inspects raw JSON.
pub fn decode_response<T: DeserializeOwned>(raw: &str) -> Response<T> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| RemoteError::malformed(format!("invalid JSON: {e}")))?;

    if let Some(object) = value.as_object()
        && object.contains_key("exception")
    {
        let text = |key: &str| object.get(key).and_then(Value::as_str).map(String::from);
        return Err(RemoteError::Exception {
            exception: text("exception"),
            message: text("message").unwrap_or_else(|| "unknown remote exception".to_string()),
            debuginfo: text("debuginfo"),
        });
    }

    serde_json::from_value(value).map_err(|e| RemoteError::malformed(e.to_string()))
}
