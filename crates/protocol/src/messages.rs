use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Session negotiation
// ---------------------------------------------------------------------------

/// Body of the negotiation `POST`: `{ "<file_key>": "<name>" }`.
///
/// The key name differs between protocol versions, so it is carried
/// alongside the value rather than fixed by a serde attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub file_key: String,
    pub name: String,
}

impl SessionRequest {
    pub fn new(file_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            file_key: file_key.into(),
            name: name.into(),
        }
    }

    /// Encodes the request body.
    pub fn to_json(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut body = serde_json::Map::new();
        body.insert(
            self.file_key.clone(),
            serde_json::Value::String(self.name.clone()),
        );
        Ok(serde_json::to_vec(&body)?)
    }
}

/// Successful negotiation response: `{ "data": "<session uri>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub data: String,
}

impl SessionResponse {
    /// Decodes a response body. An empty session URI is treated as malformed.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        let resp: SessionResponse = serde_json::from_slice(body)?;
        if resp.data.trim().is_empty() {
            return Err(ProtocolError::Json(serde::de::Error::custom(
                "empty session uri",
            )));
        }
        Ok(resp)
    }
}
