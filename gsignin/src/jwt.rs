//! Compact JSON Web Token parsing.
//!
//! Tokens are decoded, not verified: the signature segment is kept as an
//! opaque string. See [`IdTokenVerifier`](crate::IdTokenVerifier) for
//! signature checks.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::base64url;

pub type JsonObject = Map<String, Value>;

#[derive(Clone, PartialEq)]
pub struct JsonWebToken {
    encoded: String,
    header: JsonObject,
    payload: JsonObject,
    signature: String,
}

impl JsonWebToken {
    /// Parses a `header.payload.signature` token.
    ///
    /// Returns `None` on the first malformed part.
    pub fn parse(encoded: &str) -> Option<Self> {
        let segments = encoded.split('.').collect::<Vec<_>>();
        let [header, payload, signature] = segments[..] else {
            tracing::trace!(segments = segments.len(), "JWT must have 3 segments");
            return None;
        };
        if header.is_empty() || payload.is_empty() || signature.is_empty() {
            tracing::trace!("JWT has an empty segment");
            return None;
        }

        Some(Self {
            encoded: encoded.to_owned(),
            header: decode_object(header, "header")?,
            payload: decode_object(payload, "payload")?,
            signature: signature.to_owned(),
        })
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn header(&self) -> &JsonObject {
        &self.header
    }

    pub fn payload(&self) -> &JsonObject {
        &self.payload
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the payload claim `name` if it is a string.
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }
}

impl fmt::Debug for JsonWebToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWebToken")
            .field("header", &self.header)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

fn decode_object(segment: &str, part: &'static str) -> Option<JsonObject> {
    let Some(bytes) = base64url::decode(segment) else {
        tracing::trace!(part, "JWT segment is not valid base64url");
        return None;
    };
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => {
            tracing::trace!(part, "JWT segment is not a JSON object");
            None
        }
        Err(e) => {
            tracing::trace!(part, %e, "JWT segment is not valid JSON");
            None
        }
    }
}

/// Identity asserted by Google in the `id_token` of a token response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdToken {
    pub name: String,
    pub email: String,
    #[serde(rename = "id_token", serialize_with = "serialize_encoded")]
    pub token: JsonWebToken,
}

impl IdToken {
    /// Requires string `name` and `email` claims.
    pub fn from_jwt(token: JsonWebToken) -> Option<Self> {
        let name = token.string_claim("name")?.to_owned();
        let email = token.string_claim("email")?.to_owned();
        Some(Self { name, email, token })
    }

    pub fn parse(encoded: &str) -> Option<Self> {
        let token = JsonWebToken::parse(encoded)?;
        let id_token = Self::from_jwt(token);
        if id_token.is_none() {
            tracing::debug!("ID token lacks a string name or email claim");
        }
        id_token
    }

    /// The original encoded token, for handing to a backend.
    pub fn raw(&self) -> &str {
        self.token.encoded()
    }
}

fn serialize_encoded<S: serde::Serializer>(token: &JsonWebToken, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(token.encoded())
}
