//! Outbound request bodies.
//!
//! This module provides [`RequestBody`], the payload of a [`FetchRequest`].
//! Bodies are fully buffered: the `open` call carries the whole payload.
//!
//! [`FetchRequest`]: crate::FetchRequest

use bytes::Bytes;
use serde::Serialize;

const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";
const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// A request body.
///
/// The `Text`, `Json` and `Form` variants carry an implied `content-type`
/// which is applied only when the caller did not set one.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Raw bytes, sent without an implied content type.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// A JSON document.
    Json(serde_json::Value),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        RequestBody::Empty
    }

    /// Create a body from raw bytes.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        RequestBody::Bytes(data.into())
    }

    /// Create a text body.
    pub fn text(text: impl Into<String>) -> Self {
        RequestBody::Text(text.into())
    }

    /// Serialize a value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(RequestBody::Json)
    }

    /// Create a URL-encoded form body.
    pub fn form<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The content type implied by this body, if any.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Empty | RequestBody::Bytes(_) => None,
            RequestBody::Text(_) => Some(TEXT_CONTENT_TYPE),
            RequestBody::Json(_) => Some(JSON_CONTENT_TYPE),
            RequestBody::Form(_) => Some(FORM_CONTENT_TYPE),
        }
    }

    /// Serialize into the byte payload carried by the `open` call.
    ///
    /// Returns `None` for an absent body and for any body that serializes to
    /// zero bytes.
    pub fn into_payload(self) -> Option<Vec<u8>> {
        let bytes = match self {
            RequestBody::Empty => return None,
            RequestBody::Bytes(b) => b.to_vec(),
            RequestBody::Text(s) => s.into_bytes(),
            RequestBody::Json(v) => v.to_string().into_bytes(),
            RequestBody::Form(fields) => form_urlencode(&fields),
        };
        if bytes.is_empty() { None } else { Some(bytes) }
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(b: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(b))
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Text(s)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Text(s.to_owned())
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(v: serde_json::Value) -> Self {
        RequestBody::Json(v)
    }
}

/// Form fields serialized in order, duplicates kept.
struct FormFields<'a>(&'a [(String, String)]);

impl Serialize for FormFields<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// Serialize fields as `application/x-www-form-urlencoded`.
fn form_urlencode(fields: &[(String, String)]) -> Vec<u8> {
    match serde_qs::to_string(&FormFields(fields)) {
        Ok(encoded) => encoded.into_bytes(),
        Err(e) => {
            tracing::debug!(error = %e, "dropping unencodable form body");
            Vec::new()
        }
    }
}
