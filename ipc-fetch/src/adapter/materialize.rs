//! Response body materialization.
//!
//! Turns a [`BodyStream`] into the representation named by a
//! [`ResponseType`]. Everything but [`ResponseType::Stream`] drains the body
//! first.

use axum::body::Body;
use axum::extract::{Form, FromRequest, Multipart};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request};

use super::config::ResponseType;
use crate::error::FetchError;
use crate::streaming::BodyStream;

/// Bytes tagged with a content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    content_type: String,
    bytes: Bytes,
}

impl Blob {
    /// Create a blob. The content type is lowercased.
    pub fn new(content_type: &str, bytes: Bytes) -> Self {
        Self {
            content_type: content_type.to_ascii_lowercase(),
            bytes,
        }
    }

    /// The content type, empty when the response had none.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The contents.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The contents as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// A single form field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValue {
    /// A plain field.
    Text(String),
    /// A file part.
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Bytes,
    },
}

impl FormValue {
    /// The value of a plain field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File { .. } => None,
        }
    }
}

/// Decoded form fields in body order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    /// The first value for `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Every value for `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A materialized response body.
#[derive(Debug)]
pub enum ResponseData {
    ArrayBuffer(Bytes),
    Blob(Blob),
    FormData(FormData),
    Json(serde_json::Value),
    Text(String),
    Stream(BodyStream),
    /// The response has no body.
    Null,
}

impl ResponseData {
    /// The text, for [`ResponseData::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The JSON value, for [`ResponseData::Json`].
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The raw bytes, for [`ResponseData::ArrayBuffer`] and [`ResponseData::Blob`].
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::ArrayBuffer(bytes) => Some(bytes),
            ResponseData::Blob(blob) => Some(blob.bytes()),
            _ => None,
        }
    }

    /// Take the stream, for [`ResponseData::Stream`].
    pub fn into_stream(self) -> Option<BodyStream> {
        match self {
            ResponseData::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Returns true for [`ResponseData::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, ResponseData::Null)
    }
}

/// Read `body` into the requested representation.
pub(crate) async fn materialize(
    body: BodyStream,
    response_type: ResponseType,
    content_type: Option<&str>,
) -> Result<ResponseData, FetchError> {
    let data = match response_type {
        ResponseType::Stream => ResponseData::Stream(body),
        ResponseType::ArrayBuffer => ResponseData::ArrayBuffer(body.collect_bytes().await?),
        ResponseType::Blob => {
            let bytes = body.collect_bytes().await?;
            ResponseData::Blob(Blob::new(content_type.unwrap_or_default(), bytes))
        }
        ResponseType::Json => {
            let bytes = body.collect_bytes().await?;
            let value =
                serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
            ResponseData::Json(value)
        }
        ResponseType::Text => {
            let bytes = body.collect_bytes().await?;
            ResponseData::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        ResponseType::FormData => {
            let bytes = body.collect_bytes().await?;
            ResponseData::FormData(decode_form_data(content_type, bytes).await?)
        }
    };
    Ok(data)
}

/// Decode a multipart or urlencoded body.
pub(crate) async fn decode_form_data(
    content_type: Option<&str>,
    bytes: Bytes,
) -> Result<FormData, FetchError> {
    let content_type = content_type
        .ok_or_else(|| FetchError::Decode("form data requires a content type".into()))?;
    let mime = content_type.to_ascii_lowercase();

    let request = Request::builder()
        .method(Method::POST)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .map_err(|e| FetchError::Decode(e.to_string()))?;

    let mut entries = Vec::new();
    if mime.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            let file_name = field.file_name().map(str::to_owned);
            let part_type = field.content_type().map(str::to_owned);
            let data = field
                .bytes()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;

            let value = match file_name {
                Some(file_name) => FormValue::File {
                    file_name,
                    content_type: part_type,
                    bytes: data,
                },
                None => FormValue::Text(String::from_utf8_lossy(&data).into_owned()),
            };
            entries.push((name, value));
        }
    } else if mime.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        entries = pairs
            .into_iter()
            .map(|(name, value)| (name, FormValue::Text(value)))
            .collect();
    } else {
        return Err(FetchError::Decode(format!(
            "cannot read form data from {content_type}"
        )));
    }

    Ok(FormData { entries })
}
