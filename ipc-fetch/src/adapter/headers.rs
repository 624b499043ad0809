//! Header normalization.
//!
//! Headers reach the adapter in one of three shapes; each has its own
//! normalizer producing a flat name/value map. A source that cannot be
//! normalized degrades to an empty map.

use std::collections::BTreeMap;

use http::HeaderMap;
use serde_json::Value;

/// Flat header mapping handed back to adapter callers.
pub type HeaderObject = BTreeMap<String, String>;

/// Accepted header inputs.
#[derive(Clone, Debug)]
pub enum HeaderSource {
    /// A JSON object, as produced by a header container's serialized form.
    /// Array values are joined with `", "` and `null` values are skipped.
    Serialized(Value),
    /// A native header map. Repeated names are joined with `", "`.
    Native(HeaderMap),
    /// Plain pairs. A later pair replaces an earlier one with the same name.
    Plain(Vec<(String, String)>),
}

impl Default for HeaderSource {
    fn default() -> Self {
        HeaderSource::Plain(Vec::new())
    }
}

impl HeaderSource {
    /// Normalize into a flat mapping, or an empty one on failure.
    pub fn normalize(&self) -> HeaderObject {
        let result = match self {
            HeaderSource::Serialized(value) => from_serialized(value),
            HeaderSource::Native(headers) => from_native(headers),
            HeaderSource::Plain(pairs) => Ok(from_plain(pairs)),
        };
        result.unwrap_or_else(|reason| {
            tracing::debug!(%reason, "header normalization failed, sending no headers");
            HeaderObject::new()
        })
    }

    /// Append a header, converting this source into plain pairs.
    pub(crate) fn with(self, name: String, value: String) -> Self {
        let mut pairs = match self {
            HeaderSource::Plain(pairs) => pairs,
            other => other.normalize().into_iter().collect(),
        };
        pairs.push((name, value));
        HeaderSource::Plain(pairs)
    }
}

impl From<Value> for HeaderSource {
    fn from(value: Value) -> Self {
        HeaderSource::Serialized(value)
    }
}

impl From<HeaderMap> for HeaderSource {
    fn from(headers: HeaderMap) -> Self {
        HeaderSource::Native(headers)
    }
}

impl From<Vec<(String, String)>> for HeaderSource {
    fn from(pairs: Vec<(String, String)>) -> Self {
        HeaderSource::Plain(pairs)
    }
}

impl From<HeaderObject> for HeaderSource {
    fn from(map: HeaderObject) -> Self {
        HeaderSource::Plain(map.into_iter().collect())
    }
}

fn from_serialized(value: &Value) -> Result<HeaderObject, String> {
    let object = match value {
        Value::Null => return Ok(HeaderObject::new()),
        Value::Object(object) => object,
        other => return Err(format!("expected a header object, got {other}")),
    };

    let mut headers = HeaderObject::new();
    for (name, value) in object {
        let value = match value {
            Value::Null => continue,
            Value::Array(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Result<Vec<_>, _>>()?
                .join(", "),
            other => scalar_to_string(other)?,
        };
        headers.insert(name.clone(), value);
    }
    Ok(headers)
}

fn scalar_to_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("unsupported header value {other}")),
    }
}

fn from_native(headers: &HeaderMap) -> Result<HeaderObject, String> {
    let mut object = HeaderObject::new();
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().map_err(|e| format!("header {name}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        object.insert(name.as_str().to_owned(), values.join(", "));
    }
    Ok(object)
}

fn from_plain(pairs: &[(String, String)]) -> HeaderObject {
    pairs.iter().cloned().collect()
}

/// Flatten response headers.
pub(crate) fn headers_to_object(headers: &HeaderMap) -> HeaderObject {
    HeaderSource::Native(headers.clone()).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_serialized_source() {
        let source = HeaderSource::from(json!({
            "Accept": "application/json",
            "X-Retry": 3,
            "X-Flag": true,
            "X-List": ["a", "b"],
            "X-Unset": null,
        }));
        let headers = source.normalize();
        assert_eq!(headers.get("Accept").unwrap(), "application/json");
        assert_eq!(headers.get("X-Retry").unwrap(), "3");
        assert_eq!(headers.get("X-Flag").unwrap(), "true");
        assert_eq!(headers.get("X-List").unwrap(), "a, b");
        assert!(!headers.contains_key("X-Unset"));
    }

    #[test]
    fn test_serialized_failure_degrades_to_empty() {
        assert!(HeaderSource::from(json!("not an object")).normalize().is_empty());
        assert!(HeaderSource::from(json!({"x": {"nested": 1}})).normalize().is_empty());
        assert!(HeaderSource::from(Value::Null).normalize().is_empty());
    }

    #[test]
    fn test_native_source_joins_repeats() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));
        map.insert("content-type", HeaderValue::from_static("text/plain"));

        let headers = HeaderSource::from(map).normalize();
        assert_eq!(headers.get("set-cookie").unwrap(), "a=1, b=2");
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn test_native_failure_degrades_to_empty() {
        let mut map = HeaderMap::new();
        map.insert("x-ok", HeaderValue::from_static("fine"));
        map.insert("x-bin", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());
        assert!(HeaderSource::from(map).normalize().is_empty());
    }

    #[test]
    fn test_plain_source_last_wins() {
        let source = HeaderSource::from(vec![
            ("x-a".to_string(), "1".to_string()),
            ("x-a".to_string(), "2".to_string()),
        ]);
        assert_eq!(source.normalize().get("x-a").unwrap(), "2");
    }

    #[test]
    fn test_with_converts_to_plain() {
        let source = HeaderSource::from(json!({"accept": "text/plain"}))
            .with("x-extra".into(), "yes".into());
        let HeaderSource::Plain(pairs) = &source else {
            panic!("expected plain pairs");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(source.normalize().get("x-extra").unwrap(), "yes");
    }
}
