//! Payloads exchanged by the `open` and `send` calls.

use serde::{Deserialize, Serialize};

/// Identifier of a host-side resource (pending request, body, abort handle).
pub type ResourceId = u32;

/// Status codes whose responses never carry a body.
pub const NULL_BODY_STATUSES: [u16; 5] = [101, 103, 204, 205, 304];

/// Returns whether a response with this status has no body.
pub fn is_null_body_status(status: u16) -> bool {
    NULL_BODY_STATUSES.contains(&status)
}

/// Configuration sent with the `open` call.
///
/// `body` is `None` when the request has no payload; a present body is never
/// empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Identifiers returned by the `open` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferIds {
    /// The parked request (`resourceId`).
    pub rid: ResourceId,
    /// Send-side transaction id, also the key for `cancel` (`sendTxId`).
    pub txid: ResourceId,
    /// Receive-side transaction id (`receiveTxId`).
    pub rxid: ResourceId,
}

/// Status line, headers and body handle returned by the `send` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub bodyid: Option<ResourceId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_body_statuses() {
        for status in [101, 103, 204, 205, 304] {
            assert!(is_null_body_status(status), "{status}");
        }
        for status in [100, 200, 201, 206, 301, 404, 500] {
            assert!(!is_null_body_status(status), "{status}");
        }
    }

    #[test]
    fn test_response_meta_wire_names() {
        let meta = ResponseMeta {
            status: 200,
            status_text: "OK".into(),
            headers: vec![("content-type".into(), "text/plain".into())],
            bodyid: Some(7),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["statusText"], "OK");
        assert_eq!(json["bodyid"], 7);
        assert_eq!(json["headers"][0][0], "content-type");
    }

    #[test]
    fn test_response_meta_missing_bodyid() {
        let meta: ResponseMeta =
            serde_json::from_str(r#"{"status":204,"statusText":"No Content","headers":[]}"#)
                .unwrap();
        assert_eq!(meta.bodyid, None);
    }

    #[test]
    fn test_open_request_null_body() {
        let conf = OpenRequest {
            method: "GET".into(),
            uri: "http://localhost/".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&conf).unwrap();
        assert!(json["body"].is_null());
    }
}
