//! JSON request and response bodies.
//!
//! All binary fields are text-safe encoded strings; see [`crate::transcode`].

use serde::{Deserialize, Serialize};

/// Store an addressed payload for a set of recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Encoded payload bytes
    pub payload: String,
    /// Encoded sender identity
    pub from: String,
    /// Encoded recipient identities (order irrelevant)
    pub to: Vec<String>,
}

/// Response to a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    /// Encoded key of the stored payload
    pub key: String,
}

/// Fetch a payload the requester is entitled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveRequest {
    /// Encoded key
    pub key: String,
    /// Encoded requester identity
    pub to: String,
}

/// Response to a successful receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveResponse {
    /// Encoded payload bytes
    pub payload: String,
}

/// Request removal of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Encoded key
    pub key: String,
}

/// Reconciliation request from a peer node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    /// Resend mode
    #[serde(rename = "type")]
    pub resend_type: ResendType,
    /// Encoded public key of the identity to resend for
    pub public_key: String,
    /// Encoded key, only meaningful for [`ResendType::Individual`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Resend mode discriminator.
///
/// Unrecognized values are kept rather than rejected so the relay can decide
/// how to treat them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResendType {
    /// Re-push every payload owned by the identity to its node
    All,
    /// Return a single payload inline
    Individual,
    /// Any other discriminator
    Other(String),
}

impl From<String> for ResendType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "all" => ResendType::All,
            "individual" => ResendType::Individual,
            _ => ResendType::Other(value),
        }
    }
}

impl From<ResendType> for String {
    fn from(value: ResendType) -> Self {
        match value {
            ResendType::All => "all".to_string(),
            ResendType::Individual => "individual".to_string(),
            ResendType::Other(other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_parses() {
        let json = r#"{"payload":"aGVsbG8=","from":"AQI=","to":["AwQ=","BQY="]}"#;
        let req: SendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.payload, "aGVsbG8=");
        assert_eq!(req.to.len(), 2);
    }

    #[test]
    fn send_request_missing_field_fails() {
        let json = r#"{"payload":"aGVsbG8=","to":[]}"#;
        assert!(serde_json::from_str::<SendRequest>(json).is_err());
    }

    #[test]
    fn resend_request_uses_camel_case() {
        let json = r#"{"type":"individual","publicKey":"AQI=","key":"AwQ="}"#;
        let req: ResendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.resend_type, ResendType::Individual);
        assert_eq!(req.public_key, "AQI=");
        assert_eq!(req.key.as_deref(), Some("AwQ="));
    }

    #[test]
    fn resend_all_has_no_key() {
        let json = r#"{"type":"all","publicKey":"AQI="}"#;
        let req: ResendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.resend_type, ResendType::All);
        assert!(req.key.is_none());
    }

    #[test]
    fn unknown_resend_type_is_preserved() {
        let json = r#"{"type":"bogus","publicKey":"AQI="}"#;
        let req: ResendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.resend_type, ResendType::Other("bogus".to_string()));
    }

    #[test]
    fn resend_request_serializes_discriminator() {
        let req = ResendRequest {
            resend_type: ResendType::All,
            public_key: "AQI=".to_string(),
            key: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"all","publicKey":"AQI="}"#);
    }

    #[test]
    fn send_response_shape() {
        let resp = SendResponse {
            key: "a2V5".to_string(),
        };
        assert_eq!(serde_json::to_string(&resp).unwrap(), r#"{"key":"a2V5"}"#);
    }
}
