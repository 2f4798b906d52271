//! JSON wire format for sync requests and responses.
//!
//! Byte fields travel as arrays of numbers. Absent fields decode to empty
//! values, so `{}` is a well-formed request with an empty user, an empty token
//! and no candidates.

use crate::application::ports::{DecodeError, RequestDecoder};
use crate::domain::identifier::Identifier;
use crate::domain::sync::{SyncOutcome, SyncRequest, SyncResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireRequest {
    user: Vec<u8>,
    auth_token: Vec<u8>,
    identifiers: Vec<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireResponse {
    result: SyncResult,
    #[serde(default)]
    added_users: Vec<Vec<u8>>,
    #[serde(default)]
    removed_users: Vec<Vec<u8>>,
}

fn to_wire(identifiers: &[Identifier]) -> Vec<Vec<u8>> {
    identifiers.iter().map(|id| id.as_bytes().to_vec()).collect()
}

fn from_wire(identifiers: Vec<Vec<u8>>) -> Vec<Identifier> {
    identifiers.into_iter().map(Identifier::from).collect()
}

/// serde_json codec for requests and responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }

    /// Encode a request, as a client would send it.
    pub fn encode_request(&self, request: &SyncRequest) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&WireRequest {
            user: request.user.as_bytes().to_vec(),
            auth_token: request.auth_token.clone(),
            identifiers: to_wire(&request.identifiers),
        })
    }

    /// Encode an outcome as a response body.
    pub fn encode_outcome(&self, outcome: &SyncOutcome) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&WireResponse {
            result: outcome.result,
            added_users: to_wire(&outcome.added),
            removed_users: to_wire(&outcome.removed),
        })
    }

    /// Decode a response body back into an outcome.
    pub fn decode_outcome(&self, body: &[u8]) -> Result<SyncOutcome, DecodeError> {
        let wire: WireResponse =
            serde_json::from_slice(body).map_err(|e| DecodeError::new(e.to_string()))?;
        Ok(SyncOutcome {
            result: wire.result,
            added: from_wire(wire.added_users),
            removed: from_wire(wire.removed_users),
        })
    }
}

impl RequestDecoder for JsonCodec {
    fn decode(&self, body: &[u8]) -> Result<SyncRequest, DecodeError> {
        let wire: WireRequest =
            serde_json::from_slice(body).map_err(|e| DecodeError::new(e.to_string()))?;
        Ok(SyncRequest::new(
            wire.user,
            wire.auth_token,
            from_wire(wire.identifiers),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let body = br#"{"user":[97],"auth_token":[1,2],"identifiers":[[65],[66]]}"#;
        let request = JsonCodec.decode(body).unwrap();

        assert_eq!(request.user, Identifier::from("a"));
        assert_eq!(request.auth_token, vec![1, 2]);
        assert_eq!(request.identifiers, vec![Identifier::from("A"), Identifier::from("B")]);
    }

    #[test]
    fn test_absent_fields_default_to_empty() {
        let request = JsonCodec.decode(b"{}").unwrap();
        assert!(request.user.is_empty());
        assert!(request.auth_token.is_empty());
        assert_eq!(request.cost(), 0);
    }

    #[test]
    fn test_malformed_bodies_rejected() {
        for body in [
            &b"not json"[..],
            &br#"{"identifiers":"A"}"#[..],
            &br#"{"user":[256]}"#[..],
            &br#"[1,2,3]"#[..],
        ] {
            assert!(JsonCodec.decode(body).is_err(), "{:?}", body);
        }
    }

    #[test]
    fn test_outcome_wire_shape() {
        let outcome = SyncOutcome::success(vec![Identifier::from("A")], Vec::new());
        let body = JsonCodec.encode_outcome(&outcome).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(value["result"], "SUCCESS");
        assert_eq!(value["added_users"], serde_json::json!([[65]]));
        assert_eq!(value["removed_users"], serde_json::json!([]));
    }

    #[test]
    fn test_rejection_round_trips() {
        let outcome = SyncOutcome::rejected(SyncResult::RateLimitExceeded);
        let body = JsonCodec.encode_outcome(&outcome).unwrap();

        assert_eq!(JsonCodec.decode_outcome(&body).unwrap(), outcome);
    }

    #[test]
    fn test_encoded_request_decodes() {
        let request = SyncRequest::new("alice", "token", vec![Identifier::from("B")]);
        let body = JsonCodec.encode_request(&request).unwrap();

        assert_eq!(JsonCodec.decode(&body).unwrap(), request);
    }
}
