//! Envelope codec: raw text frames to [`Envelope`] values and back.
//!
//! Decoding distinguishes two failure classes so that callers can report
//! them separately without closing the connection:
//! - [`DecodeError::Malformed`]: the frame is not JSON at all
//! - [`DecodeError::Incorrect`]: valid JSON whose shape or `type` tag is not a known envelope

use serde_json::{Value, json};
use tracing::{error, trace};

use crate::envelope::{Envelope, EnvelopeKind};
use crate::error::DecodeError;

/// Decode one raw text frame
pub fn decode(raw: &str) -> Result<Envelope, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|source| DecodeError::Malformed { source })?;
    decode_value(value)
}

/// Decode an already-parsed JSON value
pub fn decode_value(value: Value) -> Result<Envelope, DecodeError> {
    let tag = match value.get("type") {
        Some(Value::String(tag)) => Ok(tag.clone()),
        Some(_) => Err("`type` must be a string"),
        None => Err("missing `type` field"),
    };

    let tag = match tag {
        Ok(tag) => tag,
        Err(reason) => return Err(DecodeError::incorrect(value, reason)),
    };

    let Some(kind) = EnvelopeKind::from_tag(&tag) else {
        return Err(DecodeError::incorrect(
            value,
            format!("unknown envelope type '{}'", tag),
        ));
    };

    match serde_json::from_value::<Envelope>(value.clone()) {
        Ok(envelope) => {
            trace!(kind = %kind, "Decoded envelope");
            Ok(envelope)
        }
        Err(e) => Err(DecodeError::incorrect(
            value,
            format!("invalid '{}' envelope: {}", kind, e),
        )),
    }
}

/// Encode an envelope as a text frame
pub fn encode(envelope: &Envelope) -> String {
    match serde_json::to_value(envelope) {
        Ok(value) => value.to_string(),
        Err(e) => {
            // Envelopes only hold strings and JSON values, so this is unreachable in practice
            error!(error = %e, "Failed to encode envelope");
            json!({
                "type": EnvelopeKind::Error.tag(),
                "eid": crate::error_ids::INTERNAL_ERROR,
                "message": e.to_string(),
            })
            .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorEnvelope;
    use crate::notification::NotificationEnvelope;
    use crate::request::{RequestEnvelope, RequestId};
    use crate::response::ResponseEnvelope;

    #[test]
    fn test_round_trip_all_kinds() {
        let envelopes = vec![
            Envelope::from(RequestEnvelope::new(
                RequestId::new("0"),
                "echo",
                json!("hi"),
            )),
            Envelope::from(RequestEnvelope::new_no_params(RequestId::new("1"), "ping")),
            Envelope::from(NotificationEnvelope::new(
                "askMe",
                json!({"nested": [1, 2, {"deep": null}]}),
            )),
            Envelope::from(ResponseEnvelope::new(RequestId::new("2"), json!("pong"))),
            Envelope::from(ResponseEnvelope::null(RequestId::new("3"))),
            Envelope::from(ErrorEnvelope::for_request(
                RequestId::new("4"),
                "Denied",
                "not allowed",
            )),
            Envelope::from(ErrorEnvelope::incorrect_input("bad input")),
        ];

        for envelope in envelopes {
            let raw = encode(&envelope);
            let decoded = decode(&raw).unwrap();
            assert_eq!(decoded, envelope, "round trip failed for {}", raw);
        }
    }

    #[test]
    fn test_decode_response_without_result() {
        let envelope = decode(r#"{"type":"res","id":"999"}"#).unwrap();
        let Envelope::Response(response) = envelope else {
            panic!("Expected response, got: {:?}", envelope);
        };
        assert_eq!(response.id.as_str(), "999");
        assert!(response.result.is_null());
    }

    #[test]
    fn test_malformed_payload() {
        let err = decode("{not json").unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_unknown_type_is_incorrect() {
        let err = decode(r#"{"type":"evt","name":"x"}"#).unwrap_err();
        let DecodeError::Incorrect { value, reason } = err else {
            panic!("Expected incorrect message");
        };
        assert_eq!(value["name"], "x");
        assert!(reason.contains("evt"));
    }

    #[test]
    fn test_missing_or_non_string_type_is_incorrect() {
        assert!(matches!(
            decode(r#"{"id":"1","result":2}"#),
            Err(DecodeError::Incorrect { .. })
        ));
        assert!(matches!(
            decode(r#"{"type":3}"#),
            Err(DecodeError::Incorrect { .. })
        ));
        assert!(matches!(decode("42"), Err(DecodeError::Incorrect { .. })));
    }

    #[test]
    fn test_known_type_with_bad_fields_is_incorrect() {
        // A request without an id cannot be answered
        let err = decode(r#"{"type":"req","method":"ping"}"#).unwrap_err();
        assert!(!err.is_malformed());
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let envelope = decode(r#"{"type":"not","method":"tick","params":1,"extra":true}"#).unwrap();
        assert_eq!(envelope.method(), Some("tick"));
    }
}
