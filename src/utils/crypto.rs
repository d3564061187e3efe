// HMAC-SHA256 verification of identity-provider webhook payloads.
//
// The provider signs `{id}.{timestamp}.{body}` with a shared secret and sends
// the result in the `svix-signature` header as space-separated `v1,<base64>`
// entries. The shared secret itself is base64 behind an optional `whsec_`
// prefix.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::utils::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Decode the shared webhook secret into raw key bytes.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, AppError> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    BASE64
        .decode(encoded)
        .map_err(|e| AppError::ConfigurationError(format!("Webhook secret is not valid base64: {}", e)))
}

/// Compute the base64-encoded HMAC-SHA256 signature for one message.
pub fn sign_payload(key: &[u8], msg_id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .expect("HMAC can take key of any size");

    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify a signature header against the raw request body.
///
/// The header may carry several space-separated signatures (the provider
/// includes old ones during secret rotation); any matching `v1` entry
/// authenticates the message.
pub fn verify_signature(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
) -> Result<(), AppError> {
    let key = decode_secret(secret)?;
    let expected = sign_payload(&key, msg_id, timestamp, body);

    for entry in signature_header.split_ascii_whitespace() {
        let Some((version, signature)) = entry.split_once(',') else {
            continue;
        };
        if version != SIGNATURE_VERSION {
            continue;
        }
        if constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
            return Ok(());
        }
    }

    Err(AppError::ValidationError(
        "Webhook signature verification failed".to_string(),
    ))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn signed_header(msg_id: &str, timestamp: &str, body: &[u8]) -> String {
        let key = decode_secret(SECRET).unwrap();
        format!("v1,{}", sign_payload(&key, msg_id, timestamp, body))
    }

    #[test]
    fn test_valid_signature_passes() {
        let body = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let header = signed_header("msg_1", "1706400000", body);

        let result = verify_signature(SECRET, "msg_1", "1706400000", body, &header);
        assert!(result.is_ok());
    }

    #[test]
    fn test_tampered_body_fails() {
        let body = br#"{"type":"user.created","data":{"id":"user_1"}}"#;
        let header = signed_header("msg_1", "1706400000", body);

        let tampered = br#"{"type":"user.created","data":{"id":"user_2"}}"#;
        let result = verify_signature(SECRET, "msg_1", "1706400000", tampered, &header);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let body = b"payload";
        let header = signed_header("msg_1", "1706400000", body);

        let other = "whsec_C2FVsBQIhrscChlQIMV+b5sSYspob7oD";
        let result = verify_signature(other, "msg_1", "1706400000", body, &header);
        assert!(result.is_err());
    }

    #[test]
    fn test_any_valid_entry_among_several_passes() {
        let body = b"payload";
        let valid = signed_header("msg_1", "1706400000", body);
        let header = format!("v1,Z2FyYmFnZQ== {} v2,aWdub3JlZA==", valid);

        let result = verify_signature(SECRET, "msg_1", "1706400000", body, &header);
        assert!(result.is_ok());
    }

    #[test]
    fn test_non_v1_entries_are_ignored() {
        let key = decode_secret(SECRET).unwrap();
        let sig = sign_payload(&key, "msg_1", "1706400000", b"payload");
        let header = format!("v2,{}", sig);

        let result = verify_signature(SECRET, "msg_1", "1706400000", b"payload", &header);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_secret_is_configuration_error() {
        let result = verify_signature("whsec_!!!not-base64!!!", "msg_1", "1", b"x", "v1,AAAA");
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }

    #[test]
    fn test_signature_changes_with_msg_id_and_timestamp() {
        let key = decode_secret(SECRET).unwrap();
        let sig1 = sign_payload(&key, "msg_1", "1706400000", b"payload");
        let sig2 = sign_payload(&key, "msg_2", "1706400000", b"payload");
        let sig3 = sign_payload(&key, "msg_1", "1706400001", b"payload");
        assert_ne!(sig1, sig2);
        assert_ne!(sig1, sig3);
    }

    #[test]
    fn test_secret_prefix_is_optional() {
        let stripped = SECRET.strip_prefix("whsec_").unwrap();
        assert_eq!(decode_secret(SECRET).unwrap(), decode_secret(stripped).unwrap());
    }
}
