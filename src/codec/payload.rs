// Nyseal — Sealed artifact record
//
// One artifact per module: a JSON object with four base64 fields
// (`salt`, `iv`, `tag`, `encrypted_payload`).

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::PayloadFormatError;

/// Immutable encrypted payload, decoded from an artifact record.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// On-disk shape of the artifact.
#[derive(Serialize, Deserialize)]
struct ArtifactRecord {
    salt: String,
    iv: String,
    tag: String,
    encrypted_payload: String,
}

impl EncryptedPayload {
    pub fn from_json(text: &str) -> Result<Self, PayloadFormatError> {
        let record: ArtifactRecord = serde_json::from_str(text)?;
        Ok(Self {
            salt: decode_field("salt", &record.salt)?,
            iv: decode_field("iv", &record.iv)?,
            tag: decode_field("tag", &record.tag)?,
            ciphertext: decode_field("encrypted_payload", &record.encrypted_payload)?,
        })
    }

    pub fn to_json(&self) -> Result<String, PayloadFormatError> {
        let record = ArtifactRecord {
            salt: BASE64.encode(&self.salt),
            iv: BASE64.encode(&self.iv),
            tag: BASE64.encode(&self.tag),
            encrypted_payload: BASE64.encode(&self.ciphertext),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Short hex digest of the ciphertext, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.ciphertext);
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("salt_len", &self.salt.len())
            .field("iv_len", &self.iv.len())
            .field("tag_len", &self.tag.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, PayloadFormatError> {
    BASE64
        .decode(value.trim())
        .map_err(|source| PayloadFormatError::Base64 { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EncryptedPayload {
        EncryptedPayload {
            salt: vec![1; 16],
            iv: vec![2; 12],
            tag: vec![3; 16],
            ciphertext: vec![4; 32],
        }
    }

    #[test]
    fn test_json_record_uses_artifact_field_names() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for field in ["salt", "iv", "tag", "encrypted_payload"] {
            assert!(value.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(EncryptedPayload::from_json(&json).unwrap(), sample());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = EncryptedPayload::from_json(r#"{"salt":"AA==","iv":"AA==","tag":"AA=="}"#)
            .unwrap_err();
        assert!(matches!(err, PayloadFormatError::Json(_)));
    }

    #[test]
    fn test_bad_base64_names_the_field() {
        let err = EncryptedPayload::from_json(
            r#"{"salt":"AA==","iv":"@@@","tag":"AA==","encrypted_payload":"AA=="}"#,
        )
        .unwrap_err();
        match err {
            PayloadFormatError::Base64 { field, .. } => assert_eq!(field, "iv"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_shows_lengths_only() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("ciphertext_len: 32"));
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = sample().fingerprint();
        assert_eq!(a.len(), 16);
        assert_eq!(a, sample().fingerprint());
    }
}
