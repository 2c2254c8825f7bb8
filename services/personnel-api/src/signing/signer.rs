use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use crate::storage::audit::AuditLogEntry;

use super::error::SigningError;

type HmacSha256 = Hmac<Sha256>;

pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    /// Accepts either a base64 key or raw text; either way it must carry at
    /// least 32 bytes.
    pub fn new(secret: &str) -> Result<Self, SigningError> {
        if secret.trim().is_empty() {
            return Err(SigningError::InvalidKey("secret cannot be empty".into()));
        }

        let decoded = STANDARD
            .decode(secret)
            .unwrap_or_else(|_| secret.as_bytes().to_vec());
        if decoded.len() < 32 {
            return Err(SigningError::InvalidKey(
                "signing key must be at least 32 bytes".into(),
            ));
        }

        Ok(Self { key: decoded })
    }

    fn mac(&self) -> Result<HmacSha256, SigningError> {
        HmacSha256::new_from_slice(&self.key).map_err(|err| SigningError::InvalidKey(err.to_string()))
    }

    pub fn sign(&self, data: &[u8]) -> Result<String, SigningError> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, data: &[u8], signature: &str) -> Result<bool, SigningError> {
        let decoded = STANDARD
            .decode(signature)
            .map_err(|err| SigningError::EncodingError(err.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.verify_slice(&decoded).is_ok())
    }

    pub fn sign_audit_log(&self, log: &AuditLogEntry) -> Result<String, SigningError> {
        let payload = canonical_payload(log)?;
        let signature = self.sign(payload.as_bytes())?;
        debug!(log_id = %log.id, action = %log.action, "generated audit log signature");
        Ok(signature)
    }

    /// Recomputes the signature over the stored fields. A malformed stored
    /// signature counts as a mismatch.
    pub fn verify_audit_log(&self, log: &AuditLogEntry) -> Result<bool, SigningError> {
        let payload = canonical_payload(log)?;
        match self.verify(payload.as_bytes(), &log.signature) {
            Ok(valid) => Ok(valid),
            Err(SigningError::EncodingError(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Serialises the signed fields as a JSON array so that an absent entity id
/// and an empty one, or values containing separators, never collide.
fn canonical_payload(log: &AuditLogEntry) -> Result<String, SigningError> {
    let fields = Value::Array(vec![
        Value::String(log.id.clone()),
        Value::String(log.actor_id.clone()),
        Value::String(log.action.clone()),
        Value::String(log.entity_type.clone()),
        log.entity_id.clone().map_or(Value::Null, Value::String),
        sort_json_keys(&log.details),
        Value::String(log.created_at.clone()),
    ]);
    serde_json::to_string(&fields).map_err(|err| SigningError::EncodingError(err.to_string()))
}

fn sort_json_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), sort_json_keys(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_json_keys).collect()),
        other => other.clone(),
    }
}
