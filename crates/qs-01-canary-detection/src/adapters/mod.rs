//! Default adapters for the outbound ports.

use crate::ports::{AuditSink, BackupStore, CryptoProvider};
use parking_lot::Mutex;
use shared_types::{AuditEvent, TokenId};
use std::collections::HashMap;

/// Audit sink that forwards events into the structured log stream.
///
/// Suitable when the compliance collaborator scrapes logs; deployments with
/// a dedicated audit pipeline supply their own sink.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            subsystem = "canary-detection",
            event_type = %event.event_type,
            details = %event.details,
            event_timestamp = event.timestamp,
            "audit event"
        );
    }
}

/// In-memory backup store. Process-local; real deployments delegate to the
/// external recovery service.
#[derive(Debug, Default)]
pub struct InMemoryBackupStore {
    blobs: Mutex<HashMap<TokenId, Vec<u8>>>,
}

impl InMemoryBackupStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackupStore for InMemoryBackupStore {
    fn save(&self, token_id: TokenId, bytes: &[u8]) -> Result<(), String> {
        self.blobs.lock().insert(token_id, bytes.to_vec());
        Ok(())
    }

    fn load(&self, token_id: TokenId) -> Result<Vec<u8>, String> {
        self.blobs
            .lock()
            .get(&token_id)
            .cloned()
            .ok_or_else(|| format!("no backup for token {token_id}"))
    }
}

/// Pass-through crypto provider: a stand-in wired where the external crypto
/// module is not deployed. Signatures are a tagged copy of the input so
/// verify remains meaningful in tests; nothing here is cryptographic.
#[derive(Debug, Default)]
pub struct NullCrypto;

const NULL_TAG: &[u8] = b"null-crypto:";

impl CryptoProvider for NullCrypto {
    fn keypair(&self) -> Result<(Vec<u8>, Vec<u8>), String> {
        Ok((b"null-public".to_vec(), b"null-private".to_vec()))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        let mut signature = NULL_TAG.to_vec();
        signature.extend_from_slice(data);
        Ok(signature)
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, String> {
        Ok(signature
            .strip_prefix(NULL_TAG)
            .is_some_and(|rest| rest == data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_round_trip() {
        let store = InMemoryBackupStore::new();
        let token = TokenId::random();
        store.save(token, b"state").unwrap();
        assert_eq!(store.load(token).unwrap(), b"state");
        assert!(store.load(TokenId::random()).is_err());
    }

    #[test]
    fn null_crypto_verify_rejects_mismatch() {
        let crypto = NullCrypto;
        let sig = crypto.sign(b"payload").unwrap();
        assert!(crypto.verify(b"payload", &sig).unwrap());
        assert!(!crypto.verify(b"other", &sig).unwrap());
    }
}
