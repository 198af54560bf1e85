//! Error types for the detection subsystem.

use shared_types::{Indicator, TemporalError, TokenId};
use thiserror::Error;

/// Detection subsystem error taxonomy.
///
/// A secure-clock failure is fatal to the request that needed the timestamp
/// and always propagates; classifier faults are recovered locally and never
/// appear here.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The referenced token does not exist (or was never generated here).
    #[error("unknown token: {0}")]
    TokenNotFound(TokenId),

    /// The secure-timestamp contract failed. Never substituted silently.
    #[error("secure clock failure: {0}")]
    Clock(#[from] TemporalError),

    /// The external backup collaborator rejected a save/load.
    #[error("backup store error: {0}")]
    Backup(String),

    /// The external crypto collaborator failed to sign or verify.
    #[error("crypto provider error: {0}")]
    Crypto(String),

    /// A token backup failed signature verification on restore.
    #[error("backup signature rejected for token {0}")]
    BackupSignatureRejected(TokenId),

    /// Token backup bytes could not be encoded/decoded.
    #[error("backup serialization error: {0}")]
    Serialization(String),
}

/// A single classifier misbehaving.
///
/// Caught by the bank, logged, and excluded from that round's aggregation.
/// Sibling classifiers are unaffected.
#[derive(Debug, Clone, Error)]
#[error("classifier {indicator} fault: {reason}")]
pub struct ClassifierFault {
    /// Which classifier faulted.
    pub indicator: Indicator,
    /// What it reported.
    pub reason: String,
}
