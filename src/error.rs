/// Unified error types for the W3CP signer
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for the signer
#[derive(Error, Debug)]
pub enum SignerError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Secret phrase could not be turned into a signing key
    #[error("Credential error: {0}")]
    Credential(String),

    /// Derived signing address differs from the expected one
    #[error("Invalid key loaded: expected {expected}, got {derived}")]
    CredentialMismatch { expected: String, derived: String },

    /// Ledger connection is down or reconnecting
    #[error("Blockchain not connected")]
    ServiceUnavailable,

    /// Required request fields are missing
    #[error("{0}")]
    InvalidRequest(String),

    /// DID does not follow did:w3cp:<base58(32 bytes)>
    #[error("Invalid DID format. Must be did:w3cp:<base58(32-byte-pubkey)>")]
    InvalidDidFormat,

    /// The (cpId, did) pair was already attested by this process
    #[error("Already attested on-chain")]
    DuplicateAttestation { cp_id: String, did: String },

    /// Signing, submission or a terminal failure status reported by the ledger
    #[error("{message}")]
    Submission {
        message: String,
        detail: Option<String>,
    },

    /// No terminal status arrived before the submission timeout
    #[error("Timed out waiting for chain confirmation")]
    SubmissionTimeout,

    /// Submitted, but the status feed ended before a terminal status
    #[error("Transaction outcome unknown")]
    OutcomeUnknown { tx_hash: String },

    /// Ledger RPC transport or protocol errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SignerError {
    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
            detail: None,
        }
    }

    pub fn submission_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
}

impl ErrorResponse {
    fn new(error: String) -> Self {
        Self {
            error,
            detail: None,
            cp_id: None,
            did: None,
        }
    }
}

/// Convert SignerError to HTTP response
impl IntoResponse for SignerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            SignerError::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse::new(message))
            }
            SignerError::InvalidRequest(_) | SignerError::InvalidDidFormat => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(message))
            }
            SignerError::DuplicateAttestation { cp_id, did } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    cp_id: Some(cp_id),
                    did: Some(did),
                    ..ErrorResponse::new(message)
                },
            ),
            SignerError::Submission { detail, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    detail,
                    ..ErrorResponse::new(message)
                },
            ),
            SignerError::SubmissionTimeout => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorResponse::new(message))
            }
            SignerError::OutcomeUnknown { tx_hash } => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse {
                    detail: Some(tx_hash),
                    ..ErrorResponse::new(message)
                },
            ),
            SignerError::Internal(_) | SignerError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error".to_string()), // Don't leak details
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(message)),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;
