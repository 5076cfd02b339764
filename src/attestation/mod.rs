/// Attestation records
///
/// A charge point identifier bound to its DID is attested by writing a
/// `W3CP_BIND:` remark to the ledger. This module holds the record types;
/// the workflow lives in [`pipeline`] and the dedup set in [`cache`].

pub mod cache;
pub mod pipeline;

pub use cache::{AttestationCache, KeyGuard};
pub use pipeline::{Attester, Confirmation};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every attestation remark
pub const REMARK_PREFIX: &str = "W3CP_BIND:";

/// Current payload version
pub const PAYLOAD_VERSION: u8 = 1;

/// Composite dedup key `cpId::did`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttestationKey(String);

impl AttestationKey {
    pub fn new(cp_id: &str, did: &str) -> Self {
        Self(format!("{}::{}", cp_id, did))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttestationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binding record embedded in the remark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationPayload {
    pub v: u8,
    #[serde(rename = "cpId")]
    pub cp_id: String,
    pub did: String,
    /// Unix seconds
    pub ts: i64,
}

impl AttestationPayload {
    pub fn new(cp_id: &str, did: &str) -> Self {
        Self {
            v: PAYLOAD_VERSION,
            cp_id: cp_id.to_string(),
            did: did.to_string(),
            ts: chrono::Utc::now().timestamp(),
        }
    }

    /// Remark bytes: `W3CP_BIND:` followed by compact JSON
    pub fn to_remark(&self) -> Vec<u8> {
        // Serializing a struct of plain strings and integers cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{}{}", REMARK_PREFIX, json).into_bytes()
    }
}

/// Provenance returned once the attestation is in a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationReceipt {
    pub network: String,
    pub tx_hash: String,
    #[serde(rename = "subscanUrl")]
    pub explorer_url: String,
    pub block_hash: String,
    /// `None` when the block could not be fetched
    pub block_number: Option<u64>,
    /// SS58 address of the attester
    pub attester: String,
    /// RFC 3339, millisecond precision
    pub lifted_at: String,
    pub payload: AttestationPayload,
}
