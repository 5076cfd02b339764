/// DID validation
///
/// A W3CP DID binds to a raw 32-byte ed25519 public key:
/// `did:w3cp:<base58(pubkey)>`
use crate::error::{SignerError, SignerResult};

/// Scheme prefix of every W3CP DID
pub const W3CP_DID_PREFIX: &str = "did:w3cp:";

/// Length of the public key a DID encodes
const DID_KEY_LENGTH: usize = 32;

/// Check whether a string is a well-formed W3CP DID
///
/// Never panics; any decoding failure yields `false`.
pub fn is_valid_w3cp_did(did: &str) -> bool {
    let Some(payload) = did.strip_prefix(W3CP_DID_PREFIX) else {
        return false;
    };

    if payload.is_empty() || !payload.chars().all(is_base58_char) {
        return false;
    }

    match bs58::decode(payload).into_vec() {
        Ok(decoded) => decoded.len() == DID_KEY_LENGTH,
        Err(_) => false,
    }
}

/// Build a W3CP DID from a raw public key
pub fn did_from_public_key(public_key: &[u8; 32]) -> String {
    format!("{}{}", W3CP_DID_PREFIX, bs58::encode(public_key).into_string())
}

/// Validate the fields of a lift request
///
/// Presence is checked for both fields before the DID format is looked at.
pub fn validate_lift_request(cp_id: &str, did: &str) -> SignerResult<()> {
    if cp_id.is_empty() || did.is_empty() {
        return Err(SignerError::InvalidRequest(
            "cpId and did are required".to_string(),
        ));
    }

    if !is_valid_w3cp_did(did) {
        return Err(SignerError::InvalidDidFormat);
    }

    Ok(())
}

/// Bitcoin base-58 alphabet: digits 1-9, letters without I, O and l
fn is_base58_char(c: char) -> bool {
    matches!(c, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    #[test]
    fn test_accepts_32_byte_keys() {
        for _ in 0..50 {
            let key = random_bytes(32);
            let did = format!("did:w3cp:{}", bs58::encode(&key).into_string());
            assert!(is_valid_w3cp_did(&did), "rejected {}", did);
        }
    }

    #[test]
    fn test_rejects_31_and_33_byte_keys() {
        for len in [31, 33] {
            let key = random_bytes(len);
            let did = format!("did:w3cp:{}", bs58::encode(&key).into_string());
            assert!(!is_valid_w3cp_did(&did), "accepted {} bytes", len);
        }
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        let encoded = bs58::encode(random_bytes(32)).into_string();
        assert!(!is_valid_w3cp_did(&format!("did:key:{}", encoded)));
        assert!(!is_valid_w3cp_did(&format!("DID:W3CP:{}", encoded)));
        assert!(!is_valid_w3cp_did(&encoded));
        assert!(!is_valid_w3cp_did(&format!(" did:w3cp:{}", encoded)));
    }

    #[test]
    fn test_rejects_empty_payload() {
        assert!(!is_valid_w3cp_did("did:w3cp:"));
        assert!(!is_valid_w3cp_did(""));
    }

    #[test]
    fn test_rejects_characters_outside_alphabet() {
        let encoded = bs58::encode([7u8; 32]).into_string();
        for bad in ['0', 'O', 'I', 'l', '-', ' '] {
            let mut tampered = encoded.clone();
            tampered.replace_range(0..1, &bad.to_string());
            assert!(
                !is_valid_w3cp_did(&format!("did:w3cp:{}", tampered)),
                "accepted '{}'",
                bad
            );
        }
    }

    #[test]
    fn test_did_from_public_key_round_trips() {
        let key = [42u8; 32];
        let did = did_from_public_key(&key);
        assert!(did.starts_with(W3CP_DID_PREFIX));
        assert!(is_valid_w3cp_did(&did));
    }

    #[test]
    fn test_validate_lift_request() {
        let did = did_from_public_key(&[1u8; 32]);

        assert!(validate_lift_request("CP1", &did).is_ok());
        assert!(matches!(
            validate_lift_request("", &did),
            Err(SignerError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_lift_request("CP1", ""),
            Err(SignerError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate_lift_request("CP1", "did:w3cp:0OIl"),
            Err(SignerError::InvalidDidFormat)
        ));
    }
}
