/// Attester signing identity
///
/// Secret URIs follow the Substrate format:
/// `<bip39 phrase | 0x seed>[//hard | /soft junctions...][///password]`,
/// and derive an sr25519 keypair the same way the Polkadot keyring does.
use crate::{
    config::CredentialConfig,
    error::{SignerError, SignerResult},
};
use std::fmt;
use std::str::FromStr;
use subxt::utils::AccountId32;
use subxt_signer::{sr25519::Keypair, SecretUri};

/// Public address plus private signing capability of the attester
pub struct SigningIdentity {
    keypair: Keypair,
    account_id: AccountId32,
    address: String,
}

impl SigningIdentity {
    /// Derive an identity from a secret URI
    pub fn from_secret_uri(uri: &str) -> SignerResult<Self> {
        let secret = SecretUri::from_str(uri.trim())
            .map_err(|e| SignerError::Credential(format!("Invalid secret URI: {}", e)))?;

        let keypair = Keypair::from_uri(&secret)
            .map_err(|e| SignerError::Credential(format!("Key derivation failed: {}", e)))?;

        let account_id = keypair.public_key().to_account_id();
        let address = account_id.to_string();

        Ok(Self {
            keypair,
            account_id,
            address,
        })
    }

    /// SS58 address (generic Substrate prefix)
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn account_id(&self) -> &AccountId32 {
        &self.account_id
    }

    /// Raw 32-byte sr25519 public key
    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public_key().0
    }

    /// Keypair used to sign extrinsics
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Load the attester identity and check it against the expected address
///
/// A mismatch means the process would sign as someone else; callers must
/// treat the error as fatal.
pub fn load_signing_identity(config: &CredentialConfig) -> SignerResult<SigningIdentity> {
    let expected = AccountId32::from_str(config.expected_address.trim()).map_err(|e| {
        SignerError::Config(format!(
            "W3CP_SIGNER_PUB_KEY is not a valid SS58 address: {:?}",
            e
        ))
    })?;

    let identity = SigningIdentity::from_secret_uri(&config.secret_uri)?;

    tracing::info!("→ Loaded address: {}", identity.address());

    // Compare accounts, not strings, so any SS58 prefix is accepted
    if identity.account_id() != &expected {
        return Err(SignerError::CredentialMismatch {
            expected: config.expected_address.clone(),
            derived: identity.address().to_string(),
        });
    }

    tracing::info!("✓ Correct attester key loaded");
    Ok(identity)
}
