/// Cryptography module for the attester signing identity
///
/// The attester is an sr25519 account derived from a Substrate secret URI.

pub mod keys;

pub use keys::{load_signing_identity, SigningIdentity};
