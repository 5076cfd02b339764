/// W3CP Signer - attestation gateway for charge point DIDs
///
/// Binds charge point identifiers to `did:w3cp:` identifiers by writing
/// signed `System.remark` extrinsics to a Substrate ledger, at most once
/// per (cpId, did) pair.

pub mod api;
pub mod attestation;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod server;
pub mod validation;
