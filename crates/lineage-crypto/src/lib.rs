//! Lineage Crypto - Signing and signer recovery
//!
//! The graphs never look inside a signature. They consume two
//! capabilities:
//! - [`Signer`]: an identity able to sign bytes
//! - [`Recover`]: recovering the signing identity from bytes + signature
//!
//! The Ed25519 implementation here carries the public key inside the
//! signature so recovery needs no key directory.

pub mod identity;
pub mod signer;

pub use identity::*;
pub use signer::*;
