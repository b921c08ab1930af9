//! Identity management using Ed25519
//!
//! A lineage signature is the signer's verifying key followed by the
//! Ed25519 signature, so any node can recover the signing identity from
//! the signature alone.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::trace;

use lineage_core::{IdentityId, LineageError, LineageResult, IDENTITY_LEN};

use crate::{Recover, Signer};

/// Length of a verifying key
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of an encoded lineage signature
pub const SIGNATURE_LEN: usize = PUBLIC_KEY_LEN + 64;

/// Identity keypair
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    id: IdentityId,
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        Self::from_rng(&mut OsRng)
    }

    /// Generate an identity from a caller-supplied rng
    pub fn from_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_signing_key(SigningKey::generate(rng))
    }

    /// Create identity from existing signing key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let id = identity_from_public_key(verifying_key.as_bytes());
        Identity {
            signing_key,
            verifying_key,
            id,
        }
    }

    /// Get the signing key bytes (secret)
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the verifying key bytes (public)
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    pub fn id(&self) -> IdentityId {
        self.id
    }

    /// Sign a message: verifying key || signature
    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        let signature = self.signing_key.sign(message);
        let mut out = Vec::with_capacity(SIGNATURE_LEN);
        out.extend_from_slice(self.verifying_key.as_bytes());
        out.extend_from_slice(&signature.to_bytes());
        out
    }
}

impl Signer for Identity {
    fn identity(&self) -> IdentityId {
        self.id
    }

    fn sign(&self, message: &[u8]) -> LineageResult<Vec<u8>> {
        Ok(self.sign_bytes(message))
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Derive an identity from a verifying key (first 20 bytes of SHA-256)
pub fn identity_from_public_key(public_key: &[u8; PUBLIC_KEY_LEN]) -> IdentityId {
    let hash = Sha256::digest(public_key);
    let mut id = [0u8; IDENTITY_LEN];
    id.copy_from_slice(&hash[..IDENTITY_LEN]);
    IdentityId::new(id)
}

/// Recovers signers of [`Identity`] signatures
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Recovery;

impl Recover for Ed25519Recovery {
    fn recover(&self, message: &[u8], signature: &[u8]) -> LineageResult<IdentityId> {
        if signature.len() != SIGNATURE_LEN {
            return Err(LineageError::Signature(format!(
                "expected {} signature bytes, got {}",
                SIGNATURE_LEN,
                signature.len()
            )));
        }

        let (key, sig) = signature.split_at(PUBLIC_KEY_LEN);
        let mut key_bytes = [0u8; PUBLIC_KEY_LEN];
        key_bytes.copy_from_slice(key);

        let verifying_key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| LineageError::Signature(e.to_string()))?;
        let sig = Signature::from_slice(sig).map_err(|e| LineageError::Signature(e.to_string()))?;

        if let Err(e) = verifying_key.verify(message, &sig) {
            trace!(error = %e, "signature failed to verify");
            return Err(LineageError::Signature("verification failed".into()));
        }

        Ok(identity_from_public_key(&key_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_identity_generation() {
        let id1 = Identity::generate();
        let id2 = Identity::generate();

        assert_ne!(id1.id(), id2.id());
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = Identity::from_rng(&mut StdRng::seed_from_u64(7));
        let b = Identity::from_rng(&mut StdRng::seed_from_u64(7));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_sign_recover() {
        let identity = Identity::generate();
        let message = b"Hello, lineage!";

        let signature = identity.sign(message).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert_eq!(Ed25519Recovery.recover(message, &signature).unwrap(), identity.id());

        // Wrong message should fail
        assert!(matches!(
            Ed25519Recovery.recover(b"Wrong message", &signature),
            Err(LineageError::Signature(_))
        ));
    }

    #[test]
    fn test_swapped_key_fails() {
        let alice = Identity::generate();
        let mallory = Identity::generate();
        let message = b"transfer";

        let mut forged = alice.sign(message).unwrap();
        forged[..PUBLIC_KEY_LEN].copy_from_slice(&mallory.verifying_key_bytes());
        assert!(Ed25519Recovery.recover(message, &forged).is_err());
    }

    #[test]
    fn test_short_signature_rejected() {
        assert!(Ed25519Recovery.recover(b"m", &[0u8; 10]).is_err());
    }

    #[test]
    fn test_identity_roundtrip() {
        let identity = Identity::generate();
        let bytes = identity.signing_key_bytes();
        let restored = Identity::from_bytes(&bytes);

        assert_eq!(identity.id(), restored.id());
        assert_eq!(identity.id(), identity_from_public_key(&identity.verifying_key_bytes()));
    }

    proptest! {
        #[test]
        fn prop_recovers_signer(
            seed in any::<u64>(),
            message in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let identity = Identity::from_rng(&mut StdRng::seed_from_u64(seed));
            let signature = identity.sign(&message).unwrap();
            prop_assert_eq!(Ed25519Recovery.recover(&message, &signature).unwrap(), identity.id());
        }
    }
}
