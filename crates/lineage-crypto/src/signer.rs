//! Signing collaborators

use lineage_core::{IdentityId, LineageResult};

/// An identity able to sign arbitrary bytes
pub trait Signer {
    /// Identity the signatures recover to
    fn identity(&self) -> IdentityId;

    /// Sign `message`
    fn sign(&self, message: &[u8]) -> LineageResult<Vec<u8>>;
}

/// Recover the identity that produced a signature
///
/// A signature that does not verify surfaces as `LineageError::Signature`.
/// A valid signature by someone other than the claimed author is not an
/// error here; callers compare the recovered identity and report
/// `ReferenceFault::SignerMismatch`.
pub trait Recover {
    /// Identity that signed `message`, or `Signature` if the signature
    /// does not verify.
    fn recover(&self, message: &[u8], signature: &[u8]) -> LineageResult<IdentityId>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn identity(&self) -> IdentityId {
        (**self).identity()
    }

    fn sign(&self, message: &[u8]) -> LineageResult<Vec<u8>> {
        (**self).sign(message)
    }
}

impl<R: Recover + ?Sized> Recover for &R {
    fn recover(&self, message: &[u8], signature: &[u8]) -> LineageResult<IdentityId> {
        (**self).recover(message, signature)
    }
}
