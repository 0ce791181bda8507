//! The keyring seam.
//!
//! The reader computes canonical digests; the public-key operation itself
//! belongs to the embedding application. Implementations receive the
//! parsed signature descriptor and the finalized digest (the signature's
//! hashed trailer already folded in) and answer with a trust verdict.

use crate::sig::SigInfo;

/// Result of a keyring lookup and public-key verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Signature verifies against a trusted key.
    Ok,
    /// No key with the signer's id is available.
    NoKey,
    /// The key is known but not trusted.
    NotTrusted,
    /// The key is available but the signature does not verify.
    Fail,
}

/// A set of public keys able to check signature MPIs against a digest.
pub trait Keyring {
    /// Verify `digest` against the signature carried by `sig`.
    fn verify(&self, sig: &SigInfo, digest: &[u8]) -> KeyStatus;
}

/// A keyring holding no keys; every signature answers [`KeyStatus::NoKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyKeyring;

impl Keyring for EmptyKeyring {
    fn verify(&self, _sig: &SigInfo, _digest: &[u8]) -> KeyStatus {
        KeyStatus::NoKey
    }
}
