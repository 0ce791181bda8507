//! Evaluate a parsed signature descriptor against a computed digest.

use crate::digest::DigestCtx;
use crate::error::Verdict;
use crate::keyring::{KeyStatus, Keyring};

use super::info::{SigInfo, SigKind};

/// Finish the digest the caller fed with the canonical content and judge
/// it against the descriptor.
///
/// Digest tags are compared locally. Signature tags get the packet's
/// hashed trailer appended first, then a quick left-16-bit check, then the
/// keyring performs the public-key operation. The returned message is the
/// user-visible disposition line.
pub fn verify_signature(
    keyring: &dyn Keyring,
    info: &SigInfo,
    mut ctx: DigestCtx,
) -> (Verdict, String) {
    match info.kind {
        SigKind::Digest => {
            let expected = info.digest_hex.as_deref().unwrap_or("");
            let actual = ctx.finalize_hex();
            if expected == actual {
                (Verdict::Ok, format!("{}: OK", info.descr()))
            } else {
                (
                    Verdict::Fail,
                    format!("{}: BAD (Expected {} != {})", info.descr(), expected, actual),
                )
            }
        }
        SigKind::Signature => {
            let Some(sig) = info.sig.as_ref() else {
                return (Verdict::Fail, format!("{}: BAD", info.descr()));
            };
            ctx.update(&sig.hashed_trailer);
            let digest = ctx.finalize();
            if digest.len() < 2 || digest[..2] != sig.left16 {
                return (Verdict::Fail, format!("{}: BAD", info.descr()));
            }
            match keyring.verify(info, &digest) {
                KeyStatus::Ok => (Verdict::Ok, format!("{}: OK", info.descr())),
                KeyStatus::NoKey => (Verdict::NoKey, format!("{}: NOKEY", info.descr())),
                KeyStatus::NotTrusted => {
                    (Verdict::NotTrusted, format!("{}: NOTTRUSTED", info.descr()))
                }
                KeyStatus::Fail => (Verdict::Fail, format!("{}: BAD", info.descr())),
            }
        }
    }
}
