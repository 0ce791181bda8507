//! Algorithm-selection policy.
//!
//! One boolean per algorithm, fixed priority lists, and selection as a
//! pure function of the signature header and the policy. Disabling an
//! algorithm means its tag is invisible to selection, nothing more.

use crate::header::Header;
use crate::tags::{SIGTAG_DSA, SIGTAG_RSA, SIGTAG_SHA1};

/// Which signature/digest algorithms are eligible during selection.
///
/// The default enables everything; [`SigPolicy::none`] disables
/// everything (structural checks still run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigPolicy {
    pub dsa: bool,
    pub rsa: bool,
    pub sha1: bool,
}

impl Default for SigPolicy {
    fn default() -> Self {
        SigPolicy {
            dsa: true,
            rsa: true,
            sha1: true,
        }
    }
}

impl SigPolicy {
    /// Everything disabled.
    pub fn none() -> Self {
        SigPolicy {
            dsa: false,
            rsa: false,
            sha1: false,
        }
    }

    pub fn without_dsa(mut self) -> Self {
        self.dsa = false;
        self
    }

    pub fn without_rsa(mut self) -> Self {
        self.rsa = false;
        self
    }

    pub fn without_sha1(mut self) -> Self {
        self.sha1 = false;
        self
    }
}

/// Pick the most effective package-level verification tag from the
/// signature header: DSA, then RSA, then the SHA1 digest. Only one is
/// chosen; legacy header+payload signatures are never considered.
pub fn select_package_sig(sigh: &Header, policy: &SigPolicy) -> Option<u32> {
    if policy.dsa && sigh.is_entry(SIGTAG_DSA) {
        Some(SIGTAG_DSA)
    } else if policy.rsa && sigh.is_entry(SIGTAG_RSA) {
        Some(SIGTAG_RSA)
    } else if policy.sha1 && sigh.is_entry(SIGTAG_SHA1) {
        Some(SIGTAG_SHA1)
    } else {
        None
    }
}
