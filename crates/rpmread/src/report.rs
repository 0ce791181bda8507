//! Maps read verdicts to log levels and the warn-once policy for unknown
//! signer keys.

use std::io::Read;

use crate::error::Verdict;
use crate::keyring::Keyring;
use crate::package::{read_package, ReadOutcome};
use crate::sig::SigPolicy;
use crate::stash::KeyIdStash;

/// Log one read outcome.
///
/// Success is debug-level noise; an unknown or untrusted key warns the
/// first time its id is seen and drops to debug afterwards; verification
/// failure is an error. A missing signature only warns when there is
/// something to say.
pub fn log_outcome(file: &str, outcome: &ReadOutcome, stash: &KeyIdStash) {
    let msg = outcome.message.as_deref().unwrap_or("");
    match outcome.verdict {
        Verdict::Ok => {
            tracing::debug!(file, "{msg}");
        }
        Verdict::NotTrusted | Verdict::NoKey => {
            if stash.observe(outcome.keyid) {
                tracing::debug!(file, keyid = outcome.keyid, "{msg}");
            } else {
                tracing::warn!(file, keyid = outcome.keyid, "{msg}");
            }
        }
        Verdict::NotFound => {
            if outcome.message.is_some() {
                tracing::warn!(file, "{msg}");
            }
        }
        Verdict::Fail => {
            tracing::error!(file, "{msg}");
        }
    }
}

/// [`read_package`] plus default logging through the process-wide key-id
/// stash.
pub fn read_package_logged<R: Read>(
    keyring: &dyn Keyring,
    policy: &SigPolicy,
    r: &mut R,
    file: &str,
) -> ReadOutcome {
    let outcome = read_package(keyring, policy, r);
    log_outcome(file, &outcome, KeyIdStash::global());
    outcome
}
