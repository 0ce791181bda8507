//! Verified reader for rpm package files.
//!
//! This crate implements the trusted front half of package ingestion: it
//! parses the lead, the signature header, and the metadata header of a
//! package file, validates every length and offset in the attacker-supplied
//! header blobs, selects the strongest available signature or digest, and
//! checks it against a bit-reproducible serialization of the immutable
//! header region. Public-key verification itself happens behind the
//! [`Keyring`] trait; this crate computes the canonical digests and hands
//! them over.
//!
//! The payload is never touched. Writing, installing, and dependency
//! resolution are out of scope.

pub mod digest;
pub mod error;
pub mod header;
pub mod keyring;
pub mod lead;
pub mod package;
pub mod report;
pub mod sig;
pub mod sigheader;
pub mod stash;
pub mod tags;

// Convenience re-exports
pub use digest::{DigestAlgo, DigestCtx};
pub use error::{ReadError, ReadResult, Verdict};
pub use header::{check_header, Entry, Header, HeaderBlob, Value};
pub use keyring::{EmptyKeyring, KeyStatus, Keyring};
pub use lead::LeadType;
pub use package::{read_header, read_package, ReadOutcome};
pub use report::{log_outcome, read_package_logged};
pub use sig::{SigInfo, SigKind, SigPolicy};
pub use stash::KeyIdStash;
pub use tags::TagType;
