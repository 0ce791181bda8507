//! Error and verdict types for package reading.

/// Outcome classification of a package read or header check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Verification succeeded, or the header is structurally sound and
    /// nothing was enabled to verify.
    Ok,
    /// Signature verified against a key the keyring does not trust.
    NotTrusted,
    /// Signature is well formed but the public key is unavailable.
    NoKey,
    /// Not a package, or no enabled signature/digest tag present.
    NotFound,
    /// Structural damage, short read, or verification failure.
    Fail,
}

impl Verdict {
    /// Whether a metadata header is still handed back to the caller under
    /// this verdict.
    pub fn keeps_header(self) -> bool {
        matches!(self, Verdict::Ok | Verdict::NotTrusted | Verdict::NoKey)
    }
}

/// Failures raised while reading and validating a package.
///
/// The display strings double as the user-visible diagnostics, so their
/// formats are part of the crate's observable behavior.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The 16-byte header lead-in could not be read in full.
    #[error("hdr size({expected}): BAD, read returned {actual}")]
    IntroShort { expected: usize, actual: usize },

    /// The header lead-in does not start with the header magic.
    #[error("hdr magic: BAD")]
    BadMagic,

    /// Entry count above [`crate::tags::IL_MAX`].
    #[error("hdr tags: BAD, no. of tags({il}) out of range")]
    BadTagCount { il: u32 },

    /// Data-segment size above [`crate::tags::DL_MAX`].
    #[error("hdr data: BAD, no. of bytes({dl}) out of range")]
    BadDataSize { dl: u32 },

    /// Entry index plus data could not be read in full.
    #[error("hdr blob({expected}): BAD, read returned {actual}")]
    BlobShort { expected: usize, actual: usize },

    /// The signature header's alignment padding could not be read.
    #[error("sigh pad({expected}): BAD, read returned {actual}")]
    PadShort { expected: usize, actual: usize },

    /// Blob length disagrees with its own counts.
    #[error("blob size({uc}): BAD, 8 + 16 * il({il}) + dl({dl})")]
    BadBlobSize { uc: usize, il: u32, dl: u32 },

    /// A region was required but the header has no entries at all.
    #[error("region: no tags")]
    RegionMissing,

    /// The region entry exists but is malformed.
    #[error("region tag: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    BadRegionTag {
        tag: u32,
        ty: u32,
        offset: i32,
        count: u32,
    },

    /// The region trailer would fall outside the data segment.
    #[error("region offset: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    BadRegionOffset {
        tag: u32,
        ty: u32,
        offset: i32,
        count: u32,
    },

    /// The trailer record does not mirror the region entry.
    #[error("region trailer: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    BadRegionTrailer {
        tag: u32,
        ty: u32,
        offset: i32,
        count: u32,
    },

    /// Region sub-counts out of range or misaligned.
    #[error("region {region_tag} size: BAD, ril {ril} il {il} rdl {rdl} dl {dl}")]
    BadRegionSize {
        region_tag: u32,
        ril: u32,
        il: u32,
        rdl: u32,
        dl: u32,
    },

    /// Package files must have the region cover the whole header.
    #[error("region {region_tag}: tag number mismatch {il} ril {ril} dl {dl} rdl {rdl}")]
    RegionSizeMismatch {
        region_tag: u32,
        ril: u32,
        il: u32,
        rdl: u32,
        dl: u32,
    },

    /// One entry of the index failed structural validation.
    #[error("tag[{index}]: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    BadEntry {
        index: u32,
        tag: i32,
        ty: u32,
        offset: i32,
        count: u32,
    },

    /// A verified blob still failed to decode into a header.
    #[error("hdr load: BAD")]
    BadLoad,

    /// The file does not begin with a package lead.
    #[error("not an rpm package")]
    NotAPackage,

    /// The lead names a format revision this reader does not speak.
    #[error("unsupported package version {major}.{minor}")]
    BadLeadVersion { major: u8, minor: u8 },

    /// The lead names an unknown package type.
    #[error("unknown package type {ty}")]
    BadLeadType { ty: u16 },

    /// The lead demands a signature layout other than the header signature.
    #[error("unsupported signature type {ty}")]
    BadLeadSigType { ty: u16 },

    /// A signature or digest tag payload could not be parsed.
    #[error("{origin} signature: BAD, {reason}")]
    BadSignature {
        origin: &'static str,
        reason: String,
    },

    /// The chosen signature tag vanished between selection and retrieval.
    #[error("signature tag {tag} missing from signature header")]
    MissingSigTag { tag: u32 },

    /// Short read or transport error from the descriptor.
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type ReadResult<T> = Result<T, ReadError>;

impl ReadError {
    /// Verdict a failed read maps to. Everything structural is `Fail`; only
    /// a missing lead magic means "this is not a package at all".
    pub fn verdict(&self) -> Verdict {
        match self {
            ReadError::NotAPackage => Verdict::NotFound,
            _ => Verdict::Fail,
        }
    }
}
