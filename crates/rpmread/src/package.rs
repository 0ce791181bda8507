//! The package reader: lead, signature header, metadata header, strongest
//! signature, retrofits, and the legacy signature-tag merge.

use std::io::Read;

use crate::error::{ReadError, ReadResult, Verdict};
use crate::header::convert::{compress_filelist, retrofit_v3};
use crate::header::verify::verify_header_blob;
use crate::header::{Header, HeaderBlob};
use crate::keyring::Keyring;
use crate::lead::{read_lead, LeadType};
use crate::sig::{select_package_sig, verify_signature, SigInfo, SigPolicy};
use crate::sigheader::read_signature_header;
use crate::tags::{
    remap_legacy_sig_tag, TagType, HEADER_IMMUTABLE, HEADER_MAGIC, TAG_OLDFILENAMES,
    TAG_SOURCEPACKAGE, TAG_SOURCERPM,
};
use crate::digest::DigestCtx;

/// What a package read produced.
#[derive(Debug)]
pub struct ReadOutcome {
    pub verdict: Verdict,
    /// The metadata header; present when the verdict keeps it.
    pub header: Option<Header>,
    /// Low 32 bits of the signer key id, `0` when no signature was
    /// evaluated.
    pub keyid: u32,
    /// Diagnostic or disposition line, when one exists.
    pub message: Option<String>,
}

impl ReadOutcome {
    fn bare(verdict: Verdict, message: Option<String>) -> Self {
        ReadOutcome {
            verdict,
            header: None,
            keyid: 0,
            message,
        }
    }
}

/// Read and verify one package file end to end.
///
/// The verdict reflects the strongest enabled signature or digest found in
/// the signature header, checked over the canonical serialization of the
/// metadata header's immutable region. `NoKey` and `NotTrusted` are not
/// fatal: the header is still returned and the caller decides policy.
pub fn read_package<R: Read>(
    keyring: &dyn Keyring,
    policy: &SigPolicy,
    r: &mut R,
) -> ReadOutcome {
    let lead_type = match read_lead(r) {
        Ok(t) => t,
        // Probably a text manifest, not a package; stay quiet.
        Err(ReadError::NotAPackage) => return ReadOutcome::bare(Verdict::NotFound, None),
        Err(e) => return ReadOutcome::bare(e.verdict(), Some(e.to_string())),
    };

    let sigh = match read_signature_header(r) {
        Ok(h) => h,
        Err(e) => return ReadOutcome::bare(e.verdict(), Some(e.to_string())),
    };

    // Pick the most effective verification available before touching the
    // metadata. Only one tag is used.
    let sigtag = select_package_sig(&sigh, policy);

    let (mut header, sanity_msg) = match read_meta_header(keyring, policy, r) {
        Ok(pair) => pair,
        Err((verdict, msg)) => return ReadOutcome::bare(verdict, Some(msg)),
    };

    let mut keyid = 0u32;
    let (verdict, message) = match sigtag {
        None => (Verdict::Ok, sanity_msg),
        Some(tag) => match package_sig_check(keyring, &sigh, tag, &header) {
            Ok((verdict, message, kid)) => {
                keyid = kid;
                (verdict, message)
            }
            Err(e) => (Verdict::Fail, e.to_string()),
        },
    };

    // The key id is only reported alongside a usable header.
    if !verdict.keeps_header() {
        return ReadOutcome::bare(verdict, Some(message));
    }

    apply_retrofits(&mut header, lead_type);
    merge_legacy_sigs(&mut header, &sigh);

    ReadOutcome {
        verdict,
        header: Some(header),
        keyid,
        message: Some(message),
    }
}

/// Read and verify a metadata header alone (no lead, no signature header).
///
/// The stream must be positioned at the header magic. Useful for header
/// files and database imports that share the package header format.
pub fn read_header<R: Read>(
    keyring: &dyn Keyring,
    policy: &SigPolicy,
    r: &mut R,
) -> ReadOutcome {
    match read_meta_header(keyring, policy, r) {
        Ok((header, message)) => ReadOutcome {
            verdict: Verdict::Ok,
            header: Some(header),
            keyid: 0,
            message: Some(message),
        },
        Err((verdict, message)) => ReadOutcome::bare(verdict, Some(message)),
    }
}

/// Stream-read the metadata header, verify it structurally and against any
/// header-only signature, and decode it.
fn read_meta_header<R: Read>(
    keyring: &dyn Keyring,
    policy: &SigPolicy,
    r: &mut R,
) -> Result<(Header, String), (Verdict, String)> {
    let blob = HeaderBlob::read(r, HEADER_IMMUTABLE, true)
        .map_err(|e| (e.verdict(), e.to_string()))?;

    let (verdict, msg) = verify_header_blob(keyring, policy, &blob);
    if verdict != Verdict::Ok {
        return Err((verdict, msg));
    }

    let header = Header::from_blob(blob)
        .map_err(|_| (Verdict::Fail, ReadError::BadLoad.to_string()))?;
    Ok((header, msg))
}

/// Retrieve the chosen signature tag, parse it, digest the immutable
/// region, and verify. Returns the verdict, its message, and the signer
/// key id.
fn package_sig_check(
    keyring: &dyn Keyring,
    sigh: &Header,
    tag: u32,
    header: &Header,
) -> ReadResult<(Verdict, String, u32)> {
    let entry = sigh.get(tag).ok_or(ReadError::MissingSigTag { tag })?;
    let payload = entry
        .value
        .raw_bytes()
        .ok_or(ReadError::MissingSigTag { tag })?;
    let info = SigInfo::parse(
        tag,
        entry.value.tag_type(),
        entry.value.count(),
        payload,
        "package",
    )?;

    let mut ctx = DigestCtx::init(info.hash_algo);
    if let Some(image) = header.immutable_region_image() {
        ctx.update(&HEADER_MAGIC);
        ctx.update(image);
    }

    let (verdict, message) = verify_signature(keyring, &info, ctx);
    Ok((verdict, message, info.key_id_u32()))
}

/// Upgrade legacy encodings after a successful read.
fn apply_retrofits(header: &mut Header, lead_type: LeadType) {
    // Source packages get the explicit marker when the lead identifies
    // them and the header agrees.
    if lead_type == LeadType::Source && header.is_source() && !header.is_entry(TAG_SOURCEPACKAGE) {
        header.put_u32(TAG_SOURCEPACKAGE, 1);
    }
    // A source-looking header without the marker gets a placeholder
    // source reference so downstream binary/source tests keep working.
    if !header.is_entry(TAG_SOURCEPACKAGE) && header.is_source() {
        header.put_string(TAG_SOURCERPM, "(none)");
    }
    // No immutable region means a truly ancient header: full retrofit.
    // Otherwise only the plain filename list may need compressing.
    if !header.is_entry(HEADER_IMMUTABLE) {
        retrofit_v3(header);
    } else if header.is_entry(TAG_OLDFILENAMES) {
        compress_filelist(header);
    }
}

/// Translate and merge legacy signature tags into the metadata header.
///
/// Best effort by design: entries that fail the type/count sanity rules
/// are skipped, never fatal. Running the merge twice is a no-op.
fn merge_legacy_sigs(header: &mut Header, sigh: &Header) {
    for entry in sigh.entries() {
        let Some(tag) = remap_legacy_sig_tag(entry.tag) else {
            continue;
        };
        if header.is_entry(tag) {
            continue;
        }
        let value = &entry.value;
        let sane = match value.tag_type() {
            TagType::Null => false,
            TagType::Char
            | TagType::Int8
            | TagType::Int16
            | TagType::Int32
            | TagType::Int64 => value.count() == 1,
            TagType::String | TagType::Bin => value.count() < 16 * 1024,
            TagType::StringArray | TagType::I18nString => false,
        };
        if sane {
            header.put(tag, value.clone());
        }
    }
}
