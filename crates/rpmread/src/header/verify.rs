//! Structural verification of the entry index, and the header-only
//! signature/digest check over the trailing tags.

use crate::digest::DigestCtx;
use crate::error::{ReadError, ReadResult, Verdict};
use crate::keyring::Keyring;
use crate::sig::{verify_signature, SigInfo, SigPolicy};
use crate::tags::{
    ENTRY_INFO_SIZE, HEADER_I18NTABLE, HEADER_IMMUTABLE, HEADER_MAGIC, TagType, TAG_DSAHEADER,
    TAG_RSAHEADER, TAG_SHA1HEADER,
};

use super::blob::{EntryInfo, HeaderBlob};

/// Byte length of one entry's payload, or `None` when the extent cannot be
/// established inside `data`.
///
/// Strings are measured to their NUL terminator; array types must contain
/// exactly `count` NUL-terminated strings. Fixed-width types multiply out;
/// a zero-length payload is never valid.
pub(crate) fn data_length(ty: TagType, data: &[u8], offset: u32, count: u32) -> Option<u64> {
    let offset = offset as usize;
    if offset > data.len() {
        return None;
    }
    let len = match ty {
        TagType::String => {
            if count != 1 {
                return None;
            }
            let nul = data[offset..].iter().position(|&b| b == 0)?;
            nul as u64 + 1
        }
        TagType::StringArray | TagType::I18nString => {
            if count == 0 {
                return None;
            }
            let mut p = offset;
            for _ in 0..count {
                let nul = data[p..].iter().position(|&b| b == 0)?;
                p += nul + 1;
            }
            (p - offset) as u64
        }
        _ => {
            let size = ty.fixed_size()? as u64;
            size * count as u64
        }
    };
    (len > 0).then_some(len)
}

fn bad_entry(index: u32, e: &EntryInfo) -> ReadError {
    ReadError::BadEntry {
        index,
        tag: e.tag,
        ty: e.ty,
        offset: e.offset,
        count: e.count,
    }
}

/// Tag-by-tag sanity of the entry index.
///
/// Checks, for every entry past the region entry: tag above the reserved
/// floor, known type code, type-appropriate alignment, payload wholly
/// inside the data segment, no overlap with the previous entry, and string
/// payloads NUL-terminated with exactly `count` terminators.
pub(crate) fn verify_entries(blob: &HeaderBlob) -> ReadResult<()> {
    let data = blob.data();
    let dl = blob.dl() as i64;
    let start = u32::from(blob.region_tag != 0);
    let mut end: i64 = 0;

    for i in start..blob.il() {
        let e = blob.entry(i as usize);
        if e.tag < HEADER_I18NTABLE as i32 {
            return Err(bad_entry(i, &e));
        }
        let ty = TagType::from_raw(e.ty).ok_or_else(|| bad_entry(i, &e))?;
        if e.offset < 0 || e.offset as i64 > dl {
            return Err(bad_entry(i, &e));
        }
        if e.offset as u32 & (ty.alignment() - 1) != 0 {
            return Err(bad_entry(i, &e));
        }
        // Offsets are non-decreasing: no entry may reach back into the
        // previous entry's payload.
        if end > e.offset as i64 {
            return Err(bad_entry(i, &e));
        }
        let len = data_length(ty, data, e.offset as u32, e.count).ok_or_else(|| bad_entry(i, &e))?;
        let this_end = e.offset as i64 + len as i64;
        if this_end > dl {
            return Err(bad_entry(i, &e));
        }
        end = this_end;
    }
    Ok(())
}

/// Pick the strongest enabled digest/signature tag from the index tail
/// appended after the region was sealed.
///
/// Signatures beat the digest; between the two signature kinds the fixed
/// priority is RSA over DSA, and the first hit in index order wins among
/// entries of equal strength.
pub(crate) fn header_sig_scan(blob: &HeaderBlob, policy: &SigPolicy) -> Option<EntryInfo> {
    let mut best: Option<(u8, EntryInfo)> = None;
    for i in blob.ril()..blob.il() {
        let e = blob.entry(i as usize);
        let rank = match e.tag as u32 {
            TAG_RSAHEADER if policy.rsa => 3,
            TAG_DSAHEADER if policy.dsa => 2,
            TAG_SHA1HEADER if policy.sha1 => 1,
            _ => 0,
        };
        if rank == 0 {
            continue;
        }
        if best.map_or(true, |(r, _)| rank > r) {
            best = Some((rank, e));
        }
    }
    best.map(|(_, e)| e)
}

/// Evaluate the chosen header-only tag: parse its descriptor, digest the
/// canonical region serialization, and let the verification primitive
/// judge.
fn header_sig_verify(
    keyring: &dyn Keyring,
    blob: &HeaderBlob,
    einfo: &EntryInfo,
) -> (Verdict, String) {
    let Some(ty) = TagType::from_raw(einfo.ty) else {
        return (Verdict::Fail, bad_entry(0, einfo).to_string());
    };
    let Some(payload) = blob.entry_data(einfo) else {
        return (Verdict::Fail, bad_entry(0, einfo).to_string());
    };
    let info = match SigInfo::parse(einfo.tag as u32, ty, einfo.count, payload, "header") {
        Ok(info) => info,
        Err(e) => return (Verdict::Fail, e.to_string()),
    };

    let mut ctx = DigestCtx::init(info.hash_algo);
    ctx.update(&HEADER_MAGIC);
    ctx.update(&blob.ril().to_be_bytes());
    ctx.update(&blob.rdl().to_be_bytes());
    ctx.update(&blob.pe()[..ENTRY_INFO_SIZE * blob.ril() as usize]);
    ctx.update(&blob.data()[..blob.rdl() as usize]);

    verify_signature(keyring, &info, ctx)
}

/// Verify a structurally valid blob's trailing digest/signature tags, if
/// any are present and enabled. With nothing to check, structural validity
/// stands on its own.
pub(crate) fn verify_header_blob(
    keyring: &dyn Keyring,
    policy: &SigPolicy,
    blob: &HeaderBlob,
) -> (Verdict, String) {
    if blob.il() > blob.ril() {
        if let Some(einfo) = header_sig_scan(blob, policy) {
            return header_sig_verify(keyring, blob, &einfo);
        }
    }
    (Verdict::Ok, "Header sanity check: OK".to_string())
}

/// Validate a serialized metadata header held in memory, verifying its
/// header-only signature or digest when one is present and enabled.
///
/// This is the entry point for headers that do not come from a package
/// file (the region need not cover the whole blob). The header itself is
/// not returned; callers wanting the decoded form go through
/// [`crate::package::read_header`].
pub fn check_header(keyring: &dyn Keyring, policy: &SigPolicy, bytes: &[u8]) -> (Verdict, String) {
    match HeaderBlob::from_bytes(bytes.to_vec(), HEADER_IMMUTABLE, false) {
        Ok(blob) => verify_header_blob(keyring, policy, &blob),
        Err(e) => (e.verdict(), e.to_string()),
    }
}
