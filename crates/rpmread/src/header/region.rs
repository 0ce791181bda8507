//! Immutable-region location and validation.
//!
//! The region is delimited by a region entry at index 0 and a trailer
//! record inside the data segment whose `offset` field, stored negated,
//! encodes the byte size of the region's entry index. Resolving the trailer
//! happens once, here; afterwards only the `ril`/`rdl` sub-counts survive.

use crate::error::{ReadError, ReadResult};
use crate::tags::{ENTRY_INFO_SIZE, REGION_TAG_COUNT, TagType};

use super::blob::{EntryInfo, HeaderBlob};

/// Locate and validate the immutable region expected under `region_tag`.
///
/// Returns `Ok(true)` when the region was found and verified, `Ok(false)`
/// when entry 0 carries some other tag (a legacy header, not an error).
/// On success the blob's `region_tag`, `ril`, and `rdl` are filled in.
pub(crate) fn verify_region(
    blob: &mut HeaderBlob,
    region_tag: u32,
    exact_size: bool,
) -> ReadResult<bool> {
    if blob.il() < 1 {
        return Err(ReadError::RegionMissing);
    }

    let einfo = blob.entry(0);

    if einfo.tag != region_tag as i32 {
        return Ok(false);
    }

    if einfo.ty != TagType::Bin as u32 || einfo.count != REGION_TAG_COUNT {
        return Err(ReadError::BadRegionTag {
            tag: einfo.tag as u32,
            ty: einfo.ty,
            offset: einfo.offset,
            count: einfo.count,
        });
    }

    // The trailer must lie wholly inside the data segment.
    let dl = blob.dl() as i64;
    if einfo.offset < 0 || einfo.offset as i64 + REGION_TAG_COUNT as i64 > dl {
        return Err(ReadError::BadRegionOffset {
            tag: einfo.tag as u32,
            ty: einfo.ty,
            offset: einfo.offset,
            count: einfo.count,
        });
    }

    let region_end = einfo.offset as usize;
    let trailer = EntryInfo::parse(&blob.data()[region_end..region_end + ENTRY_INFO_SIZE]);
    let rdl = region_end as u32 + REGION_TAG_COUNT;

    // The trailer offset is stored negated.
    let trailer_offset = trailer.offset.wrapping_neg();
    if trailer.tag != region_tag as i32
        || trailer.ty != TagType::Bin as u32
        || trailer.count != REGION_TAG_COUNT
    {
        return Err(ReadError::BadRegionTrailer {
            tag: trailer.tag as u32,
            ty: trailer.ty,
            offset: trailer_offset,
            count: trailer.count,
        });
    }

    let ril = trailer_offset / ENTRY_INFO_SIZE as i32;
    if trailer_offset % ENTRY_INFO_SIZE as i32 != 0
        || ril < 0
        || ril as u32 > blob.il()
        || rdl > blob.dl()
    {
        return Err(ReadError::BadRegionSize {
            region_tag,
            ril: ril.max(0) as u32,
            il: blob.il(),
            rdl,
            dl: blob.dl(),
        });
    }
    let ril = ril as u32;

    // In package files the region is expected to cover the whole header.
    if exact_size && !(blob.il() == ril && blob.dl() == rdl) {
        return Err(ReadError::RegionSizeMismatch {
            region_tag,
            ril,
            il: blob.il(),
            rdl,
            dl: blob.dl(),
        });
    }

    blob.region_tag = region_tag;
    blob.ril = ril;
    blob.rdl = rdl;
    Ok(true)
}
