//! Raw, validated view over one serialized header.
//!
//! A [`HeaderBlob`] owns the `ei` buffer `[il, dl, entry index, data]` and
//! carries the verified counts. Every integer in the buffer is
//! attacker-controlled; nothing here is trusted until the region and
//! structure checks have run, which construction enforces.

use std::io::Read;

use crate::error::{ReadError, ReadResult};
use crate::tags::{DL_MAX, ENTRY_INFO_SIZE, HEADER_MAGIC, IL_MAX, TagType};

use super::region::verify_region;
use super::verify::{data_length, verify_entries};

/// One decoded entry record, host byte order.
///
/// `tag` and `offset` are kept signed: the region trailer stores a negated
/// offset, and negative values must fail range checks rather than wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub tag: i32,
    pub ty: u32,
    pub offset: i32,
    pub count: u32,
}

impl EntryInfo {
    /// Decode a 16-byte record.
    pub(crate) fn parse(buf: &[u8]) -> Self {
        EntryInfo {
            tag: i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            ty: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            offset: i32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            count: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        }
    }
}

/// A parsed and structurally verified header blob.
#[derive(Debug)]
pub struct HeaderBlob {
    /// `[il_be, dl_be, entry index, data]`.
    ei: Vec<u8>,
    il: u32,
    dl: u32,
    pvlen: usize,
    /// Region tag found at entry 0, or `0` when the header predates
    /// regions.
    pub(crate) region_tag: u32,
    /// Entries covered by the region (region entry included).
    pub(crate) ril: u32,
    /// Data bytes covered by the region (trailer included).
    pub(crate) rdl: u32,
}

impl HeaderBlob {
    /// Validate a complete in-memory blob.
    ///
    /// `region_tag` names the immutable region expected at entry 0; a blob
    /// without one is accepted as legacy and left with `region_tag == 0`.
    /// `exact_size` demands the region cover the whole header, which holds
    /// for package files but not for database-loaded headers.
    pub fn from_bytes(ei: Vec<u8>, region_tag: u32, exact_size: bool) -> ReadResult<Self> {
        let uc = ei.len();
        if uc < 8 {
            return Err(ReadError::BadBlobSize { uc, il: 0, dl: 0 });
        }
        let il = u32::from_be_bytes([ei[0], ei[1], ei[2], ei[3]]);
        let dl = u32::from_be_bytes([ei[4], ei[5], ei[6], ei[7]]);
        if il > IL_MAX {
            return Err(ReadError::BadTagCount { il });
        }
        if dl > DL_MAX {
            return Err(ReadError::BadDataSize { dl });
        }
        let pvlen = 8 + ENTRY_INFO_SIZE * il as usize + dl as usize;
        if pvlen != uc {
            return Err(ReadError::BadBlobSize { uc, il, dl });
        }

        let mut blob = HeaderBlob {
            ei,
            il,
            dl,
            pvlen,
            region_tag: 0,
            ril: 0,
            rdl: 0,
        };
        verify_region(&mut blob, region_tag, exact_size)?;
        verify_entries(&blob)?;
        Ok(blob)
    }

    /// Read one header from a stream: 16-byte lead-in `{magic, il, dl}`,
    /// then exactly `16*il + dl` more bytes.
    pub fn read<R: Read>(r: &mut R, region_tag: u32, exact_size: bool) -> ReadResult<Self> {
        let mut intro = [0u8; 16];
        let n = read_full(r, &mut intro)?;
        if n != intro.len() {
            return Err(ReadError::IntroShort {
                expected: intro.len(),
                actual: n,
            });
        }
        if intro[..8] != HEADER_MAGIC {
            return Err(ReadError::BadMagic);
        }
        let il = u32::from_be_bytes([intro[8], intro[9], intro[10], intro[11]]);
        if il > IL_MAX {
            return Err(ReadError::BadTagCount { il });
        }
        let dl = u32::from_be_bytes([intro[12], intro[13], intro[14], intro[15]]);
        if dl > DL_MAX {
            return Err(ReadError::BadDataSize { dl });
        }

        let nb = ENTRY_INFO_SIZE * il as usize + dl as usize;
        let mut ei = vec![0u8; 8 + nb];
        ei[..8].copy_from_slice(&intro[8..16]);
        let n = read_full(r, &mut ei[8..])?;
        if n != nb {
            return Err(ReadError::BlobShort {
                expected: nb,
                actual: n,
            });
        }

        Self::from_bytes(ei, region_tag, exact_size)
    }

    pub fn il(&self) -> u32 {
        self.il
    }

    pub fn dl(&self) -> u32 {
        self.dl
    }

    pub fn ril(&self) -> u32 {
        self.ril
    }

    pub fn rdl(&self) -> u32 {
        self.rdl
    }

    /// Region tag found at entry 0, or `None` for a legacy header.
    pub fn region_tag(&self) -> Option<u32> {
        (self.region_tag != 0).then_some(self.region_tag)
    }

    /// Total blob length: `8 + 16*il + dl`.
    pub fn pvlen(&self) -> usize {
        self.pvlen
    }

    /// The serialized entry index.
    pub fn pe(&self) -> &[u8] {
        &self.ei[8..8 + ENTRY_INFO_SIZE * self.il as usize]
    }

    /// The data segment.
    pub fn data(&self) -> &[u8] {
        &self.ei[8 + ENTRY_INFO_SIZE * self.il as usize..self.pvlen]
    }

    /// Decode entry `i`. Panics if `i >= il`; callers iterate verified
    /// bounds.
    pub fn entry(&self, i: usize) -> EntryInfo {
        let start = 8 + ENTRY_INFO_SIZE * i;
        EntryInfo::parse(&self.ei[start..start + ENTRY_INFO_SIZE])
    }

    /// Payload bytes of one entry, or `None` if its extent is invalid.
    /// Entries that passed structural verification always resolve.
    pub(crate) fn entry_data(&self, e: &EntryInfo) -> Option<&[u8]> {
        let ty = TagType::from_raw(e.ty)?;
        if e.offset < 0 {
            return None;
        }
        let len = data_length(ty, self.data(), e.offset as u32, e.count)?;
        let off = e.offset as usize;
        self.data().get(off..off + len as usize)
    }

    /// Serialized image of the immutable region:
    /// `be32(ril) || be32(rdl) || pe[0..ril] || data[0..rdl]`.
    ///
    /// This is the canonical input of the package-level header digest (after
    /// the 8-byte magic) and is itself a loadable header blob.
    pub fn region_image(&self) -> Option<Vec<u8>> {
        if self.region_tag == 0 {
            return None;
        }
        let pe_len = ENTRY_INFO_SIZE * self.ril as usize;
        let mut image = Vec::with_capacity(8 + pe_len + self.rdl as usize);
        image.extend_from_slice(&self.ril.to_be_bytes());
        image.extend_from_slice(&self.rdl.to_be_bytes());
        image.extend_from_slice(&self.pe()[..pe_len]);
        image.extend_from_slice(&self.data()[..self.rdl as usize]);
        Some(image)
    }
}

const MAX_EINTR_RETRIES: usize = 16;

/// Read until `buf` is full or the stream ends; returns bytes read.
/// Interrupted reads are retried a bounded number of times.
pub(crate) fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    let mut retries = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                retries = 0;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                retries += 1;
                if retries >= MAX_EINTR_RETRIES {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Interrupted,
                        format!(
                            "persistent EINTR: interrupted {MAX_EINTR_RETRIES} consecutive times"
                        ),
                    ));
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::HEADER_IMMUTABLE;

    #[test]
    fn truncated_intro_reports_byte_count() {
        let bytes = [0u8; 4];
        let err = HeaderBlob::read(&mut &bytes[..], HEADER_IMMUTABLE, true).unwrap_err();
        assert_eq!(err.to_string(), "hdr size(16): BAD, read returned 4");
    }

    #[test]
    fn zeroed_magic_is_rejected() {
        let bytes = [0u8; 16];
        let err = HeaderBlob::read(&mut &bytes[..], HEADER_IMMUTABLE, true).unwrap_err();
        assert_eq!(err.to_string(), "hdr magic: BAD");
    }

    #[test]
    fn oversize_tag_count_is_rejected() {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&HEADER_MAGIC);
        bytes[8..12].copy_from_slice(&0x0010_0000u32.to_be_bytes());
        let err = HeaderBlob::read(&mut &bytes[..], HEADER_IMMUTABLE, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "hdr tags: BAD, no. of tags(1048576) out of range"
        );
    }

    #[test]
    fn oversize_data_len_is_rejected() {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&HEADER_MAGIC);
        bytes[8..12].copy_from_slice(&1u32.to_be_bytes());
        bytes[12..16].copy_from_slice(&0x1000_0000u32.to_be_bytes());
        let err = HeaderBlob::read(&mut &bytes[..], HEADER_IMMUTABLE, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "hdr data: BAD, no. of bytes(268435456) out of range"
        );
    }

    #[test]
    fn blob_size_must_match_counts() {
        // il=1, dl=4 promises 8 + 16 + 4 = 28 bytes; hand it 30.
        let mut ei = Vec::new();
        ei.extend_from_slice(&1u32.to_be_bytes());
        ei.extend_from_slice(&4u32.to_be_bytes());
        ei.resize(30, 0);
        let err = HeaderBlob::from_bytes(ei, HEADER_IMMUTABLE, false).unwrap_err();
        assert_eq!(err.to_string(), "blob size(30): BAD, 8 + 16 * il(1) + dl(4)");
    }

    #[test]
    fn short_body_reports_byte_count() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&HEADER_MAGIC);
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&32u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 10]); // 10 of the promised 48
        let err = HeaderBlob::read(&mut &bytes[..], HEADER_IMMUTABLE, true).unwrap_err();
        assert_eq!(err.to_string(), "hdr blob(48): BAD, read returned 10");
    }

    #[test]
    fn read_full_gives_up_on_persistent_interrupts() {
        struct AlwaysInterrupted;
        impl Read for AlwaysInterrupted {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::Interrupted))
            }
        }
        let mut buf = [0u8; 4];
        let err = read_full(&mut AlwaysInterrupted, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::Interrupted);
        assert!(err.to_string().contains("persistent EINTR"));
    }

    #[test]
    fn read_full_survives_occasional_interrupts() {
        struct Flaky<'a> {
            data: &'a [u8],
            interrupt_next: bool,
        }
        impl Read for Flaky<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.interrupt_next {
                    self.interrupt_next = false;
                    return Err(std::io::Error::from(std::io::ErrorKind::Interrupted));
                }
                self.interrupt_next = true;
                if self.data.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.data[0];
                self.data = &self.data[1..];
                Ok(1)
            }
        }
        let mut buf = [0u8; 4];
        let mut r = Flaky {
            data: b"abcd",
            interrupt_next: true,
        };
        let n = read_full(&mut r, &mut buf).unwrap();
        assert_eq!(n, 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn read_full_counts_partial_reads() {
        struct Dribble<'a>(&'a [u8]);
        impl Read for Dribble<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }
        let mut buf = [0u8; 8];
        let n = read_full(&mut Dribble(b"abcde"), &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf[..5], b"abcde");
    }
}
