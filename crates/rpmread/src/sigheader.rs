//! Reader for the signature header that precedes the metadata header.
//!
//! Same blob format as the metadata header, under its own region tag, but
//! padded so the metadata header that follows starts 8-byte aligned. The
//! region need not cover the whole blob here.

use std::io::Read;

use crate::error::{ReadError, ReadResult};
use crate::header::blob::read_full;
use crate::header::{Header, HeaderBlob};
use crate::tags::{ENTRY_INFO_SIZE, HEADER_SIGNATURES};

/// Read, verify, and decode the signature header, consuming its padding.
pub fn read_signature_header<R: Read>(r: &mut R) -> ReadResult<Header> {
    let blob = HeaderBlob::read(r, HEADER_SIGNATURES, false)?;
    let body_len = ENTRY_INFO_SIZE * blob.il() as usize + blob.dl() as usize;
    let header = Header::from_blob(blob)?;

    let pad = (8 - body_len % 8) % 8;
    if pad != 0 {
        let mut buf = [0u8; 7];
        let n = read_full(r, &mut buf[..pad])?;
        if n != pad {
            return Err(ReadError::PadShort {
                expected: pad,
                actual: n,
            });
        }
    }

    Ok(header)
}
