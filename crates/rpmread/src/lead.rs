//! Parser for the 96-byte package lead.
//!
//! The lead predates the header format and survives only as a file-type
//! marker; everything except the magic, the format revision, the package
//! type, and the signature layout is ignored.

use std::io::Read;

use crate::error::{ReadError, ReadResult};
use crate::header::blob::read_full;
use crate::tags::{LEAD_MAGIC, LEAD_SIZE};

/// Whether the lead marks a binary or a source package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadType {
    Binary,
    Source,
}

/// Only leads demanding a header signature are accepted.
const SIGTYPE_HEADERSIG: u16 = 5;

/// Read and validate the lead.
///
/// A missing lead magic yields [`ReadError::NotAPackage`]; the caller
/// treats that as "probably a text manifest" rather than corruption.
pub fn read_lead<R: Read>(r: &mut R) -> ReadResult<LeadType> {
    let mut buf = [0u8; LEAD_SIZE];
    let n = read_full(r, &mut buf)?;
    if n != LEAD_SIZE {
        return Err(ReadError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("lead size({LEAD_SIZE}): BAD, read returned {n}"),
        )));
    }

    if buf[..4] != LEAD_MAGIC {
        return Err(ReadError::NotAPackage);
    }

    let major = buf[4];
    let minor = buf[5];
    if !(3..=4).contains(&major) {
        return Err(ReadError::BadLeadVersion { major, minor });
    }

    let ty = u16::from_be_bytes([buf[6], buf[7]]);
    let lead_type = match ty {
        0 => LeadType::Binary,
        1 => LeadType::Source,
        _ => return Err(ReadError::BadLeadType { ty }),
    };

    // name[66], osnum and archnum carry no authority; skip to the
    // signature-type field at offset 78.
    let sig_type = u16::from_be_bytes([buf[78], buf[79]]);
    if sig_type != SIGTYPE_HEADERSIG {
        return Err(ReadError::BadLeadSigType { ty: sig_type });
    }

    Ok(lead_type)
}
