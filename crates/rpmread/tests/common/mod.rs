//! Builders for synthetic package files: raw header blobs with regions,
//! signature headers, leads, and fake-signed packets with correct digests.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;

use rpmread::sig::SigInfo;
use rpmread::tags::{
    HEADER_MAGIC, HEADER_SIGNATURES, LEAD_MAGIC, LEAD_SIZE, TagType,
};
use rpmread::{DigestAlgo, DigestCtx, KeyStatus, Keyring};

/// One entry fed to the blob builder, pre-serialized payload included.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub tag: u32,
    pub ty: u32,
    pub data: Vec<u8>,
    pub count: u32,
}

impl RawEntry {
    pub fn int32(tag: u32, values: &[u32]) -> Self {
        let mut data = Vec::new();
        for v in values {
            data.extend_from_slice(&v.to_be_bytes());
        }
        RawEntry {
            tag,
            ty: TagType::Int32 as u32,
            data,
            count: values.len() as u32,
        }
    }

    pub fn string(tag: u32, s: &str) -> Self {
        let mut data = s.as_bytes().to_vec();
        data.push(0);
        RawEntry {
            tag,
            ty: TagType::String as u32,
            data,
            count: 1,
        }
    }

    pub fn string_array(tag: u32, items: &[&str]) -> Self {
        let mut data = Vec::new();
        for s in items {
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        }
        RawEntry {
            tag,
            ty: TagType::StringArray as u32,
            data,
            count: items.len() as u32,
        }
    }

    pub fn bin(tag: u32, bytes: &[u8]) -> Self {
        RawEntry {
            tag,
            ty: TagType::Bin as u32,
            data: bytes.to_vec(),
            count: bytes.len() as u32,
        }
    }
}

fn align_for(ty: u32) -> usize {
    match ty {
        3 => 2,
        4 => 4,
        5 => 8,
        _ => 1,
    }
}

/// A serialized header blob plus its region bookkeeping.
pub struct BuiltBlob {
    /// `[il, dl, entry index, data]`.
    pub bytes: Vec<u8>,
    pub ril: u32,
    pub rdl: u32,
}

/// Serialize a blob with a leading region entry covering `covered`, and
/// `trailing` entries appended outside the region.
pub fn build_blob(region_tag: u32, covered: &[RawEntry], trailing: &[RawEntry]) -> BuiltBlob {
    let il = 1 + covered.len() as u32 + trailing.len() as u32;
    let ril = 1 + covered.len() as u32;

    let mut data = Vec::new();
    let mut records: Vec<(u32, u32, u32, u32)> = Vec::new();

    for e in covered {
        while data.len() % align_for(e.ty) != 0 {
            data.push(0);
        }
        records.push((e.tag, e.ty, data.len() as u32, e.count));
        data.extend_from_slice(&e.data);
    }

    let trailer_offset = data.len() as u32;
    data.extend_from_slice(&region_tag.to_be_bytes());
    data.extend_from_slice(&(TagType::Bin as u32).to_be_bytes());
    data.extend_from_slice(&(-(16 * ril as i32)).to_be_bytes());
    data.extend_from_slice(&16u32.to_be_bytes());
    let rdl = data.len() as u32;

    for e in trailing {
        while data.len() % align_for(e.ty) != 0 {
            data.push(0);
        }
        records.push((e.tag, e.ty, data.len() as u32, e.count));
        data.extend_from_slice(&e.data);
    }

    let dl = data.len() as u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&il.to_be_bytes());
    bytes.extend_from_slice(&dl.to_be_bytes());
    // region entry first, pointing at its trailer
    bytes.extend_from_slice(&region_tag.to_be_bytes());
    bytes.extend_from_slice(&(TagType::Bin as u32).to_be_bytes());
    bytes.extend_from_slice(&trailer_offset.to_be_bytes());
    bytes.extend_from_slice(&16u32.to_be_bytes());
    for (tag, ty, offset, count) in records {
        bytes.extend_from_slice(&tag.to_be_bytes());
        bytes.extend_from_slice(&ty.to_be_bytes());
        bytes.extend_from_slice(&offset.to_be_bytes());
        bytes.extend_from_slice(&count.to_be_bytes());
    }
    bytes.extend_from_slice(&data);

    BuiltBlob { bytes, ril, rdl }
}

/// Canonical digest input of a blob's region:
/// `magic || be32(ril) || be32(rdl) || pe[0..ril] || data[0..rdl]`.
pub fn region_digest_input(blob: &BuiltBlob) -> Vec<u8> {
    let il = u32::from_be_bytes(blob.bytes[0..4].try_into().unwrap());
    let pe_start = 8;
    let data_start = pe_start + 16 * il as usize;

    let mut input = Vec::new();
    input.extend_from_slice(&HEADER_MAGIC);
    input.extend_from_slice(&blob.ril.to_be_bytes());
    input.extend_from_slice(&blob.rdl.to_be_bytes());
    input.extend_from_slice(&blob.bytes[pe_start..pe_start + 16 * blob.ril as usize]);
    input.extend_from_slice(&blob.bytes[data_start..data_start + blob.rdl as usize]);
    input
}

/// Prefix blob bytes with the on-disk header magic.
pub fn with_magic(blob: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + blob.len());
    out.extend_from_slice(&HEADER_MAGIC);
    out.extend_from_slice(blob);
    out
}

/// Serialize a signature header stream: magic, blob, alignment padding.
pub fn sig_header_stream(entries: &[RawEntry]) -> Vec<u8> {
    let blob = build_blob(HEADER_SIGNATURES, entries, &[]);
    let mut out = with_magic(&blob.bytes);
    let body_len = blob.bytes.len() - 8;
    out.resize(out.len() + (8 - body_len % 8) % 8, 0);
    out
}

/// A 96-byte lead; `ty` 0 is binary, 1 is source.
pub fn lead(ty: u16) -> Vec<u8> {
    let mut buf = vec![0u8; LEAD_SIZE];
    buf[..4].copy_from_slice(&LEAD_MAGIC);
    buf[4] = 3;
    buf[6..8].copy_from_slice(&ty.to_be_bytes());
    buf[8..12].copy_from_slice(b"pkg\0");
    buf[78..80].copy_from_slice(&5u16.to_be_bytes());
    buf
}

/// Hex digest of `sha1(content)`, the payload format of the SHA1 tags.
pub fn sha1_hex(content: &[u8]) -> String {
    let mut ctx = DigestCtx::init(DigestAlgo::Sha1);
    ctx.update(content);
    ctx.finalize_hex()
}

/// Build a v4 signature packet over `content` and return it with the
/// digest a real public-key check would have verified. The left 16 bits
/// are set from the digest, so structural checks pass and trust is decided
/// entirely by the keyring.
pub fn signed_packet(
    pubkey_algo: u8,
    hash_algo: u8,
    key_id: [u8; 8],
    content: &[u8],
) -> (Vec<u8>, Vec<u8>) {
    let mut hashed = Vec::new();
    hashed.push(9);
    hashed.push(16); // issuer subpacket
    hashed.extend_from_slice(&key_id);

    let mut prefix = vec![4u8, 0x00, pubkey_algo, hash_algo];
    prefix.extend_from_slice(&(hashed.len() as u16).to_be_bytes());
    prefix.extend_from_slice(&hashed);

    let mut trailer = prefix.clone();
    trailer.extend_from_slice(&[0x04, 0xff]);
    trailer.extend_from_slice(&(prefix.len() as u32).to_be_bytes());

    let algo = DigestAlgo::from_openpgp(hash_algo).expect("known hash algo");
    let mut ctx = DigestCtx::init(algo);
    ctx.update(content);
    ctx.update(&trailer);
    let digest = ctx.finalize();

    let mut body = prefix.clone();
    body.extend_from_slice(&0u16.to_be_bytes()); // empty unhashed area
    body.extend_from_slice(&digest[..2]);
    body.extend_from_slice(&[0x01, 0x00, 0x01]); // stand-in MPI material

    let mut packet = vec![0x80 | (2 << 2), body.len() as u8];
    packet.extend_from_slice(&body);
    (packet, digest)
}

/// Keyring fake: maps signer key ids to the digest their signature is
/// expected to attest.
pub struct FakeKeyring {
    keys: HashMap<u32, Vec<u8>>,
    trusted: bool,
}

impl FakeKeyring {
    pub fn trusting() -> Self {
        FakeKeyring {
            keys: HashMap::new(),
            trusted: true,
        }
    }

    pub fn untrusted() -> Self {
        FakeKeyring {
            keys: HashMap::new(),
            trusted: false,
        }
    }

    pub fn with_key(mut self, keyid: u32, digest: Vec<u8>) -> Self {
        self.keys.insert(keyid, digest);
        self
    }
}

impl Keyring for FakeKeyring {
    fn verify(&self, sig: &SigInfo, digest: &[u8]) -> KeyStatus {
        match self.keys.get(&sig.key_id_u32()) {
            None => KeyStatus::NoKey,
            Some(expected) if expected == digest => {
                if self.trusted {
                    KeyStatus::Ok
                } else {
                    KeyStatus::NotTrusted
                }
            }
            Some(_) => KeyStatus::Fail,
        }
    }
}
