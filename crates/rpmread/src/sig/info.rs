//! Signature descriptors parsed from digest and signature tag payloads.
//!
//! Digest tags carry a hex string; signature tags carry one OpenPGP
//! signature packet (v3 or v4, RSA or DSA). Only the fields the
//! verification step needs are extracted: algorithms, signer key id, the
//! hashed trailer that finalizes a content digest, and the raw signature
//! material handed to the keyring.

use crate::digest::DigestAlgo;
use crate::error::{ReadError, ReadResult};
use crate::tags::{TagType, SIGTAG_DSA, SIGTAG_RSA, SIGTAG_SHA1};

/// Digest or signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigKind {
    Digest,
    Signature,
}

/// Public-key algorithm of a signature packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubkeyAlgo {
    Rsa,
    Dsa,
}

impl PubkeyAlgo {
    fn from_openpgp(id: u8) -> Option<Self> {
        match id {
            1 => Some(PubkeyAlgo::Rsa),
            17 => Some(PubkeyAlgo::Dsa),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PubkeyAlgo::Rsa => "RSA",
            PubkeyAlgo::Dsa => "DSA",
        }
    }
}

/// A parsed OpenPGP signature packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgpSignature {
    pub version: u8,
    pub sig_type: u8,
    pub pubkey_algo: u8,
    pub hash_algo: u8,
    /// Signer key id; all zeros when the packet names no issuer.
    pub key_id: [u8; 8],
    /// Bytes appended to the content digest before finalization: the v4
    /// hashed prefix plus its length trailer, or the v3 type+time field.
    pub hashed_trailer: Vec<u8>,
    /// Leftmost 16 bits of the expected digest, for quick rejection.
    pub left16: [u8; 2],
    /// Raw signature MPIs, fed to the keyring untouched.
    pub mpis: Vec<u8>,
}

/// Parsed descriptor of one signature or digest tag.
#[derive(Debug, Clone)]
pub struct SigInfo {
    pub kind: SigKind,
    pub hash_algo: DigestAlgo,
    pub key_algo: Option<PubkeyAlgo>,
    /// Signer key id, zeros for digests.
    pub key_id: [u8; 8],
    /// Expected hex digest, for digest tags.
    pub digest_hex: Option<String>,
    /// The signature packet, for signature tags.
    pub sig: Option<PgpSignature>,
    descr: String,
}

impl SigInfo {
    /// Parse the payload of a known digest/signature tag.
    ///
    /// `origin` labels diagnostics ("header" or "package"). The shared tag
    /// numbering means the same parser serves signature-header tags and
    /// the trailing header-only tags.
    pub fn parse(
        tag: u32,
        ty: TagType,
        count: u32,
        payload: &[u8],
        origin: &'static str,
    ) -> ReadResult<SigInfo> {
        let bad = |reason: String| ReadError::BadSignature { origin, reason };

        match tag {
            SIGTAG_SHA1 => {
                if ty != TagType::String || count != 1 {
                    return Err(bad(format!("invalid type {} for SHA1 digest", ty as u32)));
                }
                // Stored NUL-terminated on disk; decoded values have it
                // stripped already.
                let hex = payload.strip_suffix(&[0]).unwrap_or(payload);
                if hex.len() != 40 || !hex.iter().all(u8::is_ascii_hexdigit) {
                    return Err(bad(format!("invalid SHA1 digest length {}", hex.len())));
                }
                let digest = String::from_utf8_lossy(hex).to_lowercase();
                Ok(SigInfo {
                    kind: SigKind::Digest,
                    hash_algo: DigestAlgo::Sha1,
                    key_algo: None,
                    key_id: [0; 8],
                    digest_hex: Some(digest),
                    sig: None,
                    descr: "Header SHA1 digest".to_string(),
                })
            }
            SIGTAG_RSA | SIGTAG_DSA => {
                if ty != TagType::Bin {
                    return Err(bad(format!("invalid type {} for signature", ty as u32)));
                }
                let sig = parse_pgp_signature(payload).map_err(bad)?;
                let key_algo = PubkeyAlgo::from_openpgp(sig.pubkey_algo)
                    .ok_or_else(|| bad(format!("unsupported pubkey algorithm {}", sig.pubkey_algo)))?;
                let expected = if tag == SIGTAG_RSA {
                    PubkeyAlgo::Rsa
                } else {
                    PubkeyAlgo::Dsa
                };
                if key_algo != expected {
                    return Err(bad(format!(
                        "{} signature carries a {} packet",
                        expected.name(),
                        key_algo.name()
                    )));
                }
                let hash_algo = DigestAlgo::from_openpgp(sig.hash_algo)
                    .ok_or_else(|| bad(format!("unsupported hash algorithm {}", sig.hash_algo)))?;
                let descr = format!(
                    "V{} {}/{} Signature, key ID {}",
                    sig.version,
                    key_algo.name(),
                    hash_algo.name(),
                    hex::encode(&sig.key_id[4..8])
                );
                Ok(SigInfo {
                    kind: SigKind::Signature,
                    hash_algo,
                    key_algo: Some(key_algo),
                    key_id: sig.key_id,
                    digest_hex: None,
                    sig: Some(sig),
                    descr,
                })
            }
            _ => Err(bad(format!("unsupported signature tag {tag}"))),
        }
    }

    /// Human-readable identity used in result messages.
    pub fn descr(&self) -> &str {
        &self.descr
    }

    /// Low 32 bits of the signer key id, big-endian; `0` when unknown.
    pub fn key_id_u32(&self) -> u32 {
        u32::from_be_bytes([self.key_id[4], self.key_id[5], self.key_id[6], self.key_id[7]])
    }
}

fn take(buf: &[u8], n: usize) -> Result<(&[u8], &[u8]), String> {
    if buf.len() < n {
        return Err("truncated signature packet".to_string());
    }
    Ok(buf.split_at(n))
}

/// Parse one OpenPGP signature packet (old or new framing, v3 or v4 body).
fn parse_pgp_signature(buf: &[u8]) -> Result<PgpSignature, String> {
    let (head, rest) = take(buf, 1)?;
    let b0 = head[0];
    if b0 & 0x80 == 0 {
        return Err("not an OpenPGP packet".to_string());
    }

    let (tag, body) = if b0 & 0x40 == 0 {
        // Old format: tag in bits 5..2, length type in bits 1..0.
        let tag = (b0 >> 2) & 0x0f;
        let (len, rest) = match b0 & 0x03 {
            0 => {
                let (l, rest) = take(rest, 1)?;
                (l[0] as usize, rest)
            }
            1 => {
                let (l, rest) = take(rest, 2)?;
                (u16::from_be_bytes([l[0], l[1]]) as usize, rest)
            }
            2 => {
                let (l, rest) = take(rest, 4)?;
                (u32::from_be_bytes([l[0], l[1], l[2], l[3]]) as usize, rest)
            }
            _ => (rest.len(), rest),
        };
        let (body, trailing) = take(rest, len)?;
        if !trailing.is_empty() {
            return Err("trailing garbage after signature packet".to_string());
        }
        (tag, body)
    } else {
        // New format: tag in bits 5..0, variable-length length.
        let tag = b0 & 0x3f;
        let (l0, rest) = take(rest, 1)?;
        let (len, rest) = match l0[0] {
            l @ 0..=191 => (l as usize, rest),
            l @ 192..=223 => {
                let (l1, rest) = take(rest, 1)?;
                (((l as usize - 192) << 8) + l1[0] as usize + 192, rest)
            }
            255 => {
                let (l4, rest) = take(rest, 4)?;
                (u32::from_be_bytes([l4[0], l4[1], l4[2], l4[3]]) as usize, rest)
            }
            _ => return Err("partial-length signature packet".to_string()),
        };
        let (body, trailing) = take(rest, len)?;
        if !trailing.is_empty() {
            return Err("trailing garbage after signature packet".to_string());
        }
        (tag, body)
    };

    if tag != 2 {
        return Err(format!("unexpected packet tag {tag}"));
    }

    let (version, body) = take(body, 1)?;
    match version[0] {
        3 => parse_v3_body(body),
        4 => parse_v4_body(body),
        v => Err(format!("unsupported signature version {v}")),
    }
}

fn parse_v3_body(body: &[u8]) -> Result<PgpSignature, String> {
    // hashed-length octet (always 5), type, time, key id, algorithms,
    // left16, MPIs.
    let (fixed, mpis) = take(body, 18)?;
    if fixed[0] != 5 {
        return Err("bad v3 hashed length".to_string());
    }
    if mpis.is_empty() {
        return Err("signature packet has no MPIs".to_string());
    }
    let mut key_id = [0u8; 8];
    key_id.copy_from_slice(&fixed[6..14]);
    Ok(PgpSignature {
        version: 3,
        sig_type: fixed[1],
        pubkey_algo: fixed[14],
        hash_algo: fixed[15],
        key_id,
        // v3 hashes the signature type and creation time.
        hashed_trailer: fixed[1..6].to_vec(),
        left16: [fixed[16], fixed[17]],
        mpis: mpis.to_vec(),
    })
}

fn parse_v4_body(body: &[u8]) -> Result<PgpSignature, String> {
    let (fixed, rest) = take(body, 5)?;
    let sig_type = fixed[0];
    let pubkey_algo = fixed[1];
    let hash_algo = fixed[2];
    let hashed_len = u16::from_be_bytes([fixed[3], fixed[4]]) as usize;
    let (hashed, rest) = take(rest, hashed_len)?;

    let (ulen, rest) = take(rest, 2)?;
    let unhashed_len = u16::from_be_bytes([ulen[0], ulen[1]]) as usize;
    let (unhashed, rest) = take(rest, unhashed_len)?;

    let (left16, mpis) = take(rest, 2)?;
    if mpis.is_empty() {
        return Err("signature packet has no MPIs".to_string());
    }

    let key_id = find_issuer(hashed)
        .or_else(|| find_issuer(unhashed))
        .unwrap_or([0u8; 8]);

    // The v4 digest trailer: the hashed prefix of the packet (version
    // through hashed subpackets), then 0x04 0xff and the prefix length.
    let prefix_len = 6 + hashed_len;
    let mut hashed_trailer = Vec::with_capacity(prefix_len + 6);
    hashed_trailer.push(4);
    hashed_trailer.extend_from_slice(fixed);
    hashed_trailer.extend_from_slice(hashed);
    hashed_trailer.extend_from_slice(&[0x04, 0xff]);
    hashed_trailer.extend_from_slice(&(prefix_len as u32).to_be_bytes());

    Ok(PgpSignature {
        version: 4,
        sig_type,
        pubkey_algo,
        hash_algo,
        key_id,
        hashed_trailer,
        left16: [left16[0], left16[1]],
        mpis: mpis.to_vec(),
    })
}

/// Scan a subpacket area for the issuer key id (subpacket type 16).
fn find_issuer(mut area: &[u8]) -> Option<[u8; 8]> {
    while !area.is_empty() {
        let (len, consumed) = match area[0] {
            l @ 0..=191 => (l as usize, 1),
            l @ 192..=254 => {
                if area.len() < 2 {
                    return None;
                }
                (((l as usize - 192) << 8) + area[1] as usize + 192, 2)
            }
            255 => {
                if area.len() < 5 {
                    return None;
                }
                (
                    u32::from_be_bytes([area[1], area[2], area[3], area[4]]) as usize,
                    5,
                )
            }
        };
        area = &area[consumed..];
        // Length covers the type octet and the body.
        if len == 0 || len > area.len() {
            return None;
        }
        let ptype = area[0] & 0x7f;
        if ptype == 16 && len == 9 {
            let mut id = [0u8; 8];
            id.copy_from_slice(&area[1..9]);
            return Some(id);
        }
        area = &area[len..];
    }
    None
}
