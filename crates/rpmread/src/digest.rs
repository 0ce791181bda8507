//! Digest primitive: init / update / finalize over the hash algorithms the
//! package format can name.
//!
//! Algorithm ids follow the OpenPGP registry, which is what signature
//! packets and payload-digest tags carry on disk.

use digest::Digest;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

/// Hash algorithms selectable by a signature or digest tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgo {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgo {
    /// Resolve an OpenPGP hash-algorithm id.
    pub fn from_openpgp(id: u8) -> Option<Self> {
        match id {
            1 => Some(DigestAlgo::Md5),
            2 => Some(DigestAlgo::Sha1),
            8 => Some(DigestAlgo::Sha256),
            9 => Some(DigestAlgo::Sha384),
            10 => Some(DigestAlgo::Sha512),
            11 => Some(DigestAlgo::Sha224),
            _ => None,
        }
    }

    /// Display name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgo::Md5 => "MD5",
            DigestAlgo::Sha1 => "SHA1",
            DigestAlgo::Sha224 => "SHA224",
            DigestAlgo::Sha256 => "SHA256",
            DigestAlgo::Sha384 => "SHA384",
            DigestAlgo::Sha512 => "SHA512",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(self) -> usize {
        match self {
            DigestAlgo::Md5 => 16,
            DigestAlgo::Sha1 => 20,
            DigestAlgo::Sha224 => 28,
            DigestAlgo::Sha256 => 32,
            DigestAlgo::Sha384 => 48,
            DigestAlgo::Sha512 => 64,
        }
    }
}

enum Inner {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

/// A running digest computation.
pub struct DigestCtx {
    inner: Inner,
}

impl DigestCtx {
    /// Start a digest for `algo`.
    pub fn init(algo: DigestAlgo) -> Self {
        let inner = match algo {
            DigestAlgo::Md5 => Inner::Md5(Md5::new()),
            DigestAlgo::Sha1 => Inner::Sha1(Sha1::new()),
            DigestAlgo::Sha224 => Inner::Sha224(Sha224::new()),
            DigestAlgo::Sha256 => Inner::Sha256(Sha256::new()),
            DigestAlgo::Sha384 => Inner::Sha384(Sha384::new()),
            DigestAlgo::Sha512 => Inner::Sha512(Sha512::new()),
        };
        DigestCtx { inner }
    }

    /// Feed bytes.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Inner::Md5(h) => h.update(data),
            Inner::Sha1(h) => h.update(data),
            Inner::Sha224(h) => h.update(data),
            Inner::Sha256(h) => h.update(data),
            Inner::Sha384(h) => h.update(data),
            Inner::Sha512(h) => h.update(data),
        }
    }

    /// Finish and return the raw digest.
    pub fn finalize(self) -> Vec<u8> {
        match self.inner {
            Inner::Md5(h) => h.finalize().to_vec(),
            Inner::Sha1(h) => h.finalize().to_vec(),
            Inner::Sha224(h) => h.finalize().to_vec(),
            Inner::Sha256(h) => h.finalize().to_vec(),
            Inner::Sha384(h) => h.finalize().to_vec(),
            Inner::Sha512(h) => h.finalize().to_vec(),
        }
    }

    /// Finish and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.finalize())
    }
}
