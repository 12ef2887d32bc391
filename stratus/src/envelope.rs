use bytes::{Buf, BufMut, Bytes, BytesMut};
use shared::{Error, Result};

/// Wire size of the fixed-width header. Stable within a header version;
/// changing any field width requires a new version.
pub const HEADER_SIZE: usize = 20;

/// Current header layout revision.
pub const HEADER_VERSION_V1: u16 = 1;

/// No payload compression. Other values are reserved; no codec is invoked.
pub const COMPRESSION_NONE: u16 = 0;

/// Expiration sentinel for entries that never expire.
pub const NEVER_EXPIRES: f64 = 0.0;

/// Decoded envelope header.
///
/// Wire layout, big-endian:
///
/// ```text
/// [expires_at: f64][version: u16][compression: u16][extra: u64]
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    /// UNIX seconds; `0.0` means the entry never expires.
    pub expires_at: f64,
    pub version: u16,
    /// Reserved; `0` = none. Round-trips untouched.
    pub compression: u16,
    /// Reserved; round-trips untouched.
    pub extra: u64,
}

impl Header {
    pub fn new(expires_at: f64, version: u16) -> Self {
        Self {
            expires_at,
            version,
            compression: COMPRESSION_NONE,
            extra: 0,
        }
    }

    pub fn persistent(version: u16) -> Self {
        Self::new(NEVER_EXPIRES, version)
    }

    pub fn is_persistent(&self) -> bool {
        self.expires_at == NEVER_EXPIRES
    }

    /// An expiration of exactly `0.0` means persistent, never "expired
    /// at the epoch".
    pub fn is_expired(&self, now: f64) -> bool {
        !self.is_persistent() && self.expires_at <= now
    }

    /// Strict equality gate; any mismatch is unsupported.
    pub fn is_supported(&self, expected: u16) -> bool {
        self.version == expected
    }
}

/// Frame a payload behind the fixed-width header.
///
/// Output length is exactly `HEADER_SIZE + payload.len()`.
pub fn encode(header: &Header, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_f64(header.expires_at);
    buf.put_u16(header.version);
    buf.put_u16(header.compression);
    buf.put_u64(header.extra);
    buf.put_slice(payload);
    buf.freeze()
}

/// Post-version tail decoder for one header layout revision.
///
/// Versions without a registered decoder never parse, which keeps the
/// miss-on-mismatch contract intact when new revisions are added.
fn tail_decoder(version: u16) -> Option<fn(&mut &[u8]) -> (u16, u64)> {
    match version {
        HEADER_VERSION_V1 => Some(|buf| {
            let compression = buf.get_u16();
            let extra = buf.get_u64();
            (compression, extra)
        }),
        _ => None,
    }
}

/// Decode the header from the first `HEADER_SIZE` bytes of an entry.
///
/// The payload does not need to be present. Fails with
/// `Error::MalformedHeader` on short input and `Error::UnsupportedVersion`
/// for unregistered layout revisions.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::MalformedHeader {
            need: HEADER_SIZE,
            got: bytes.len(),
        });
    }

    let mut buf = &bytes[..HEADER_SIZE];
    let expires_at = buf.get_f64();
    let version = buf.get_u16();
    let decode_tail = tail_decoder(version).ok_or(Error::UnsupportedVersion(version))?;
    let (compression, extra) = decode_tail(&mut buf);

    Ok(Header {
        expires_at,
        version,
        compression,
        extra,
    })
}

/// Split a full entry at the fixed header boundary.
///
/// The payload is everything after the header and may be empty.
pub fn decode(mut bytes: Bytes) -> Result<(Header, Bytes)> {
    let header = decode_header(&bytes)?;
    bytes.advance(HEADER_SIZE);
    Ok((header, bytes))
}
