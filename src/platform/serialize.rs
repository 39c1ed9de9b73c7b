//! Binary serialization of artifacts and mip payloads.
//!
//! The layout is order-significant and little-endian on every host:
//!
//! ```text
//! size_x:i32  size_y:i32  num_slices:i32  pixel_format_name:string
//! [cooked only: first_mip_to_serialize:i32]
//! num_mips:i32
//! per mip: size_x:i32  size_y:i32  tag:u8
//!          tag 0 (inline)    => len:i32 + bytes
//!          tag 1 (reference) => derived key string
//! string = len:i32 + utf8 bytes
//! ```
//!
//! Individual mip payloads are stored in the cache as `len:i32 + bytes`.
//! Decoding is strict: any layout violation is a [`DecodeError`], which
//! callers treat as a stale or corrupt entry (a miss).

use bytes::Bytes;

use crate::error::DecodeError;
use crate::format::PixelFormat;

use super::data::{MipPayload, MipRecord, PlatformData};

const PAYLOAD_TAG_INLINE: u8 = 0;
const PAYLOAD_TAG_CACHED: u8 = 1;

// =============================================================================
// Byte-Level Encoding
// =============================================================================

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn write_string(&mut self, value: &str) {
        self.write_i32(value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn write_blob(&mut self, value: &[u8]) {
        self.write_i32(value.len() as i32);
        self.buf.extend_from_slice(value);
    }

    fn into_bytes(self) -> Bytes {
        Bytes::from(self.buf)
    }
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.data.len() - self.pos;
        if len > available {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let raw = self.take(4)?;
        Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(DecodeError::NegativeLength(len));
        }
        Ok(len as usize)
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_len()?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|err| DecodeError::InvalidString(err.to_string()))
    }

    fn read_blob(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.read_len()?;
        let raw = self.take(len)?;
        Ok(Bytes::copy_from_slice(raw))
    }
}

// =============================================================================
// Artifact Serialization
// =============================================================================

fn write_platform_data(writer: &mut ByteWriter, data: &PlatformData) {
    writer.write_i32(data.size_x);
    writer.write_i32(data.size_y);
    writer.write_i32(data.num_slices);
    writer.write_string(data.pixel_format.name());
}

fn write_mips(writer: &mut ByteWriter, mips: &[MipRecord]) {
    writer.write_i32(mips.len() as i32);
    for mip in mips {
        writer.write_i32(mip.size_x);
        writer.write_i32(mip.size_y);
        match &mip.payload {
            MipPayload::Inline(data) => {
                writer.write_u8(PAYLOAD_TAG_INLINE);
                writer.write_blob(data);
            }
            MipPayload::Cached(key) => {
                writer.write_u8(PAYLOAD_TAG_CACHED);
                writer.write_string(key);
            }
        }
    }
}

/// Serialize an artifact in the editor layout (mip references preserved).
///
/// The artifact's own derived key is not part of the payload; on load it is
/// reassigned by whoever fetched the entry, since they necessarily hold the
/// key already.
pub fn serialize_platform_data(data: &PlatformData) -> Bytes {
    let mut writer = ByteWriter::new();
    write_platform_data(&mut writer, data);
    write_mips(&mut writer, &data.mips);
    writer.into_bytes()
}

/// Deserialize an editor-layout artifact.
pub fn deserialize_platform_data(raw: &[u8]) -> Result<PlatformData, DecodeError> {
    let mut reader = ByteReader::new(raw);
    let (mut data, _cooked_first_mip) = read_platform_data(&mut reader, false)?;
    data.derived_data_key = String::new();
    Ok(data)
}

/// Serialize an artifact in the cooked layout.
///
/// Cooking drops the first `lod_bias` mips (clamped so at least one mip
/// survives) and records how many were dropped as `first_mip_to_serialize`.
pub fn serialize_cooked(data: &PlatformData, lod_bias: i32) -> Bytes {
    let mip_count = data.mips.len();
    let first_mip = (lod_bias.max(0) as usize).min(mip_count.saturating_sub(1));

    let mut writer = ByteWriter::new();
    write_platform_data(&mut writer, data);
    writer.write_i32(first_mip as i32);
    write_mips(&mut writer, &data.mips[first_mip..]);
    writer.into_bytes()
}

/// Deserialize a cooked-layout artifact.
///
/// Returns the artifact plus the number of mips the cook dropped, so the
/// caller can adjust its resolution bias. The surviving top mip's
/// dimensions become the artifact dimensions.
pub fn deserialize_cooked(raw: &[u8]) -> Result<(PlatformData, i32), DecodeError> {
    let mut reader = ByteReader::new(raw);
    let (mut data, first_mip) = read_platform_data(&mut reader, true)?;
    data.derived_data_key = String::new();
    if let Some(top) = data.mips.first() {
        data.size_x = top.size_x;
        data.size_y = top.size_y;
    }
    Ok((data, first_mip))
}

fn read_platform_data(
    reader: &mut ByteReader<'_>,
    cooked: bool,
) -> Result<(PlatformData, i32), DecodeError> {
    let size_x = reader.read_i32()?;
    let size_y = reader.read_i32()?;
    let num_slices = reader.read_i32()?;
    let pixel_format = PixelFormat::from_name(&reader.read_string()?);

    let first_mip = if cooked { reader.read_i32()? } else { 0 };

    let num_mips = reader.read_len()?;
    let mut mips = Vec::with_capacity(num_mips);
    for _ in 0..num_mips {
        let mip_x = reader.read_i32()?;
        let mip_y = reader.read_i32()?;
        let payload = match reader.read_u8()? {
            PAYLOAD_TAG_INLINE => MipPayload::Inline(reader.read_blob()?),
            PAYLOAD_TAG_CACHED => MipPayload::Cached(reader.read_string()?),
            tag => return Err(DecodeError::UnknownPayloadTag(tag)),
        };
        mips.push(MipRecord {
            size_x: mip_x,
            size_y: mip_y,
            payload,
        });
    }

    Ok((
        PlatformData {
            size_x,
            size_y,
            num_slices,
            pixel_format,
            mips,
            derived_data_key: String::new(),
        },
        first_mip,
    ))
}

// =============================================================================
// Per-Mip Payloads
// =============================================================================

/// Encode one mip's bytes for storage under its derived key.
pub fn encode_mip_payload(data: &[u8]) -> Bytes {
    let mut writer = ByteWriter::new();
    writer.write_blob(data);
    writer.into_bytes()
}

/// Decode a stored mip payload back into raw bytes.
pub fn decode_mip_payload(raw: &[u8]) -> Result<Bytes, DecodeError> {
    let mut reader = ByteReader::new(raw);
    reader.read_blob()
}

// =============================================================================
// Tests
// =============================================================================
