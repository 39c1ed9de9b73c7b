//! Source asset identity and frozen source snapshots.
//!
//! A build consumes a [`SourceTexture`]: an immutable snapshot of the source
//! asset's raw mip payloads plus its content identity. Snapshots are cheap to
//! share (`Arc` + [`Bytes`]) and carry everything a background build needs,
//! so a build never touches the live asset it was spawned for.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use sha2::{Digest, Sha256};

// =============================================================================
// Content Identity
// =============================================================================

/// Stable, opaque identifier for a source asset's raw bytes.
///
/// Computed as the hex-encoded SHA-256 digest of the content, so two assets
/// with identical bytes always share an id, on any machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    /// Compute the id for a blob of source content.
    pub fn from_bytes(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(hex::encode(digest))
    }

    /// Adopt an identity string computed upstream (e.g. an asset database
    /// guid). The caller is responsible for its stability.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Source Pixel Data
// =============================================================================

/// Uncompressed pixel layout of source mip payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFormat {
    /// Single 8-bit gray channel.
    G8,

    /// 8-bit BGRA.
    #[default]
    Bgra8,

    /// 8-bit BGR with a shared exponent.
    Bgre8,

    /// 16-bit RGBA.
    Rgba16,

    /// 16-bit float RGBA.
    Rgba16F,
}

/// One uncompressed source mip, frozen for the duration of a build.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Width in texels.
    pub size_x: i32,

    /// Height in texels.
    pub size_y: i32,

    /// Number of slices (1 for plain 2D, 6 for cubemaps).
    pub num_slices: i32,

    /// Pixel layout of `data`.
    pub format: SourceFormat,

    /// Source data is in sRGB space.
    pub srgb: bool,

    /// Raw texel payload.
    pub data: Bytes,
}

// =============================================================================
// Source Texture Snapshot
// =============================================================================

/// Immutable snapshot of a source asset, as consumed by a build.
///
/// `mips` holds the raw payload of every source mip that is resident; an
/// asset whose bulk data is not loaded simply has an empty list, which the
/// build reports as a recoverable failure (retry once the data is resident).
#[derive(Debug, Clone)]
pub struct SourceTexture {
    /// Asset path, used in diagnostics only.
    pub name: String,

    /// Content identity of the source bytes.
    pub id: ContentId,

    /// Top mip width in texels.
    pub size_x: i32,

    /// Top mip height in texels.
    pub size_y: i32,

    /// Number of slices per mip (1 for 2D, 6 for cubemaps).
    pub num_slices: i32,

    /// Pixel layout of the raw mip payloads.
    pub format: SourceFormat,

    /// Source data is in sRGB space.
    pub srgb: bool,

    /// Raw payload per source mip, top mip first. Empty when the source
    /// bulk data is not resident.
    pub mips: Vec<Bytes>,

    /// Optional composite source (e.g. the normal map whose roughness is
    /// folded into this texture).
    pub composite: Option<Arc<SourceTexture>>,
}

impl SourceTexture {
    /// Whether any source mip payloads are resident.
    pub fn has_source_mips(&self) -> bool {
        !self.mips.is_empty()
    }

    /// Dimensions of the given mip, derived by successive halving of the top
    /// mip and clamped to 1x1.
    pub fn mip_dimensions(&self, mip_index: usize) -> (i32, i32) {
        let w = (self.size_x >> mip_index).max(1);
        let h = (self.size_y >> mip_index).max(1);
        (w, h)
    }

    /// Raw payload of one source mip, if resident and non-empty.
    pub fn mip_data(&self, mip_index: usize) -> Option<Bytes> {
        self.mips
            .get(mip_index)
            .filter(|data| !data.is_empty())
            .cloned()
    }

    /// Whether both top-mip dimensions are powers of two.
    ///
    /// Composite sources with non-power-of-two dimensions cannot be combined
    /// and are skipped with a warning.
    pub fn is_power_of_two(&self) -> bool {
        self.size_x > 0
            && self.size_y > 0
            && (self.size_x as u32).is_power_of_two()
            && (self.size_y as u32).is_power_of_two()
    }
}

// =============================================================================
// Tests
// =============================================================================
