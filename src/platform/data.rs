//! Artifact data model.

use bytes::Bytes;

use crate::format::PixelFormat;

// =============================================================================
// Mip Records
// =============================================================================

/// Where a mip's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MipPayload {
    /// Bytes embedded directly in the artifact.
    Inline(Bytes),

    /// Bytes stored in the cache under their own derived key, fetched
    /// lazily.
    Cached(String),
}

impl MipPayload {
    /// Whether the payload is resident.
    pub fn is_inline(&self) -> bool {
        matches!(self, MipPayload::Inline(_))
    }

    /// The derived key, for referenced payloads.
    pub fn derived_key(&self) -> Option<&str> {
        match self {
            MipPayload::Cached(key) => Some(key),
            MipPayload::Inline(_) => None,
        }
    }
}

/// One level of the mip chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipRecord {
    /// Width in texels.
    pub size_x: i32,

    /// Height in texels.
    pub size_y: i32,

    /// Resident bytes or a cache reference.
    pub payload: MipPayload,
}

impl MipRecord {
    /// A mip with resident bytes.
    pub fn inline(size_x: i32, size_y: i32, data: Bytes) -> Self {
        Self {
            size_x,
            size_y,
            payload: MipPayload::Inline(data),
        }
    }

    /// A mip referencing bytes stored under a derived key.
    pub fn reference(size_x: i32, size_y: i32, derived_key: impl Into<String>) -> Self {
        Self {
            size_x,
            size_y,
            payload: MipPayload::Cached(derived_key.into()),
        }
    }

    /// Resident bytes, if any.
    pub fn data(&self) -> Option<&Bytes> {
        match &self.payload {
            MipPayload::Inline(data) => Some(data),
            MipPayload::Cached(_) => None,
        }
    }
}

// =============================================================================
// Platform Data
// =============================================================================

/// A fully described build artifact: dimensions, pixel format, and the
/// ordered mip chain.
///
/// Invariants:
/// - every mip shares the pixel format seeded by mip 0;
/// - `derived_data_key` is assigned before any cache interaction;
/// - while a build task is outstanding the artifact is owned by that task
///   and inaccessible to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformData {
    /// Top mip width in texels.
    pub size_x: i32,

    /// Top mip height in texels.
    pub size_y: i32,

    /// Slices per mip (1 for 2D, 6 for cubemaps).
    pub num_slices: i32,

    /// Pixel format shared by every mip. [`PixelFormat::Unknown`] until a
    /// build or cache hit populates the artifact.
    pub pixel_format: PixelFormat,

    /// The mip chain, top mip first.
    pub mips: Vec<MipRecord>,

    /// The cache key this artifact was derived under.
    pub derived_data_key: String,
}

impl PlatformData {
    /// An empty artifact with an unknown pixel format.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mips in the chain.
    pub fn mip_count(&self) -> usize {
        self.mips.len()
    }

    /// Whether the artifact is cube or array content (more than one slice
    /// per mip).
    pub fn is_layered(&self) -> bool {
        self.num_slices > 1
    }

    /// Expected payload size of one mip across all slices, or `None` when
    /// the pixel format is unknown.
    pub fn expected_mip_size(&self, mip_index: usize) -> Option<usize> {
        let mip = self.mips.get(mip_index)?;
        let slice = self.pixel_format.mip_byte_size(mip.size_x, mip.size_y)?;
        Some(slice * self.num_slices.max(1) as usize)
    }
}

// =============================================================================
// Tests
// =============================================================================
