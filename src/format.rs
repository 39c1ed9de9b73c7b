//! Target pixel formats and the per-format key extension seam.
//!
//! [`PixelFormat`] describes the compressed layouts this cache can hold,
//! with enough block geometry to validate mip payload sizes and round-trip
//! format names through serialization.
//!
//! [`TextureFormat`] is the seam through which a format module contributes
//! its own version number and derived-key substring; implementations are
//! looked up in a [`FormatRegistry`] owned by the orchestrator rather than
//! any global table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::source::SourceTexture;

// =============================================================================
// Pixel Format
// =============================================================================

/// Compressed (or raw) pixel layout of built mip data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Format not yet known; the state of an empty or failed build.
    #[default]
    Unknown,

    /// BC1, 4x4 blocks of 8 bytes.
    Dxt1,

    /// BC2, 4x4 blocks of 16 bytes.
    Dxt3,

    /// BC3, 4x4 blocks of 16 bytes.
    Dxt5,

    /// BC5 two-channel, 4x4 blocks of 16 bytes.
    Bc5,

    /// Uncompressed 8-bit BGRA.
    Bgra8,

    /// Uncompressed 8-bit gray.
    G8,

    /// Uncompressed 16-bit float RGBA.
    Rgba16F,
}

impl PixelFormat {
    /// Stable name, used in the serialized artifact layout.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Unknown => "Unknown",
            PixelFormat::Dxt1 => "DXT1",
            PixelFormat::Dxt3 => "DXT3",
            PixelFormat::Dxt5 => "DXT5",
            PixelFormat::Bc5 => "BC5",
            PixelFormat::Bgra8 => "BGRA8",
            PixelFormat::G8 => "G8",
            PixelFormat::Rgba16F => "RGBA16F",
        }
    }

    /// Inverse of [`PixelFormat::name`]. Unrecognized names (from a newer or
    /// older serializer) decode as [`PixelFormat::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "DXT1" => PixelFormat::Dxt1,
            "DXT3" => PixelFormat::Dxt3,
            "DXT5" => PixelFormat::Dxt5,
            "BC5" => PixelFormat::Bc5,
            "BGRA8" => PixelFormat::Bgra8,
            "G8" => PixelFormat::G8,
            "RGBA16F" => PixelFormat::Rgba16F,
            _ => PixelFormat::Unknown,
        }
    }

    /// Block dimensions in texels.
    pub fn block_dimensions(self) -> (i32, i32) {
        match self {
            PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5 | PixelFormat::Bc5 => (4, 4),
            _ => (1, 1),
        }
    }

    /// Bytes per block. Zero for [`PixelFormat::Unknown`].
    pub fn bytes_per_block(self) -> usize {
        match self {
            PixelFormat::Unknown => 0,
            PixelFormat::Dxt1 => 8,
            PixelFormat::Dxt3 | PixelFormat::Dxt5 | PixelFormat::Bc5 => 16,
            PixelFormat::Bgra8 => 4,
            PixelFormat::G8 => 1,
            PixelFormat::Rgba16F => 8,
        }
    }

    /// Expected byte size of a single slice of a mip with the given
    /// dimensions, or `None` when the format is unknown.
    pub fn mip_byte_size(self, size_x: i32, size_y: i32) -> Option<usize> {
        if self == PixelFormat::Unknown || size_x <= 0 || size_y <= 0 {
            return None;
        }
        let (bw, bh) = self.block_dimensions();
        let blocks_x = (size_x + bw - 1) / bw;
        let blocks_y = (size_y + bh - 1) / bh;
        Some(blocks_x as usize * blocks_y as usize * self.bytes_per_block())
    }
}

// =============================================================================
// Format Modules
// =============================================================================

/// Per-format contribution to derived-data keys.
///
/// A format module versions its own output: bumping [`TextureFormat::version`]
/// invalidates every cached artifact built with that format, and
/// [`TextureFormat::derived_key_string`] lets a format fold extra state (e.g.
/// an external compressor revision) into the key.
pub trait TextureFormat: Send + Sync {
    /// Version of this format's output scheme. Zero means "no scheme", and
    /// is omitted from keys for backward compatibility.
    fn version(&self) -> u16 {
        0
    }

    /// Format-specific substring folded into the key suffix.
    fn derived_key_string(&self, _texture: &SourceTexture) -> String {
        String::new()
    }
}

/// Explicit map from format name to format module.
///
/// Owned by the orchestrator and passed by reference wherever keys are
/// derived. Formats with no registered module fall back to version 0 and an
/// empty derived substring.
#[derive(Default)]
pub struct FormatRegistry {
    formats: HashMap<String, Arc<dyn TextureFormat>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a format module under a format name, replacing any previous
    /// registration for that name.
    pub fn register(&mut self, name: impl Into<String>, format: Arc<dyn TextureFormat>) {
        self.formats.insert(name.into(), format);
    }

    /// Look up the module for a format name.
    pub fn find(&self, name: &str) -> Option<&Arc<dyn TextureFormat>> {
        self.formats.get(name)
    }
}

// =============================================================================
// Tests
// =============================================================================
