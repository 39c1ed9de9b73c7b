//! The pluggable texture compressor contract.

use bytes::Bytes;

use crate::error::CompressError;
use crate::format::PixelFormat;
use crate::settings::BuildSettings;
use crate::source::SourceImage;

/// One compressed mip produced by a [`Compressor`].
#[derive(Debug, Clone)]
pub struct CompressedMip {
    /// Width in texels.
    pub size_x: i32,

    /// Height in texels.
    pub size_y: i32,

    /// Pixel format of `data`. Every mip of one build must report the same
    /// format as mip 0; a compressor that mixes formats within a chain is
    /// broken.
    pub pixel_format: PixelFormat,

    /// Compressed payload, all slices concatenated.
    pub data: Bytes,
}

/// Pixel-level compressor for one or more target formats.
///
/// The contract is fixed: given the frozen source mips (plus optional
/// composite source mips) and the build settings, produce the complete
/// ordered mip chain, top mip first. The compressor is responsible for mip
/// generation according to `settings.mip_gen_mode`; callers hand it exactly
/// the source mips the mode requires.
///
/// Implementations are injected into the orchestrator, never discovered
/// through a global module registry, so tests can substitute a deterministic
/// fake.
pub trait Compressor: Send + Sync {
    /// Build the compressed mip chain.
    ///
    /// Returning an empty chain is treated as a failure by the caller, the
    /// same as returning an error.
    fn build_texture(
        &self,
        source_mips: &[SourceImage],
        composite_mips: &[SourceImage],
        settings: &BuildSettings,
    ) -> Result<Vec<CompressedMip>, CompressError>;
}
