//! Build configuration for texture derived data.
//!
//! [`BuildSettings`] captures every knob that affects the bytes a build
//! produces. Two settings values that compare equal always produce the same
//! derived data, which is what makes them safe to fold into a cache key
//! (see [`crate::key`]).
//!
//! Settings are constructed once per cache request and never mutated. Use
//! struct update syntax on [`BuildSettings::default`] to override individual
//! fields:
//!
//! ```
//! use mipforge::settings::BuildSettings;
//!
//! let settings = BuildSettings {
//!     format_name: "DXT1".to_string(),
//!     srgb: true,
//!     ..BuildSettings::default()
//! };
//! ```

// =============================================================================
// Color Adjustment
// =============================================================================

/// Color adjustments applied to the source image before compression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjustment {
    /// Brightness multiplier.
    pub brightness: f32,

    /// Brightness curve exponent.
    pub brightness_curve: f32,

    /// Saturation multiplier (0 = grayscale).
    pub saturation: f32,

    /// Vibrance adjustment.
    pub vibrance: f32,

    /// RGB curve exponent.
    pub rgb_curve: f32,

    /// Hue rotation in degrees.
    pub hue: f32,

    /// Remapped minimum alpha value.
    pub min_alpha: f32,

    /// Remapped maximum alpha value.
    pub max_alpha: f32,
}

impl Default for ColorAdjustment {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            brightness_curve: 1.0,
            saturation: 1.0,
            vibrance: 0.0,
            rgb_curve: 1.0,
            hue: 0.0,
            min_alpha: 0.0,
            max_alpha: 1.0,
        }
    }
}

// =============================================================================
// Mip Generation
// =============================================================================

/// How the mip chain is produced from the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MipGenMode {
    /// Defer to the texture group's default filter.
    #[default]
    FromGroup,

    /// Simple 2x2 box filter.
    SimpleAverage,

    /// Sharpened downsample.
    Sharpen,

    /// Blurred downsample.
    Blur,

    /// Top mip only; no chain is generated.
    NoMipmaps,

    /// Preserve the mips already present in the source asset.
    LeaveExisting,
}

impl MipGenMode {
    /// Stable byte value used in key serialization.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            MipGenMode::FromGroup => 0,
            MipGenMode::SimpleAverage => 1,
            MipGenMode::Sharpen => 2,
            MipGenMode::Blur => 3,
            MipGenMode::NoMipmaps => 4,
            MipGenMode::LeaveExisting => 5,
        }
    }

    /// Whether the build regenerates the whole chain from mip 0.
    ///
    /// When true, only the top source mip is gathered; any further source
    /// mips are ignored and rebuilt by the compressor.
    pub fn regenerates_from_top(self) -> bool {
        !matches!(self, MipGenMode::LeaveExisting)
    }
}

/// How a composite source (e.g. a normal map driving roughness) is combined
/// into the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// No composite source is consumed, even if one is referenced.
    #[default]
    Disabled,

    /// Normal-map roughness written to the red channel.
    NormalRoughnessToRed,

    /// Normal-map roughness written to the green channel.
    NormalRoughnessToGreen,

    /// Normal-map roughness written to the blue channel.
    NormalRoughnessToBlue,

    /// Normal-map roughness written to the alpha channel.
    NormalRoughnessToAlpha,
}

impl CompositeMode {
    /// Stable byte value used in key serialization.
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            CompositeMode::Disabled => 0,
            CompositeMode::NormalRoughnessToRed => 1,
            CompositeMode::NormalRoughnessToGreen => 2,
            CompositeMode::NormalRoughnessToBlue => 3,
            CompositeMode::NormalRoughnessToAlpha => 4,
        }
    }

    /// Whether a composite source participates in the build at all.
    pub fn is_enabled(self) -> bool {
        !matches!(self, CompositeMode::Disabled)
    }
}

// =============================================================================
// Build Settings
// =============================================================================

/// Every knob that affects build output for one target format.
///
/// Immutable once constructed. Equality is field-by-field; two equivalent
/// settings values serialize to the same key suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    /// Name of the target compressed format (e.g. `"DXT1"`, `"BC5"`).
    pub format_name: String,

    /// Color adjustments applied before compression.
    pub color_adjustment: ColorAdjustment,

    /// Mip sharpening amount.
    pub mip_sharpening: f32,

    /// Mip level at which cubemaps are diffuse-convolved (0 = disabled).
    pub diffuse_convolve_mip_level: u32,

    /// Kernel size used when sharpening mips.
    pub sharpen_mip_kernel_size: u32,

    /// Mip chain generation mode.
    pub mip_gen_mode: MipGenMode,

    /// Build as a cubemap (six slices).
    pub cubemap: bool,

    /// Source data is in sRGB space.
    pub srgb: bool,

    /// Preserve border texels across mip levels.
    pub preserve_border: bool,

    /// Dither alpha when downsampling.
    pub dither_mip_alpha: bool,

    /// Compute bokeh alpha (depth-of-field sprite sheets).
    pub compute_bokeh_alpha: bool,

    /// Replicate the red channel to all channels (grayscale/alpha sources).
    pub replicate_red: bool,

    /// Replicate the alpha channel to all channels (displacement sources).
    pub replicate_alpha: bool,

    /// Downsample with a plain average rather than the group filter.
    pub downsample_with_average: bool,

    /// Sharpen luminance only, without shifting chroma.
    pub sharpen_without_color_shift: bool,

    /// Treat the border color as black when preserving borders.
    pub border_color_black: bool,

    /// Flip the green channel (normal map handedness).
    pub flip_green_channel: bool,

    /// Apply the downsample kernel to the top mip as well.
    pub apply_kernel_to_top_mip: bool,

    /// How the composite source is combined, if one is referenced.
    pub composite_mode: CompositeMode,

    /// Power applied to the composite contribution.
    pub composite_power: f32,

    /// Resolution bias applied when cooking (drops that many top mips).
    pub lod_bias: i32,

    /// Whether the built texture may stream mips at runtime.
    pub streamable: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            format_name: String::new(),
            color_adjustment: ColorAdjustment::default(),
            mip_sharpening: 0.0,
            diffuse_convolve_mip_level: 0,
            sharpen_mip_kernel_size: 2,
            mip_gen_mode: MipGenMode::default(),
            cubemap: false,
            srgb: false,
            preserve_border: false,
            dither_mip_alpha: false,
            compute_bokeh_alpha: false,
            replicate_red: false,
            replicate_alpha: false,
            downsample_with_average: false,
            sharpen_without_color_shift: false,
            border_color_black: false,
            flip_green_channel: false,
            apply_kernel_to_top_mip: false,
            composite_mode: CompositeMode::default(),
            composite_power: 1.0,
            lod_bias: 0,
            streamable: true,
        }
    }
}

// =============================================================================
// Cache Flags
// =============================================================================

/// Per-request controls for how a cache operation executes.
///
/// These do not affect the produced bytes and are therefore *not* part of the
/// cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheFlags {
    /// Run the build on a background task instead of inline.
    pub async_build: bool,

    /// Skip the cache lookup and rebuild from source unconditionally.
    pub force_rebuild: bool,

    /// After a hit or build, resolve every mip reference into owned bytes.
    pub inline_mips: bool,

    /// Source data is resident, so the build may gather it off-thread.
    pub allow_async_build: bool,

    /// Cache-warming mode: verify a hit by fetching every mip payload.
    pub for_ddc_build: bool,
}

// =============================================================================
// Tests
// =============================================================================
