//! Derived-data key construction.
//!
//! A cache key must be a pure function of the source content identity, the
//! build settings, and the per-format version: the same inputs must produce
//! the same key on any machine, and any change to any input must produce a
//! different key. Keys follow the grammar
//!
//! ```text
//! TEXTURE_<VER>_<formatName>_[<formatVersion>_]<contentId>[_<compositeId>]_<NN>_<derived><hex(settings)>
//! ```
//!
//! where `<NN>` is the two-digit inline-mip window and `<hex(settings)>` is
//! an uppercase hex dump of every numeric and boolean settings field written
//! through [`KeyWriter`] in a fixed order at fixed width. Per-mip keys append
//! `_MIP<index>_<w>x<h>` to the suffix.

use crate::format::FormatRegistry;
use crate::settings::BuildSettings;
use crate::source::SourceTexture;

/// Namespace under which all texture derived data is stored.
pub const DERIVED_DATA_NAMESPACE: &str = "TEXTURE";

/// Version of the texture derived-data layout.
///
/// Bump this to a fresh guid whenever the serialized artifact layout or the
/// key serialization below changes; doing so invalidates every cached
/// artifact at once.
pub const DERIVED_DATA_VERSION: &str = "8D2F42A94E1C4B06B1B6A9D273FF2C9A";

// =============================================================================
// Key Writer
// =============================================================================

/// Endian-independent byte writer for key serialization.
///
/// Every value is written at a fixed width in little-endian order regardless
/// of the host, so the resulting hex dump is identical across machines.
/// Floats are written as their IEEE-754 bit patterns.
#[derive(Debug, Default)]
pub struct KeyWriter {
    buf: Vec<u8>,
}

impl KeyWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
        }
    }

    /// Append a 32-bit float as its bit pattern.
    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    /// Append an unsigned 32-bit integer.
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a signed 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a boolean as a single byte.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    /// Consume the writer, producing an uppercase hex dump.
    pub fn into_hex(self) -> String {
        hex::encode_upper(self.buf)
    }
}

/// Serialize every settings field that affects build output, in fixed order.
///
/// The format name is deliberately absent: it already prefixes the key
/// suffix in plain text.
fn serialize_settings_for_key(writer: &mut KeyWriter, settings: &BuildSettings) {
    let color = &settings.color_adjustment;
    writer.write_f32(color.brightness);
    writer.write_f32(color.brightness_curve);
    writer.write_f32(color.saturation);
    writer.write_f32(color.vibrance);
    writer.write_f32(color.rgb_curve);
    writer.write_f32(color.hue);
    writer.write_f32(color.min_alpha);
    writer.write_f32(color.max_alpha);
    writer.write_f32(settings.mip_sharpening);
    writer.write_u32(settings.diffuse_convolve_mip_level);
    writer.write_u32(settings.sharpen_mip_kernel_size);
    writer.write_u8(settings.mip_gen_mode.as_u8());
    writer.write_bool(settings.cubemap);
    writer.write_bool(settings.srgb);
    writer.write_bool(settings.preserve_border);
    writer.write_bool(settings.dither_mip_alpha);
    writer.write_bool(settings.compute_bokeh_alpha);
    writer.write_bool(settings.replicate_red);
    writer.write_bool(settings.replicate_alpha);
    writer.write_bool(settings.downsample_with_average);
    writer.write_bool(settings.sharpen_without_color_shift);
    writer.write_bool(settings.border_color_black);
    writer.write_bool(settings.flip_green_channel);
    writer.write_bool(settings.apply_kernel_to_top_mip);
    writer.write_u8(settings.composite_mode.as_u8());
    writer.write_f32(settings.composite_power);
    writer.write_i32(settings.lod_bias);
    writer.write_bool(settings.streamable);
}

// =============================================================================
// Key Construction
// =============================================================================

/// Assemble a full cache key from a namespace, a layout version, and a
/// suffix.
pub fn build_cache_key(namespace: &str, version: &str, suffix: &str) -> String {
    format!("{}_{}_{}", namespace, version, suffix)
}

/// Compute the derived-data key suffix for a texture built with the given
/// settings.
///
/// The suffix alone identifies the artifact within the texture namespace;
/// per-mip keys extend it (see [`derived_mip_key`]).
pub fn derived_data_key_suffix(
    texture: &SourceTexture,
    settings: &BuildSettings,
    inline_mip_count: usize,
    formats: &FormatRegistry,
) -> String {
    let format = formats.find(&settings.format_name);
    let version = format.map(|f| f.version()).unwrap_or(0);
    let derived = format
        .map(|f| f.derived_key_string(texture))
        .unwrap_or_default();

    // The version segment is omitted at 0 so that adding a scheme to a
    // format later does not perturb keys of formats that never had one.
    let version_segment = if version == 0 {
        String::new()
    } else {
        format!("{}_", version)
    };

    let composite_segment = match &texture.composite {
        Some(composite) if settings.composite_mode.is_enabled() => {
            format!("_{}", composite.id)
        }
        _ => String::new(),
    };

    let mut suffix = format!(
        "{}_{}{}{}_{:02}_{}",
        settings.format_name, version_segment, texture.id, composite_segment, inline_mip_count,
        derived
    );

    let mut writer = KeyWriter::new();
    serialize_settings_for_key(&mut writer, settings);
    suffix.push_str(&writer.into_hex());
    suffix
}

/// Wrap a suffix in the texture namespace and layout version.
pub fn derived_data_key_from_suffix(suffix: &str) -> String {
    build_cache_key(DERIVED_DATA_NAMESPACE, DERIVED_DATA_VERSION, suffix)
}

/// Compute the full derived-data key for a texture built with the given
/// settings.
pub fn derived_data_key(
    texture: &SourceTexture,
    settings: &BuildSettings,
    inline_mip_count: usize,
    formats: &FormatRegistry,
) -> String {
    let suffix = derived_data_key_suffix(texture, settings, inline_mip_count, formats);
    derived_data_key_from_suffix(&suffix)
}

/// Compute the key under which one mip's payload is stored.
///
/// The mip index and exact dimensions are both part of the key, so a layout
/// change that moves a mip can never alias a stale payload.
pub fn derived_mip_key(suffix: &str, mip_index: usize, size_x: i32, size_y: i32) -> String {
    build_cache_key(
        DERIVED_DATA_NAMESPACE,
        DERIVED_DATA_VERSION,
        &format!("{}_MIP{}_{}x{}", suffix, mip_index, size_x, size_y),
    )
}

// =============================================================================
// Tests
// =============================================================================
