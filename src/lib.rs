//! # mipforge
//!
//! A content-addressable build cache for compressed texture mip chains.
//!
//! Building platform-specific texture data is expensive: color adjustment,
//! mip generation, and block compression over multi-megabyte sources. This
//! library caches those build outputs under deterministic keys derived from
//! the source content hash and the exact build configuration, so a build
//! only ever happens once per (content, settings, format version) anywhere
//! a cache is shared.
//!
//! ## Features
//!
//! - **Deterministic keys**: endian- and layout-independent key derivation;
//!   identical inputs produce identical keys on any machine, and changing
//!   any single build setting changes the key
//! - **Per-mip granularity**: every mip is stored under its own key, with a
//!   configurable inline window embedded directly in the artifact
//! - **Background builds**: cache population can run on the task pool and
//!   be retired later, with a non-blocking completion probe
//! - **Lazy streaming**: mips outside the inline window resolve on demand,
//!   atomically, with a safe rebuild path when entries go stale
//!
//! ## Architecture
//!
//! - [`key`] - deterministic cache key construction
//! - [`store`] - the abstract derived-data store and an in-memory backend
//! - [`platform`] - the built artifact, its binary layout, and streaming
//! - [`build`] - the compressor seam and the build worker
//! - [`cache`] - the orchestrator gluing lookup, build, and retirement
//! - [`settings`] / [`source`] / [`format`] - build configuration, source
//!   snapshots, and target formats
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mipforge::{
//!     BuildSettings, CacheFlags, ContentId, MemoryDdc, SourceFormat, SourceTexture,
//!     TextureArtifact, TextureDdc,
//! };
//! # struct MyCompressor;
//! # impl mipforge::Compressor for MyCompressor {
//! #     fn build_texture(
//! #         &self,
//! #         _s: &[mipforge::SourceImage],
//! #         _c: &[mipforge::SourceImage],
//! #         _b: &BuildSettings,
//! #     ) -> Result<Vec<mipforge::CompressedMip>, mipforge::CompressError> {
//! #         Ok(Vec::new())
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), Arc::new(MyCompressor));
//!
//!     let source_bytes = vec![0u8; 256 * 256 * 4];
//!     let texture = Arc::new(SourceTexture {
//!         name: "Game/Textures/Rock".to_string(),
//!         id: ContentId::from_bytes(&source_bytes),
//!         size_x: 256,
//!         size_y: 256,
//!         num_slices: 1,
//!         format: SourceFormat::Bgra8,
//!         srgb: true,
//!         mips: vec![source_bytes.into()],
//!         composite: None,
//!     });
//!     let settings = BuildSettings {
//!         format_name: "DXT1".to_string(),
//!         srgb: true,
//!         ..BuildSettings::default()
//!     };
//!
//!     let mut artifact = TextureArtifact::new();
//!     ddc.cache(&mut artifact, &texture, &settings, CacheFlags::default())
//!         .await;
//! }
//! ```

pub mod build;
pub mod cache;
pub mod error;
pub mod format;
pub mod key;
pub mod platform;
pub mod settings;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use build::{BuildWorker, CompressedMip, Compressor, WorkerState};
pub use cache::{
    BuildTask, CacheConfig, TextureArtifact, TextureDdc, DEFAULT_INLINE_MIP_COUNT,
};
pub use error::{CompressError, DecodeError};
pub use format::{FormatRegistry, PixelFormat, TextureFormat};
pub use key::{
    build_cache_key, derived_data_key, derived_data_key_from_suffix, derived_data_key_suffix,
    derived_mip_key, KeyWriter, DERIVED_DATA_NAMESPACE, DERIVED_DATA_VERSION,
};
pub use platform::{
    decode_mip_payload, deserialize_cooked, deserialize_platform_data, encode_mip_payload,
    serialize_cooked, serialize_platform_data, MipPayload, MipRecord, PlatformData,
};
pub use settings::{BuildSettings, CacheFlags, ColorAdjustment, CompositeMode, MipGenMode};
pub use source::{ContentId, SourceFormat, SourceImage, SourceTexture};
pub use store::{DdcHandle, DerivedDataCache, MemoryDdc, DEFAULT_MEMORY_DDC_CAPACITY};
