//! The derived-data build worker.
//!
//! A [`BuildWorker`] owns one build attempt end to end: it snapshots the
//! source, consults the cache, invokes the compressor on a miss, and
//! publishes results back to the cache. [`BuildWorker::do_work`] touches
//! only the frozen snapshot taken at construction, so it is safe to run on
//! any task; [`BuildWorker::finalize`] consumes the worker on the
//! originating side and hands the artifact back, falling back to a
//! synchronous gather-and-build when nothing else produced one.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::build::compressor::Compressor;
use crate::format::PixelFormat;
use crate::key::derived_mip_key;
use crate::platform::{
    deserialize_platform_data, encode_mip_payload, serialize_platform_data, MipPayload, MipRecord,
    PlatformData,
};
use crate::settings::{BuildSettings, CacheFlags};
use crate::source::{SourceImage, SourceTexture};
use crate::store::DerivedDataCache;

// =============================================================================
// Worker State
// =============================================================================

/// Phases of a build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, nothing attempted.
    Idle,

    /// Snapshotting source mips.
    GatheringSource,

    /// Running the compressor.
    Building,

    /// Writing results back to the cache.
    Publishing,

    /// The artifact is populated, from a verified hit or a fresh build.
    Done,

    /// This attempt produced nothing; the artifact has an unknown pixel
    /// format until a retry succeeds.
    Failed,
}

// =============================================================================
// Build Worker
// =============================================================================

/// One in-flight derived-data build.
pub struct BuildWorker {
    /// The injected codec.
    compressor: Arc<dyn Compressor>,

    /// Where derived data is stored.
    ddc: Arc<dyn DerivedDataCache>,

    /// The artifact being populated. Exclusively owned by this worker until
    /// [`BuildWorker::finalize`] releases it.
    derived_data: PlatformData,

    /// Frozen snapshot of the source asset.
    texture: Arc<SourceTexture>,

    /// Build configuration.
    settings: BuildSettings,

    /// Cache-control flags for this attempt.
    flags: CacheFlags,

    /// Number of tail mips embedded inline rather than referenced.
    inline_mip_count: usize,

    /// Key suffix shared by the artifact and its per-mip entries.
    key_suffix: String,

    /// Gathered source mips, ready for the compressor.
    source_mips: Vec<SourceImage>,

    /// Gathered composite source mips, possibly empty.
    composite_mips: Vec<SourceImage>,

    state: WorkerState,
    succeeded: bool,
    work_done: bool,
    gather_attempted: bool,
}

impl BuildWorker {
    /// Create a worker around a frozen source snapshot.
    ///
    /// `derived_data` must already carry its derived key. When the flags
    /// allow an asynchronous build, the source is gathered here, on the
    /// originating side, so `do_work` never has to.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        compressor: Arc<dyn Compressor>,
        ddc: Arc<dyn DerivedDataCache>,
        derived_data: PlatformData,
        texture: Arc<SourceTexture>,
        settings: BuildSettings,
        flags: CacheFlags,
        inline_mip_count: usize,
        key_suffix: String,
    ) -> Self {
        debug_assert!(!derived_data.derived_data_key.is_empty());
        let mut worker = Self {
            compressor,
            ddc,
            derived_data,
            texture,
            settings,
            flags,
            inline_mip_count,
            key_suffix,
            source_mips: Vec::new(),
            composite_mips: Vec::new(),
            state: WorkerState::Idle,
            succeeded: false,
            work_done: false,
            gather_attempted: false,
        };
        if worker.flags.allow_async_build {
            worker.gather_source();
        }
        worker
    }

    /// Current phase.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Whether this attempt produced a usable artifact.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Snapshot the source mips this build consumes.
    fn gather_source(&mut self) {
        self.state = WorkerState::GatheringSource;
        self.gather_attempted = true;
        self.derived_data.mips.clear();
        self.source_mips.clear();
        self.composite_mips.clear();

        if !self.texture.has_source_mips() {
            warn!("texture has no source mips: {}", self.texture.name);
            self.derived_data.pixel_format = PixelFormat::Unknown;
            self.state = WorkerState::Failed;
            return;
        }

        // Regenerating modes rebuild the whole chain from the top mip; only
        // LeaveExisting consumes every source mip.
        let num_source_mips = if self.settings.mip_gen_mode.regenerates_from_top() {
            1
        } else {
            self.texture.mips.len()
        };
        let num_slices = if self.settings.cubemap {
            self.texture.num_slices.max(1)
        } else {
            1
        };

        for mip_index in 0..num_source_mips {
            let (size_x, size_y) = self.texture.mip_dimensions(mip_index);
            match self.texture.mip_data(mip_index) {
                Some(data) => self.source_mips.push(SourceImage {
                    size_x,
                    size_y,
                    num_slices,
                    format: self.texture.format,
                    srgb: self.texture.srgb,
                    data,
                }),
                None => {
                    warn!(
                        "cannot retrieve source data for mip {} of texture {}",
                        mip_index, self.texture.name
                    );
                    self.source_mips.clear();
                    self.derived_data.pixel_format = PixelFormat::Unknown;
                    self.state = WorkerState::Failed;
                    return;
                }
            }
        }

        if let Some(composite) = &self.texture.composite {
            if self.settings.composite_mode.is_enabled() {
                if composite.is_power_of_two() {
                    for mip_index in 0..composite.mips.len() {
                        let (size_x, size_y) = composite.mip_dimensions(mip_index);
                        match composite.mip_data(mip_index) {
                            Some(data) => self.composite_mips.push(SourceImage {
                                size_x,
                                size_y,
                                num_slices,
                                format: composite.format,
                                srgb: composite.srgb,
                                data,
                            }),
                            None => {
                                warn!(
                                    "cannot retrieve composite source data for mip {} of texture {}",
                                    mip_index, self.texture.name
                                );
                                self.composite_mips.clear();
                                break;
                            }
                        }
                    }
                } else {
                    warn!(
                        "composite texture with non-power-of-two dimensions cannot be used: {} (assigned on texture: {})",
                        composite.name, self.texture.name
                    );
                }
            }
        }
    }

    /// Compress the gathered source and publish the results.
    async fn build_texture(&mut self) {
        if self.source_mips.is_empty() {
            return;
        }
        self.state = WorkerState::Building;
        info!(
            "building texture {} ({})",
            self.texture.name, self.settings.format_name
        );

        self.derived_data.size_x = 0;
        self.derived_data.size_y = 0;
        self.derived_data.pixel_format = PixelFormat::Unknown;
        self.derived_data.mips.clear();

        let compressed = match self.compressor.build_texture(
            &self.source_mips,
            &self.composite_mips,
            &self.settings,
        ) {
            Ok(mips) => mips,
            Err(err) => {
                warn!(
                    "failed to build {} derived data for {}: {}",
                    self.settings.format_name, self.texture.name, err
                );
                self.state = WorkerState::Failed;
                return;
            }
        };
        if compressed.is_empty() {
            warn!(
                "failed to build {} derived data for {}: compressor produced no mips",
                self.settings.format_name, self.texture.name
            );
            self.state = WorkerState::Failed;
            return;
        }

        for (mip_index, mip) in compressed.into_iter().enumerate() {
            if mip_index == 0 {
                self.derived_data.size_x = mip.size_x;
                self.derived_data.size_y = mip.size_y;
                self.derived_data.pixel_format = mip.pixel_format;
            } else {
                debug_assert_eq!(
                    mip.pixel_format, self.derived_data.pixel_format,
                    "every mip must share mip 0's pixel format"
                );
            }
            self.derived_data
                .mips
                .push(MipRecord::inline(mip.size_x, mip.size_y, mip.data));
        }
        self.derived_data.num_slices = if self.settings.cubemap { 6 } else { 1 };

        self.publish().await;

        self.succeeded = if self.flags.inline_mips {
            // The out-of-window mips just became references; pull them back
            // if the caller wants everything resident.
            self.derived_data.try_inline_mip_data(&self.ddc).await
        } else {
            true
        };
        self.state = if self.succeeded {
            WorkerState::Done
        } else {
            WorkerState::Failed
        };
    }

    /// Write every mip and the artifact container to the cache, converting
    /// mips outside the inline window into references.
    async fn publish(&mut self) {
        self.state = WorkerState::Publishing;

        let mip_count = self.derived_data.mips.len();
        // Layered content is never streamed, so the whole chain stays
        // inline.
        let first_inline = if self.derived_data.is_layered() {
            0
        } else {
            mip_count.saturating_sub(self.inline_mip_count)
        };

        for mip_index in 0..mip_count {
            let (size_x, size_y) = {
                let mip = &self.derived_data.mips[mip_index];
                (mip.size_x, mip.size_y)
            };
            let mip_key = derived_mip_key(&self.key_suffix, mip_index, size_x, size_y);

            if let Some(data) = self.derived_data.mips[mip_index].data().cloned() {
                self.ddc.put(&mip_key, encode_mip_payload(&data)).await;
            }
            if mip_index < first_inline {
                self.derived_data.mips[mip_index].payload = MipPayload::Cached(mip_key);
            }
        }

        let container = serialize_platform_data(&self.derived_data);
        debug!(
            "storing texture derived data under {}: {} bytes, {} mips ({} inline)",
            self.derived_data.derived_data_key,
            container.len(),
            mip_count,
            mip_count - first_inline
        );
        self.ddc
            .put(&self.derived_data.derived_data_key, container)
            .await;
    }

    /// Run the attempt. Safe to call from any task.
    ///
    /// Unless a rebuild is forced, the parent key is tried first; a hit is
    /// verified according to the caller's residency policy and any
    /// verification failure falls through to a rebuild (when source was
    /// gathered; otherwise `finalize` picks it up).
    pub(crate) async fn do_work(&mut self) {
        if !self.flags.force_rebuild {
            if let Some(raw) = self.ddc.get(&self.derived_data.derived_data_key).await {
                match deserialize_platform_data(&raw) {
                    Ok(mut cached) => {
                        cached.derived_data_key = self.derived_data.derived_data_key.clone();
                        self.derived_data = cached;

                        self.succeeded = if self.flags.for_ddc_build {
                            self.derived_data.try_load_mips(0, None, &self.ddc).await
                        } else if self.flags.inline_mips {
                            self.derived_data.try_inline_mip_data(&self.ddc).await
                        } else {
                            self.derived_data.are_derived_mips_available(&self.ddc).await
                        };

                        if self.succeeded {
                            self.state = WorkerState::Done;
                            self.work_done = true;
                            return;
                        }
                        warn!(
                            "cached derived data for {} failed verification; rebuilding",
                            self.texture.name
                        );
                    }
                    Err(err) => {
                        warn!(
                            "corrupt derived data under {}: {}; rebuilding",
                            self.derived_data.derived_data_key, err
                        );
                    }
                }
            }
        }

        if !self.source_mips.is_empty() {
            self.build_texture().await;
        }
        self.work_done = true;
    }

    /// Release the artifact to the caller.
    ///
    /// Runs the work inline if it never ran, and performs the synchronous
    /// gather-and-build when the attempt has not succeeded and no source was
    /// gathered yet. Consuming the worker makes repeated finalization a
    /// non-issue.
    pub(crate) async fn finalize(mut self) -> (PlatformData, bool) {
        if !self.work_done {
            self.do_work().await;
        }
        if !self.succeeded && self.source_mips.is_empty() && !self.gather_attempted {
            self.gather_source();
            self.build_texture().await;
        }
        (self.derived_data, self.succeeded)
    }
}

// =============================================================================
// Tests
// =============================================================================
