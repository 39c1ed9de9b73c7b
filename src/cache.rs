//! Orchestration of derived-data caching.
//!
//! [`TextureDdc`] is the entry point for asset-processing callers. Given a
//! frozen source snapshot and build settings it derives the cache key,
//! decides between a background and an inline build, and retires build
//! tasks so that a given artifact never has two builds in flight.
//!
//! # Lifecycle
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          TextureDdc                            │
//! │   cache()                                                      │
//! │     1. finish_cache()       retire any outstanding task        │
//! │     2. KeyBuilder           derive + store the cache key       │
//! │     3a. async flags         spawn BuildWorker::do_work()       │
//! │     3b. otherwise           do_work() + finalize() inline      │
//! │   finish_cache()                                               │
//! │     await task → finalize() → install PlatformData             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While a task is outstanding the artifact's data is owned by the worker;
//! [`TextureArtifact::data`] returns `None` until [`TextureDdc::finish_cache`]
//! installs the result. Dropping an artifact with a task in flight simply
//! abandons the result; the build still runs to completion against its
//! frozen snapshot (there is no cancellation).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::build::{BuildWorker, Compressor};
use crate::format::{FormatRegistry, TextureFormat};
use crate::key::{derived_data_key_from_suffix, derived_data_key_suffix};
use crate::platform::PlatformData;
use crate::settings::{BuildSettings, CacheFlags};
use crate::source::SourceTexture;
use crate::store::DerivedDataCache;

// =============================================================================
// Configuration
// =============================================================================

/// Number of tail mips embedded inline by default.
///
/// Inline mips are resident the moment the artifact loads; everything above
/// the window streams from the cache on demand.
pub const DEFAULT_INLINE_MIP_COUNT: usize = 7;

/// Tunables for the caching pipeline.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Size of the inline window (the last N mips). Part of the cache key:
    /// changing it re-derives every artifact.
    pub inline_mip_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            inline_mip_count: DEFAULT_INLINE_MIP_COUNT,
        }
    }
}

// =============================================================================
// Build Tasks
// =============================================================================

/// Owned handle to a background build.
///
/// The spawned worker owns the artifact until the task is retired through
/// [`TextureDdc::finish_cache`]; the flag only answers "is the work done"
/// for callers that must not block.
pub struct BuildTask {
    handle: JoinHandle<BuildWorker>,
    work_done: Arc<AtomicBool>,
    derived_data_key: String,
}

impl BuildTask {
    /// Non-blocking completion check.
    pub fn is_work_done(&self) -> bool {
        self.work_done.load(Ordering::SeqCst)
    }

    /// The key the in-flight artifact is derived under.
    pub fn derived_data_key(&self) -> &str {
        &self.derived_data_key
    }
}

/// A texture's derived artifact slot plus its in-flight build, if any.
///
/// At most one of the two is "live": an outstanding task owns the platform
/// data, so `data()` is `None` until the task is retired.
pub struct TextureArtifact {
    data: Option<PlatformData>,
    task: Option<BuildTask>,
}

impl Default for TextureArtifact {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureArtifact {
    /// An empty artifact with no build history.
    pub fn new() -> Self {
        Self {
            data: Some(PlatformData::new()),
            task: None,
        }
    }

    /// The built platform data, unless a task currently owns it.
    pub fn data(&self) -> Option<&PlatformData> {
        self.data.as_ref()
    }

    /// Mutable access to the built platform data.
    pub fn data_mut(&mut self) -> Option<&mut PlatformData> {
        self.data.as_mut()
    }

    /// Take ownership of the built platform data, leaving the slot empty.
    pub fn take_data(&mut self) -> Option<PlatformData> {
        self.data.take()
    }

    /// Whether a background build is outstanding.
    pub fn has_pending_task(&self) -> bool {
        self.task.is_some()
    }

    /// Whether the outstanding build (if any) has finished its work. The
    /// task still needs [`TextureDdc::finish_cache`] to be retired.
    pub fn is_async_complete(&self) -> bool {
        self.task.as_ref().map_or(true, BuildTask::is_work_done)
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// The derived-data caching service for textures.
///
/// Owns the store handle, the injected compressor, the format registry, and
/// the cache configuration. Cheap to share by reference; all state lives in
/// the artifacts it operates on.
pub struct TextureDdc {
    /// Process-wide derived-data store.
    ddc: Arc<dyn DerivedDataCache>,

    /// The injected codec.
    compressor: Arc<dyn Compressor>,

    /// Format modules contributing versions and key substrings.
    formats: FormatRegistry,

    /// Pipeline tunables.
    config: CacheConfig,
}

impl TextureDdc {
    /// Create a service with the default configuration and an empty format
    /// registry.
    pub fn new(ddc: Arc<dyn DerivedDataCache>, compressor: Arc<dyn Compressor>) -> Self {
        Self::with_config(ddc, compressor, CacheConfig::default())
    }

    /// Create a service with explicit configuration.
    pub fn with_config(
        ddc: Arc<dyn DerivedDataCache>,
        compressor: Arc<dyn Compressor>,
        config: CacheConfig,
    ) -> Self {
        Self {
            ddc,
            compressor,
            formats: FormatRegistry::new(),
            config,
        }
    }

    /// Register a format module under a format name.
    pub fn register_format(&mut self, name: impl Into<String>, format: Arc<dyn TextureFormat>) {
        self.formats.register(name, format);
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn DerivedDataCache> {
        &self.ddc
    }

    /// The key a given source/settings pair derives to.
    ///
    /// Callers use this to cull redundant builds up front: two settings that
    /// derive the same key share one artifact.
    pub fn derived_data_key(&self, texture: &SourceTexture, settings: &BuildSettings) -> String {
        let suffix = derived_data_key_suffix(
            texture,
            settings,
            self.config.inline_mip_count,
            &self.formats,
        );
        derived_data_key_from_suffix(&suffix)
    }

    /// Populate an artifact from the cache, rebuilding from source on a
    /// miss.
    ///
    /// Any outstanding task for this artifact is retired first; there are
    /// never two live builds for one artifact. With `flags.async_build` set
    /// (and no forced rebuild) the work is spawned onto the background pool
    /// and the artifact's data is unavailable until [`Self::finish_cache`];
    /// otherwise the build runs inline and the data is ready on return.
    pub async fn cache(
        &self,
        artifact: &mut TextureArtifact,
        texture: &Arc<SourceTexture>,
        settings: &BuildSettings,
        flags: CacheFlags,
    ) {
        self.finish_cache(artifact).await;

        let suffix = derived_data_key_suffix(
            texture,
            settings,
            self.config.inline_mip_count,
            &self.formats,
        );
        let key = derived_data_key_from_suffix(&suffix);

        let mut data = artifact.take_data().unwrap_or_default();
        data.derived_data_key = key.clone();

        let worker = BuildWorker::new(
            Arc::clone(&self.compressor),
            Arc::clone(&self.ddc),
            data,
            Arc::clone(texture),
            settings.clone(),
            flags,
            self.config.inline_mip_count,
            suffix,
        );

        if flags.async_build && !flags.force_rebuild {
            let work_done = Arc::new(AtomicBool::new(false));
            let completion = Arc::clone(&work_done);
            let handle = tokio::spawn(async move {
                let mut worker = worker;
                worker.do_work().await;
                completion.store(true, Ordering::SeqCst);
                worker
            });
            artifact.task = Some(BuildTask {
                handle,
                work_done,
                derived_data_key: key,
            });
        } else {
            let mut worker = worker;
            worker.do_work().await;
            let (data, _succeeded) = worker.finalize().await;
            artifact.data = Some(data);
        }
    }

    /// Retire the artifact's outstanding build, if any.
    ///
    /// Blocks until the background work completes, finalizes it on this
    /// side, and installs the resulting platform data. Safe to call
    /// repeatedly; without a task it is a no-op.
    pub async fn finish_cache(&self, artifact: &mut TextureArtifact) {
        let Some(task) = artifact.task.take() else {
            return;
        };
        match task.handle.await {
            Ok(worker) => {
                let (data, _succeeded) = worker.finalize().await;
                artifact.data = Some(data);
            }
            Err(err) => {
                // A worker only fails to come back if it panicked; treat the
                // attempt as failed and leave an empty artifact for the
                // caller's retry path.
                error!(
                    "background build for {} died: {}",
                    task.derived_data_key, err
                );
                let mut data = PlatformData::new();
                data.derived_data_key = task.derived_data_key;
                artifact.data = Some(data);
            }
        }
    }

    /// Hint the store that this artifact and its mips are cheap to
    /// regenerate and may be evicted early.
    pub async fn mark_transient(&self, artifact: &TextureArtifact) {
        let Some(data) = artifact.data() else {
            return;
        };
        for mip in &data.mips {
            if let Some(key) = mip.payload.derived_key() {
                self.ddc.mark_transient(key).await;
            }
        }
        if !data.derived_data_key.is_empty() {
            self.ddc.mark_transient(&data.derived_data_key).await;
        }
    }

    /// Load mips into caller buffers, forcing one rebuild if the cached
    /// artifact can no longer satisfy the request.
    ///
    /// This is the recovery path for stale or evicted entries: a failed
    /// [`PlatformData::try_load_mips`] triggers a forced rebuild from
    /// source, after which the load is retried exactly once.
    pub async fn load_mips_or_rebuild(
        &self,
        artifact: &mut TextureArtifact,
        texture: &Arc<SourceTexture>,
        settings: &BuildSettings,
        first_mip: usize,
        out: &mut [Option<Bytes>],
    ) -> bool {
        self.finish_cache(artifact).await;

        if let Some(data) = artifact.data() {
            if data.try_load_mips(first_mip, Some(out), &self.ddc).await {
                return true;
            }
        }

        warn!("mip load failed for {}; rebuilding", texture.name);
        let flags = CacheFlags {
            force_rebuild: true,
            ..CacheFlags::default()
        };
        self.cache(artifact, texture, settings, flags).await;

        match artifact.data() {
            Some(data) => {
                let loaded = data.try_load_mips(first_mip, Some(out), &self.ddc).await;
                if !loaded {
                    error!("failed to build texture {}", texture.name);
                }
                loaded
            }
            None => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
