//! Streaming mips from the derived-data cache.
//!
//! An artifact coming off a cache hit usually holds references for the mips
//! outside the inline window. The operations here resolve those references
//! on demand:
//!
//! - [`PlatformData::try_inline_mip_data`] pulls every reference into owned
//!   bytes, atomically;
//! - [`PlatformData::try_load_mips`] copies an arbitrary tail of the chain
//!   into caller buffers, with full cleanup on shortfall;
//! - [`PlatformData::are_derived_mips_available`] probes availability
//!   without transferring a single payload byte.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::store::{DdcHandle, DerivedDataCache};

use super::data::{MipPayload, PlatformData};
use super::serialize::decode_mip_payload;

/// Issue asynchronous gets for every referenced mip at or after
/// `first_mip`. Returns `(mip_index, handle)` pairs.
fn begin_load_derived_mips(
    data: &PlatformData,
    first_mip: usize,
    ddc: &Arc<dyn DerivedDataCache>,
) -> Vec<(usize, DdcHandle)> {
    data.mips
        .iter()
        .enumerate()
        .skip(first_mip)
        .filter_map(|(mip_index, mip)| {
            mip.payload
                .derived_key()
                .map(|key| (mip_index, DdcHandle::spawn(ddc, key)))
        })
        .collect()
}

/// Warn when a fetched payload does not match the size implied by the mip's
/// dimensions and pixel format. Stale entries from an older layout surface
/// this way.
fn check_mip_size(data: &PlatformData, mip_index: usize, actual: usize) {
    if let Some(expected) = data.expected_mip_size(mip_index) {
        if expected != actual {
            let mip = &data.mips[mip_index];
            warn!(
                "{}x{} {} mip has invalid data in the cache: got {} bytes, expected {} (key {})",
                mip.size_x,
                mip.size_y,
                data.pixel_format.name(),
                actual,
                expected,
                mip.payload.derived_key().unwrap_or_default(),
            );
        }
    }
}

impl PlatformData {
    /// Resolve every mip reference into owned bytes.
    ///
    /// All fetches are issued up front and every result is collected before
    /// the first mutation, so a single miss leaves the artifact completely
    /// unchanged and returns `false`. On success every mip is resident and
    /// no references remain.
    pub async fn try_inline_mip_data(&mut self, ddc: &Arc<dyn DerivedDataCache>) -> bool {
        let fetches = begin_load_derived_mips(self, 0, ddc);
        if fetches.is_empty() {
            return true;
        }

        let mut resolved = Vec::with_capacity(fetches.len());
        for (mip_index, handle) in fetches {
            let raw = match handle.wait().await {
                Some(raw) => raw,
                None => {
                    debug!(
                        "mip {} of {} missing from cache; inline aborted",
                        mip_index, self.derived_data_key
                    );
                    return false;
                }
            };
            match decode_mip_payload(&raw) {
                Ok(bytes) => resolved.push((mip_index, bytes)),
                Err(err) => {
                    warn!(
                        "corrupt mip payload for mip {} of {}: {}",
                        mip_index, self.derived_data_key, err
                    );
                    return false;
                }
            }
        }

        for (mip_index, bytes) in resolved {
            self.mips[mip_index].payload = MipPayload::Inline(bytes);
        }
        true
    }

    /// Load mips `first_mip..` into caller-supplied slots.
    ///
    /// Resident mips are copied directly; referenced mips are fetched with
    /// batched asynchronous gets. `out`, when supplied, must have one slot
    /// per requested mip (slot `i` receives mip `first_mip + i`); passing
    /// `None` verifies that every payload is fetchable without copying.
    ///
    /// If any requested mip cannot be produced, every slot filled by this
    /// call is cleared before returning `false`; resident data and slots
    /// outside the requested range are left untouched.
    pub async fn try_load_mips(
        &self,
        first_mip: usize,
        mut out: Option<&mut [Option<Bytes>]>,
        ddc: &Arc<dyn DerivedDataCache>,
    ) -> bool {
        let wanted = self.mips.len().saturating_sub(first_mip);
        if let Some(slots) = out.as_deref() {
            debug_assert!(
                slots.len() >= wanted,
                "need {} output slots, have {}",
                wanted,
                slots.len()
            );
        }

        let fetches = begin_load_derived_mips(self, first_mip, ddc);

        let mut loaded = 0usize;
        let mut filled = Vec::new();

        // Resident mips first.
        for (mip_index, mip) in self.mips.iter().enumerate().skip(first_mip) {
            if let Some(data) = mip.data() {
                if let Some(slots) = out.as_deref_mut() {
                    slots[mip_index - first_mip] = Some(data.clone());
                    filled.push(mip_index - first_mip);
                }
                loaded += 1;
            }
        }

        // Then the fetched references.
        for (mip_index, handle) in fetches {
            let Some(raw) = handle.wait().await else {
                continue;
            };
            let bytes = match decode_mip_payload(&raw) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(
                        "corrupt mip payload for mip {} of {}: {}",
                        mip_index, self.derived_data_key, err
                    );
                    continue;
                }
            };
            check_mip_size(self, mip_index, bytes.len());
            if let Some(slots) = out.as_deref_mut() {
                slots[mip_index - first_mip] = Some(bytes);
                filled.push(mip_index - first_mip);
            }
            loaded += 1;
        }

        if loaded != wanted {
            // Release everything this call produced before reporting
            // failure.
            if let Some(slots) = out.as_deref_mut() {
                for slot_index in filled {
                    slots[slot_index] = None;
                }
            }
            debug!(
                "loaded {} of {} mips starting at {} for {}",
                loaded, wanted, first_mip, self.derived_data_key
            );
            return false;
        }

        true
    }

    /// Probe whether every referenced mip is (probably) present in the
    /// cache, without transferring any payload bytes.
    pub async fn are_derived_mips_available(&self, ddc: &Arc<dyn DerivedDataCache>) -> bool {
        for mip in &self.mips {
            if let Some(key) = mip.payload.derived_key() {
                if !ddc.probably_exists(key).await {
                    return false;
                }
            }
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
