//! Streaming tests: atomic inlining, partial loads, availability probes,
//! and recovery from evicted entries, all against a live store.

use std::sync::Arc;

use bytes::Bytes;

use mipforge::{
    CacheConfig, CacheFlags, DerivedDataCache, TextureArtifact, TextureDdc,
};

use super::test_utils::{dxt1_settings, make_texture, FakeCompressor, TrackingDdc};

/// Build a 5-mip artifact (16x16 DXT1) with a 2-mip inline window, so mips
/// 0-2 are cache references and mips 3-4 are inline.
async fn built_artifact(
    store: Arc<TrackingDdc>,
    compressor: Arc<FakeCompressor>,
) -> (TextureDdc, TextureArtifact) {
    let ddc = TextureDdc::with_config(
        store,
        compressor,
        CacheConfig {
            inline_mip_count: 2,
        },
    );
    let texture = make_texture("Game/Textures/Streamed", 16, 16);
    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &dxt1_settings(), CacheFlags::default())
        .await;
    (ddc, artifact)
}

// =============================================================================
// Atomic Inlining
// =============================================================================

#[tokio::test]
async fn inlining_resolves_every_reference() {
    let store = Arc::new(TrackingDdc::new());
    let (ddc, mut artifact) = built_artifact(store, Arc::new(FakeCompressor::new())).await;

    let data = artifact.data_mut().unwrap();
    assert_eq!(data.mips.iter().filter(|m| !m.payload.is_inline()).count(), 3);

    assert!(data.try_inline_mip_data(ddc.store()).await);
    assert!(data.mips.iter().all(|m| m.payload.is_inline()));
}

#[tokio::test]
async fn inlining_is_all_or_nothing() {
    let store = Arc::new(TrackingDdc::new());
    let (ddc, mut artifact) =
        built_artifact(store.clone(), Arc::new(FakeCompressor::new())).await;

    // Evict one referenced mip payload.
    let lost_key = artifact.data().unwrap().mips[1]
        .payload
        .derived_key()
        .unwrap()
        .to_string();
    let lost_payload = store.inner.remove(&lost_key).await.unwrap();

    let data = artifact.data_mut().unwrap();
    let before = data.clone();
    assert!(!data.try_inline_mip_data(ddc.store()).await);
    // Not a single mip changed: no partial mix of inline and referenced.
    assert_eq!(*data, before);

    // Restore the payload and the same call succeeds wholesale.
    store.inner.put(&lost_key, lost_payload).await;
    assert!(data.try_inline_mip_data(ddc.store()).await);
    assert!(data.mips.iter().all(|m| m.payload.is_inline()));
}

// =============================================================================
// Partial Loads
// =============================================================================

#[tokio::test]
async fn partial_load_touches_only_requested_mips() {
    let store = Arc::new(TrackingDdc::new());
    let (ddc, artifact) = built_artifact(store.clone(), Arc::new(FakeCompressor::new())).await;
    let data = artifact.data().unwrap();
    assert_eq!(data.mip_count(), 5);

    store.reset_tracking().await;

    // Load mips 2..4 of the 5-mip chain.
    let mut out = vec![None, None, None];
    assert!(data.try_load_mips(2, Some(&mut out), ddc.store()).await);
    assert!(out.iter().all(|slot| slot.is_some()));

    // Only mip 2 is a reference in that range; mips 0 and 1 were never
    // fetched.
    let mip0_key = data.mips[0].payload.derived_key().unwrap();
    let mip1_key = data.mips[1].payload.derived_key().unwrap();
    let gets = store.gets().await;
    assert!(!gets.iter().any(|k| k == mip0_key));
    assert!(!gets.iter().any(|k| k == mip1_key));
    assert_eq!(gets.len(), 1);
}

#[tokio::test]
async fn failed_partial_load_releases_all_buffers() {
    let store = Arc::new(TrackingDdc::new());
    let (ddc, artifact) = built_artifact(store.clone(), Arc::new(FakeCompressor::new())).await;
    let data = artifact.data().unwrap();

    // Evict mip 0 so a full load cannot complete.
    let lost_key = data.mips[0].payload.derived_key().unwrap().to_string();
    store.inner.remove(&lost_key).await;

    let mut out: Vec<Option<Bytes>> = vec![None; 5];
    assert!(!data.try_load_mips(0, Some(&mut out), ddc.store()).await);
    // Everything produced during the call was released.
    assert!(out.iter().all(|slot| slot.is_none()));

    // A load that skips the evicted mip still succeeds.
    let mut tail = vec![None; 4];
    assert!(data.try_load_mips(1, Some(&mut tail), ddc.store()).await);
    assert!(tail.iter().all(|slot| slot.is_some()));
}

// =============================================================================
// Availability Probes
// =============================================================================

#[tokio::test]
async fn availability_probe_transfers_no_payloads() {
    let store = Arc::new(TrackingDdc::new());
    let (ddc, artifact) = built_artifact(store.clone(), Arc::new(FakeCompressor::new())).await;
    let data = artifact.data().unwrap();

    store.reset_tracking().await;
    assert!(data.are_derived_mips_available(ddc.store()).await);

    // Three referenced mips probed, zero payload fetches.
    assert_eq!(store.probes().await.len(), 3);
    assert!(store.gets().await.is_empty());

    store
        .inner
        .remove(data.mips[2].payload.derived_key().unwrap())
        .await;
    assert!(!data.are_derived_mips_available(ddc.store()).await);
}

// =============================================================================
// Recovery
// =============================================================================

#[tokio::test]
async fn evicted_mips_trigger_one_rebuild_then_load() {
    let store = Arc::new(TrackingDdc::new());
    let compressor = Arc::new(FakeCompressor::new());
    let (ddc, mut artifact) = built_artifact(store.clone(), compressor.clone()).await;
    assert_eq!(compressor.build_count(), 1);

    // Evict every referenced mip, as a cache under pressure would.
    let keys: Vec<String> = artifact
        .data()
        .unwrap()
        .mips
        .iter()
        .filter_map(|m| m.payload.derived_key().map(str::to_string))
        .collect();
    for key in &keys {
        store.inner.remove(key).await;
    }

    let texture = make_texture("Game/Textures/Streamed", 16, 16);
    let mut out = vec![None; 5];
    assert!(
        ddc.load_mips_or_rebuild(&mut artifact, &texture, &dxt1_settings(), 0, &mut out)
            .await
    );
    assert!(out.iter().all(|slot| slot.is_some()));
    assert_eq!(compressor.build_count(), 2);

    // The rebuild restored the evicted entries.
    for key in &keys {
        assert!(store.probably_exists(key).await);
    }
}

// =============================================================================
// Inline Residency Through the Orchestrator
// =============================================================================

#[tokio::test]
async fn inline_mips_flag_produces_fully_resident_artifacts() {
    let store = Arc::new(TrackingDdc::new());
    let ddc = TextureDdc::with_config(
        store,
        Arc::new(FakeCompressor::new()),
        CacheConfig {
            inline_mip_count: 2,
        },
    );

    let texture = make_texture("Game/Textures/Resident", 16, 16);
    let flags = CacheFlags {
        inline_mips: true,
        ..CacheFlags::default()
    };
    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &dxt1_settings(), flags).await;

    let data = artifact.data().unwrap();
    assert_eq!(data.mip_count(), 5);
    assert!(data.mips.iter().all(|m| m.payload.is_inline()));

    // A second consumer without the flag gets the reference form back.
    let mut lazy = TextureArtifact::new();
    ddc.cache(&mut lazy, &texture, &dxt1_settings(), CacheFlags::default())
        .await;
    assert!(lazy
        .data()
        .unwrap()
        .mips
        .iter()
        .any(|m| !m.payload.is_inline()));
}
