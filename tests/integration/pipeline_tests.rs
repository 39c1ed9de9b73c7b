//! End-to-end pipeline tests: key derivation, build-on-miss, cache hits,
//! forced rebuilds, and failure handling through the orchestrator.

use std::sync::Arc;

use bytes::Bytes;

use mipforge::{
    deserialize_cooked, serialize_cooked, BuildSettings, CacheFlags, DerivedDataCache, MemoryDdc,
    PixelFormat, TextureArtifact, TextureDdc, DERIVED_DATA_NAMESPACE, DERIVED_DATA_VERSION,
};

use super::test_utils::{
    dxt1_settings, expected_fill, make_texture, make_unloaded_texture, FailingCompressor,
    FakeCompressor,
};

// =============================================================================
// Build / Hit / Rebuild
// =============================================================================

#[tokio::test]
async fn build_on_miss_then_hit() {
    let compressor = Arc::new(FakeCompressor::new());
    let store = Arc::new(MemoryDdc::new());
    let ddc = TextureDdc::new(store.clone(), compressor.clone());

    let texture = make_texture("Game/Textures/Rock", 64, 64);
    let settings = dxt1_settings();

    // First request builds from source.
    let mut first = TextureArtifact::new();
    ddc.cache(&mut first, &texture, &settings, CacheFlags::default())
        .await;
    assert_eq!(compressor.build_count(), 1);

    let data = first.data().expect("artifact populated");
    assert_eq!(data.pixel_format, PixelFormat::Dxt1);
    assert_eq!(data.size_x, 64);
    assert_eq!(data.mip_count(), 7); // 64, 32, 16, 8, 4, 2, 1
    assert!(store.probably_exists(&data.derived_data_key).await);

    // A fresh artifact for the same inputs is a pure cache hit.
    let mut second = TextureArtifact::new();
    ddc.cache(&mut second, &texture, &settings, CacheFlags::default())
        .await;
    assert_eq!(compressor.build_count(), 1);
    assert_eq!(second.data().unwrap().mip_count(), 7);
    assert_eq!(
        second.data().unwrap().derived_data_key,
        first.data().unwrap().derived_data_key
    );
}

#[tokio::test]
async fn forced_rebuild_bypasses_an_existing_hit() {
    let compressor = Arc::new(FakeCompressor::new());
    let store = Arc::new(MemoryDdc::new());
    let ddc = TextureDdc::new(store.clone(), compressor.clone());

    let texture = make_texture("Game/Textures/Rock", 32, 32);
    let settings = dxt1_settings();

    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &settings, CacheFlags::default())
        .await;
    assert_eq!(compressor.build_count(), 1);

    // The entry is cached, yet force_rebuild must run the compressor again.
    let key = artifact.data().unwrap().derived_data_key.clone();
    assert!(store.probably_exists(&key).await);

    let flags = CacheFlags {
        force_rebuild: true,
        ..CacheFlags::default()
    };
    ddc.cache(&mut artifact, &texture, &settings, flags).await;
    assert_eq!(compressor.build_count(), 2);
    assert_eq!(artifact.data().unwrap().derived_data_key, key);
}

#[tokio::test]
async fn different_settings_derive_different_artifacts() {
    let compressor = Arc::new(FakeCompressor::new());
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), compressor.clone());

    let texture = make_texture("Game/Textures/Rock", 16, 16);
    let srgb = dxt1_settings();
    let linear = BuildSettings {
        srgb: false,
        ..dxt1_settings()
    };

    assert_ne!(
        ddc.derived_data_key(&texture, &srgb),
        ddc.derived_data_key(&texture, &linear)
    );

    let mut a = TextureArtifact::new();
    ddc.cache(&mut a, &texture, &srgb, CacheFlags::default()).await;
    let mut b = TextureArtifact::new();
    ddc.cache(&mut b, &texture, &linear, CacheFlags::default())
        .await;

    // Both built; neither hit the other's entry.
    assert_eq!(compressor.build_count(), 2);
}

// =============================================================================
// Concrete Scenario A: key shape and store round-trip
// =============================================================================

#[tokio::test]
async fn dxt1_key_shape_and_store_round_trip() {
    let compressor = Arc::new(FakeCompressor::new());
    let store = Arc::new(MemoryDdc::new());
    let ddc = TextureDdc::new(store.clone(), compressor);

    let mut texture = (*make_texture("Game/Textures/Scenario", 16, 16)).clone();
    texture.id = mipforge::ContentId::from_id("abc123");
    let texture = Arc::new(texture);

    let key = ddc.derived_data_key(&texture, &dxt1_settings());
    let prefix = format!(
        "{}_{}_DXT1_abc123",
        DERIVED_DATA_NAMESPACE, DERIVED_DATA_VERSION
    );
    assert!(key.starts_with(&prefix), "unexpected key shape: {}", key);

    let payload = Bytes::from_static(&[0x10, 0x20, 0x30, 0x40]);
    store.put(&key, payload.clone()).await;
    assert_eq!(store.get(&key).await, Some(payload));
}

// =============================================================================
// Concrete Scenario B: no source data
// =============================================================================

#[tokio::test]
async fn missing_source_fails_without_panicking() {
    let compressor = Arc::new(FakeCompressor::new());
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), compressor.clone());

    let texture = make_unloaded_texture("Game/Textures/Unloaded");
    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &dxt1_settings(), CacheFlags::default())
        .await;

    let data = artifact.data().expect("artifact returned");
    assert_eq!(data.pixel_format, PixelFormat::Unknown);
    assert!(data.mips.is_empty());
    // The compressor never ran.
    assert_eq!(compressor.build_count(), 0);
}

#[tokio::test]
async fn retry_succeeds_once_source_is_resident() {
    let compressor = Arc::new(FakeCompressor::new());
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), compressor.clone());

    let mut artifact = TextureArtifact::new();
    ddc.cache(
        &mut artifact,
        &make_unloaded_texture("Game/Textures/Late"),
        &dxt1_settings(),
        CacheFlags::default(),
    )
    .await;
    assert_eq!(artifact.data().unwrap().pixel_format, PixelFormat::Unknown);

    // Source data arrives; the caller retries with the same artifact.
    let loaded = make_texture("Game/Textures/Late", 8, 8);
    ddc.cache(&mut artifact, &loaded, &dxt1_settings(), CacheFlags::default())
        .await;
    assert_eq!(artifact.data().unwrap().pixel_format, PixelFormat::Dxt1);
    assert_eq!(compressor.build_count(), 1);
}

// =============================================================================
// Compressor Failure
// =============================================================================

#[tokio::test]
async fn compressor_failure_leaves_empty_artifact() {
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), Arc::new(FailingCompressor));

    let texture = make_texture("Game/Textures/Cursed", 16, 16);
    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &dxt1_settings(), CacheFlags::default())
        .await;

    let data = artifact.data().expect("artifact returned");
    assert_eq!(data.pixel_format, PixelFormat::Unknown);
    assert!(data.mips.is_empty());
}

#[tokio::test]
async fn unsupported_format_fails_cleanly() {
    let compressor = Arc::new(FakeCompressor::new());
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), compressor);

    let texture = make_texture("Game/Textures/Exotic", 16, 16);
    let settings = BuildSettings {
        format_name: "PVRTC4".to_string(),
        ..BuildSettings::default()
    };

    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &settings, CacheFlags::default())
        .await;
    assert_eq!(artifact.data().unwrap().pixel_format, PixelFormat::Unknown);
}

// =============================================================================
// Built Payloads
// =============================================================================

#[tokio::test]
async fn built_mips_carry_deterministic_payloads() {
    let compressor = Arc::new(FakeCompressor::new());
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), compressor);

    let texture = make_texture("Game/Textures/Fill", 8, 8);
    let settings = dxt1_settings();
    let flags = CacheFlags {
        inline_mips: true,
        ..CacheFlags::default()
    };

    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &settings, flags).await;

    let data = artifact.data().unwrap();
    for mip in &data.mips {
        let payload = mip.data().expect("inline after inline_mips");
        let fill = expected_fill(mip.size_x, mip.size_y, &settings);
        assert!(payload.iter().all(|&b| b == fill));
    }
}

// =============================================================================
// Cooked Serialization
// =============================================================================

#[tokio::test]
async fn cooked_round_trip_of_a_built_artifact() {
    let compressor = Arc::new(FakeCompressor::new());
    let ddc = TextureDdc::new(Arc::new(MemoryDdc::new()), compressor);

    let texture = make_texture("Game/Textures/Cooked", 32, 32);
    let settings = BuildSettings {
        lod_bias: 2,
        ..dxt1_settings()
    };
    let flags = CacheFlags {
        inline_mips: true,
        ..CacheFlags::default()
    };

    let mut artifact = TextureArtifact::new();
    ddc.cache(&mut artifact, &texture, &settings, flags).await;
    let data = artifact.data().unwrap();
    assert_eq!(data.mip_count(), 6); // 32 down to 1

    let cooked = serialize_cooked(data, settings.lod_bias);
    let (loaded, first_mip) = deserialize_cooked(&cooked).expect("cooked data decodes");

    assert_eq!(first_mip, 2);
    assert_eq!(loaded.mip_count(), 4);
    // The cook re-bases dimensions on the surviving top mip.
    assert_eq!(loaded.size_x, 8);
    assert_eq!(loaded.size_y, 8);
    assert_eq!(loaded.pixel_format, PixelFormat::Dxt1);
    assert_eq!(loaded.mips[0], data.mips[2]);
}
