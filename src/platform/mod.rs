//! The built artifact: platform-specific texture data.
//!
//! This module holds the artifact model ([`PlatformData`] and its per-mip
//! records), the order-significant binary layout it serializes through, and
//! the streaming operations that resolve mip references against the cache
//! on demand.

mod data;
mod serialize;
mod stream;

pub use data::{MipPayload, MipRecord, PlatformData};
pub use serialize::{
    decode_mip_payload, deserialize_cooked, deserialize_platform_data, encode_mip_payload,
    serialize_cooked, serialize_platform_data,
};
