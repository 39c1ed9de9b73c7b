//! Building derived data from source.
//!
//! [`Compressor`] is the pluggable codec seam; [`BuildWorker`] drives one
//! build attempt through gather → build → publish against the cache.

mod compressor;
mod worker;

pub use compressor::{CompressedMip, Compressor};
pub use worker::{BuildWorker, WorkerState};
