//! Decoder and pose evaluator for KT dance assets: skinned models, per-bone motion
//! and camera motion.
//!
//! The crate is IO-free apart from [`DecodeCache`], which reads each file once.
//! Evaluation is renderer-agnostic; posed meshes are plain vertex buffers.

#![forbid(unsafe_code)]

mod archive;
pub mod binary;
mod cache;
pub mod codec;
mod error;
pub mod host;
mod model;
mod runtime;

pub use archive::*;
pub use binary::ModelAsset;
pub use cache::*;
pub use codec::{decode_packed_quat, encode_packed_quat};
pub use error::*;
pub use model::*;
pub use runtime::*;

#[cfg(test)]
mod test_support;
