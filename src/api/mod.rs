//! HTTP boundary with the remote inference/training service.

pub mod client;
pub mod types;

pub use client::{ApiClient, ByteStream};
pub use types::{
    PreprocessRequest, ProfileInfo, SynthesisRequest, TrainRequest, UploadResponse,
};
