//! Request/response types for the inference service endpoints.

use crate::defaults;
use crate::error::{CloneCtlError, Result};
use serde::{Deserialize, Serialize};

/// Response from `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub saved_path: String,
}

/// One entry of `GET /profiles`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileInfo {
    pub name: String,
    pub has_data: bool,
    pub raw_files: u32,
    pub processed_wavs: u32,
    pub has_profile: bool,
    pub best_checkpoint: Option<String>,
    pub latest_checkpoint: Option<String>,
}

impl Default for ProfileInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            has_data: false,
            raw_files: 0,
            processed_wavs: 0,
            has_profile: false,
            best_checkpoint: None,
            latest_checkpoint: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfilesResponse {
    #[serde(default)]
    pub profiles: Vec<ProfileInfo>,
}

/// Body of `POST /preprocess`.
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessRequest {
    pub profile: String,
    pub filename: String,
}

/// Body of `POST /train`.
#[derive(Debug, Clone, Serialize)]
pub struct TrainRequest {
    pub profile: String,
    pub batch_size: u32,
    pub epochs: u32,
    pub max_len: u32,
    pub auto_select_epoch: bool,
    pub auto_tune_profile: bool,
    pub auto_build_lexicon: bool,
    pub select_thorough: bool,
    pub select_use_wer: bool,
    pub early_stop: bool,
}

impl TrainRequest {
    /// Training request with server-friendly defaults for a profile.
    pub fn for_profile(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            batch_size: defaults::TRAIN_BATCH_SIZE,
            epochs: defaults::TRAIN_EPOCHS,
            max_len: defaults::TRAIN_MAX_LEN,
            auto_select_epoch: true,
            auto_tune_profile: true,
            auto_build_lexicon: true,
            select_thorough: false,
            select_use_wer: true,
            early_stop: true,
        }
    }
}

/// Body of `POST /stream`, the synthesis request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SynthesisRequest {
    pub speaker: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_wav_path: Option<String>,
}

impl SynthesisRequest {
    pub fn new(speaker: &str, text: &str) -> Self {
        Self {
            speaker: speaker.to_string(),
            text: text.to_string(),
            model_path: None,
            ref_wav_path: None,
        }
    }

    /// Reject requests with missing required fields before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.speaker.trim().is_empty() {
            return Err(CloneCtlError::InvalidRequest {
                message: "speaker must not be empty".to_string(),
            });
        }
        if self.text.trim().is_empty() {
            return Err(CloneCtlError::InvalidRequest {
                message: "text must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
