//! Stage state machine for the cloning workflow.
//!
//! The four stages — profile, preprocess, train, generate — are strictly
//! ordered: each becomes reachable only once the previous one has produced
//! its artifact. State is explicit and passed through the controller, so the
//! gating logic is testable without a network or a terminal.

use crate::api::client::ApiClient;
use crate::api::types::{PreprocessRequest, ProfileInfo, SynthesisRequest, TrainRequest};
use crate::audio::mixer::Mixer;
use crate::audio::scheduler::SchedulerConfig;
use crate::error::{CloneCtlError, Result};
use crate::sink::LogSink;
use crate::stream::session::{CancelHandle, SessionMetrics, StreamSession, forward_progress};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One step of the cloning workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Profile,
    Preprocess,
    Train,
    Generate,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Profile => "profile",
            Stage::Preprocess => "preprocess",
            Stage::Train => "train",
            Stage::Generate => "generate",
        }
    }
}

/// Explicit workflow state: which artifacts exist for the selected profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    pub profile: Option<String>,
    pub uploaded_file: Option<String>,
    pub preprocessed: bool,
    pub trained: bool,
}

impl WorkflowState {
    /// The stage the workflow is currently at.
    pub fn stage(&self) -> Stage {
        if self.trained {
            Stage::Generate
        } else if self.preprocessed {
            Stage::Train
        } else if self.uploaded_file.is_some() {
            Stage::Preprocess
        } else {
            Stage::Profile
        }
    }

    /// Check that a stage's prerequisites are met.
    pub fn ensure(&self, stage: Stage) -> Result<()> {
        let (ready, hint) = match stage {
            Stage::Profile => (true, ""),
            Stage::Preprocess => (
                self.uploaded_file.is_some(),
                "upload a recording for the profile first",
            ),
            Stage::Train => (self.preprocessed, "preprocess the uploaded audio first"),
            Stage::Generate => (self.trained, "train the profile first"),
        };
        if ready {
            Ok(())
        } else {
            Err(CloneCtlError::StageNotReady {
                stage: stage.label().to_string(),
                message: hint.to_string(),
            })
        }
    }

    /// Seed state from the server's profile inventory, so the workflow can
    /// resume where a previous run (or another client) left off.
    pub fn from_profile(info: &ProfileInfo) -> Self {
        Self {
            profile: Some(info.name.clone()),
            uploaded_file: if info.has_data {
                Some(String::new())
            } else {
                None
            },
            preprocessed: info.processed_wavs > 0,
            trained: info.best_checkpoint.is_some() || info.latest_checkpoint.is_some(),
        }
    }
}

/// Drives the staged workflow against the service.
///
/// Methods take `&mut self` and run each operation to completion, so at most
/// one streaming session can be active per controller.
pub struct WorkflowController {
    state: WorkflowState,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::default(),
        }
    }

    pub fn with_state(state: WorkflowState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Stage 1: upload a recording, establishing the profile.
    pub async fn upload(
        &mut self,
        client: &ApiClient,
        profile: &str,
        file: &Path,
        sink: &mut dyn LogSink,
    ) -> Result<()> {
        if profile.trim().is_empty() {
            return Err(CloneCtlError::InvalidRequest {
                message: "profile name must not be empty".to_string(),
            });
        }
        let response = client.upload(profile, file).await?;
        sink.log(&format!(
            "Uploaded {} to {}",
            response.filename, response.saved_path
        ));
        self.state.profile = Some(profile.to_string());
        self.state.uploaded_file = Some(response.filename);
        Ok(())
    }

    /// Stage 2: segment and normalize the uploaded audio.
    pub async fn preprocess(&mut self, client: &ApiClient, sink: &mut dyn LogSink) -> Result<()> {
        self.state.ensure(Stage::Preprocess)?;
        let request = PreprocessRequest {
            profile: self.profile_name()?,
            filename: self.state.uploaded_file.clone().unwrap_or_default(),
        };
        let stream = client.preprocess(&request).await?;
        forward_progress(stream, sink).await?;
        self.state.preprocessed = true;
        Ok(())
    }

    /// Stage 3: train the voice model on the processed audio.
    pub async fn train(
        &mut self,
        client: &ApiClient,
        request: TrainRequest,
        sink: &mut dyn LogSink,
    ) -> Result<()> {
        self.state.ensure(Stage::Train)?;
        let stream = client.train(&request).await?;
        forward_progress(stream, sink).await?;
        self.state.trained = true;
        Ok(())
    }

    /// Stage 4: synthesize speech with the trained voice, streaming chunks
    /// into the mixer as they arrive.
    pub async fn generate(
        &mut self,
        client: &ApiClient,
        text: &str,
        mixer: &Arc<Mutex<Mixer>>,
        scheduler: SchedulerConfig,
        cancel: CancelHandle,
        sink: &mut dyn LogSink,
    ) -> Result<SessionMetrics> {
        self.state.ensure(Stage::Generate)?;
        let request = SynthesisRequest::new(&self.profile_name()?, text);
        let byte_stream = client.stream(&request).await?;

        let mut session = StreamSession::with_cancel(scheduler, cancel);
        session.run(byte_stream, mixer, sink).await?;
        Ok(session.metrics().clone())
    }

    fn profile_name(&self) -> Result<String> {
        self.state
            .profile
            .clone()
            .ok_or_else(|| CloneCtlError::StageNotReady {
                stage: Stage::Profile.label().to_string(),
                message: "no profile selected".to_string(),
            })
    }
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_at_profile_stage() {
        let state = WorkflowState::default();
        assert_eq!(state.stage(), Stage::Profile);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Profile < Stage::Preprocess);
        assert!(Stage::Preprocess < Stage::Train);
        assert!(Stage::Train < Stage::Generate);
    }

    #[test]
    fn upload_unlocks_preprocess() {
        let mut state = WorkflowState::default();
        assert!(state.ensure(Stage::Preprocess).is_err());

        state.profile = Some("alice".to_string());
        state.uploaded_file = Some("sample.wav".to_string());
        assert_eq!(state.stage(), Stage::Preprocess);
        assert!(state.ensure(Stage::Preprocess).is_ok());
        assert!(state.ensure(Stage::Train).is_err());
    }

    #[test]
    fn preprocess_unlocks_train() {
        let state = WorkflowState {
            profile: Some("alice".to_string()),
            uploaded_file: Some("sample.wav".to_string()),
            preprocessed: true,
            trained: false,
        };
        assert_eq!(state.stage(), Stage::Train);
        assert!(state.ensure(Stage::Train).is_ok());
        assert!(state.ensure(Stage::Generate).is_err());
    }

    #[test]
    fn train_unlocks_generate() {
        let state = WorkflowState {
            profile: Some("alice".to_string()),
            uploaded_file: Some("sample.wav".to_string()),
            preprocessed: true,
            trained: true,
        };
        assert_eq!(state.stage(), Stage::Generate);
        assert!(state.ensure(Stage::Generate).is_ok());
    }

    #[test]
    fn stage_not_ready_error_names_the_stage() {
        let state = WorkflowState::default();
        match state.ensure(Stage::Generate) {
            Err(CloneCtlError::StageNotReady { stage, .. }) => {
                assert_eq!(stage, "generate");
            }
            other => panic!("expected StageNotReady, got {:?}", other),
        }
    }

    #[test]
    fn state_seeds_from_untrained_server_profile() {
        let info = ProfileInfo {
            name: "bob".to_string(),
            has_data: true,
            raw_files: 2,
            processed_wavs: 0,
            has_profile: false,
            best_checkpoint: None,
            latest_checkpoint: None,
        };
        let state = WorkflowState::from_profile(&info);
        assert_eq!(state.profile.as_deref(), Some("bob"));
        assert_eq!(state.stage(), Stage::Preprocess);
    }

    #[test]
    fn state_seeds_from_trained_server_profile() {
        let info = ProfileInfo {
            name: "carol".to_string(),
            has_data: true,
            raw_files: 2,
            processed_wavs: 40,
            has_profile: true,
            best_checkpoint: Some("epoch_080.pt".to_string()),
            latest_checkpoint: Some("epoch_100.pt".to_string()),
        };
        let state = WorkflowState::from_profile(&info);
        assert_eq!(state.stage(), Stage::Generate);
        assert!(state.ensure(Stage::Generate).is_ok());
    }

    #[tokio::test]
    async fn controller_gates_preprocess_without_upload() {
        let mut controller = WorkflowController::new();
        let client = ApiClient::new("http://192.0.2.1:1");
        let mut sink = crate::sink::NullSink;

        // Gating rejects before any network activity (the address is
        // unroutable, so reaching the network would error differently).
        match controller.preprocess(&client, &mut sink).await {
            Err(CloneCtlError::StageNotReady { stage, .. }) => assert_eq!(stage, "preprocess"),
            other => panic!("expected StageNotReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn controller_gates_generate_without_training() {
        let mut controller = WorkflowController::with_state(WorkflowState {
            profile: Some("alice".to_string()),
            uploaded_file: Some("sample.wav".to_string()),
            preprocessed: true,
            trained: false,
        });
        let client = ApiClient::new("http://192.0.2.1:1");
        let mut sink = crate::sink::NullSink;
        let mixer = Arc::new(Mutex::new(Mixer::new(16000)));

        let result = controller
            .generate(
                &client,
                "hello",
                &mixer,
                SchedulerConfig::default(),
                CancelHandle::new(),
                &mut sink,
            )
            .await;
        assert!(matches!(
            result,
            Err(CloneCtlError::StageNotReady { .. })
        ));
    }
}
