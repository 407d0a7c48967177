//! Assessment services
//!
//! - `audio_stage`: scoped temporary storage for uploads
//! - `capabilities`: per-locale feature negotiation
//! - `assessor`: assessment client trait and error types
//! - `azure_client`: Azure Speech REST implementation
//! - `result_merger`: positional join of the three passes
//! - `assessment_workflow`: pass orchestration

pub mod assessment_workflow;
pub mod assessor;
pub mod audio_stage;
pub mod azure_client;
pub mod capabilities;
pub mod result_merger;

pub use assessor::{
    AssessError, CancellationDetails, PassRequest, PronunciationAssessor, RecognitionFailure,
    RecognitionReason,
};
pub use audio_stage::{AudioStager, StagedAudio};
pub use azure_client::AzureSpeechClient;
pub use result_merger::{merge_results, MergeError};
