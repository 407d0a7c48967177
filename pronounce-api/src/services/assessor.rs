//! Assessment client seam
//!
//! One call to [`PronunciationAssessor::assess`] is one pass at one
//! granularity. The production implementation is
//! [`AzureSpeechClient`](super::azure_client::AzureSpeechClient); tests swap in
//! scripted assessors.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::models::{Granularity, GranularityResult};

/// Parameters of a single assessment pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassRequest {
    pub reference_text: String,
    pub locale: String,
    pub granularity: Granularity,
    /// Surface omission/insertion errors relative to the reference text
    pub enable_miscue: bool,
    pub enable_prosody: bool,
    /// `None` leaves the service default alphabet
    pub phoneme_alphabet: Option<&'static str>,
}

impl PassRequest {
    /// Pass with miscue detection on and no optional features
    pub fn new(reference_text: &str, locale: &str, granularity: Granularity) -> Self {
        Self {
            reference_text: reference_text.to_string(),
            locale: locale.to_string(),
            granularity,
            enable_miscue: true,
            enable_prosody: false,
            phoneme_alphabet: None,
        }
    }
}

/// Why the service did not yield recognized speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecognitionReason {
    /// Speech could not be matched (silence, babble, nothing recognized)
    NoMatch,
    /// The call itself failed (service error, transport, authentication)
    Canceled,
}

/// Cancellation diagnostics, named after the service's error codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationDetails {
    /// e.g. `AuthenticationFailure`, `ConnectionFailure`, `ServiceError`
    pub error_code: String,
    pub error_details: String,
}

/// Diagnostic for a pass that produced no recognized speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{granularity} pass failed: {reason:?}")]
pub struct RecognitionFailure {
    pub granularity: Granularity,
    pub reason: RecognitionReason,
    pub no_match_details: Option<String>,
    pub cancellation_details: Option<CancellationDetails>,
}

impl RecognitionFailure {
    pub fn no_match(granularity: Granularity, details: impl Into<String>) -> Self {
        Self {
            granularity,
            reason: RecognitionReason::NoMatch,
            no_match_details: Some(details.into()),
            cancellation_details: None,
        }
    }

    pub fn canceled(
        granularity: Granularity,
        error_code: impl Into<String>,
        error_details: impl Into<String>,
    ) -> Self {
        Self {
            granularity,
            reason: RecognitionReason::Canceled,
            no_match_details: None,
            cancellation_details: Some(CancellationDetails {
                error_code: error_code.into(),
                error_details: error_details.into(),
            }),
        }
    }
}

/// Assessment client errors
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("Speech service credentials not configured")]
    NotConfigured,

    #[error("Staged audio unreadable: {0}")]
    Audio(#[from] std::io::Error),

    #[error(transparent)]
    Recognition(#[from] RecognitionFailure),
}

/// Pronunciation assessment backend
#[async_trait]
pub trait PronunciationAssessor: Send + Sync {
    /// Whether credentials are available; checked before any audio is staged
    fn is_configured(&self) -> bool;

    /// Run one pass over the staged audio file
    async fn assess(
        &self,
        audio: &Path,
        pass: &PassRequest,
    ) -> Result<GranularityResult, AssessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_request_defaults_to_miscue() {
        let pass = PassRequest::new("hello", "en-US", Granularity::Word);
        assert!(pass.enable_miscue);
        assert!(!pass.enable_prosody);
        assert!(pass.phoneme_alphabet.is_none());
    }

    #[test]
    fn test_no_match_failure_serializes_diagnostics() {
        let failure = RecognitionFailure::no_match(Granularity::Syllable, "InitialSilenceTimeout");
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["granularity"], "syllable");
        assert_eq!(json["reason"], "NoMatch");
        assert_eq!(json["noMatchDetails"], "InitialSilenceTimeout");
        assert!(json["cancellationDetails"].is_null());
    }

    #[test]
    fn test_canceled_failure_serializes_diagnostics() {
        let failure =
            RecognitionFailure::canceled(Granularity::Word, "AuthenticationFailure", "HTTP 401");
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["reason"], "Canceled");
        assert!(json["noMatchDetails"].is_null());
        assert_eq!(json["cancellationDetails"]["errorCode"], "AuthenticationFailure");
        assert_eq!(json["cancellationDetails"]["errorDetails"], "HTTP 401");
        assert_eq!(failure.to_string(), "Word pass failed: Canceled");
    }
}
