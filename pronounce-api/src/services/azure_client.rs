//! Azure Speech pronunciation assessment client
//!
//! Uses the REST "short audio" recognition endpoint with a
//! `Pronunciation-Assessment` header (base64 JSON). One HTTP call per pass.
//!
//! The service has no syllable granularity on the wire; syllable groups come
//! back with phoneme-level detail. The Syllable pass therefore requests
//! `Phoneme` and keeps only syllables, the Phoneme pass keeps only phonemes,
//! and the Word pass keeps neither.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pronounce_common::config::{SpeechCredentials, SpeechSettings};
use pronounce_common::timing::ticks_to_seconds;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::assessor::{AssessError, PassRequest, PronunciationAssessor, RecognitionFailure};
use crate::models::{
    ErrorType, Granularity, GranularityResult, OverallScores, PhonemeDetail, SyllableDetail,
    WordDetail,
};

const RECOGNITION_PATH: &str = "/speech/recognition/conversation/cognitiveservices/v1";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const ASSESSMENT_HEADER: &str = "Pronunciation-Assessment";
const WAV_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";
const OGG_CONTENT_TYPE: &str = "audio/ogg; codecs=opus";

/// Build the regional recognition URL, or one under an explicit endpoint
pub fn recognition_url(credentials: &SpeechCredentials, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(base) => format!("{}{}", base, RECOGNITION_PATH),
        None => format!(
            "https://{}.stt.speech.microsoft.com{}",
            credentials.region, RECOGNITION_PATH
        ),
    }
}

/// Content type for the staged file, chosen by suffix
pub fn content_type_for(audio: &Path) -> &'static str {
    match audio
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("ogg") | Some("opus") => OGG_CONTENT_TYPE,
        _ => WAV_CONTENT_TYPE,
    }
}

/// Granularity name sent to the service for a pass
fn service_granularity(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Word => "Word",
        Granularity::Syllable | Granularity::Phoneme => "Phoneme",
    }
}

/// Map an HTTP failure status to the service's cancellation error codes
fn error_code_for_status(status: u16) -> &'static str {
    match status {
        400 => "BadRequest",
        401 | 403 => "AuthenticationFailure",
        408 => "ServiceTimeout",
        429 => "TooManyRequests",
        500..=599 => "ServiceError",
        _ => "RuntimeError",
    }
}

/// JSON carried (base64-encoded) in the `Pronunciation-Assessment` header
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssessmentParams<'a> {
    pub reference_text: &'a str,
    pub grading_system: &'static str,
    pub granularity: &'static str,
    pub dimension: &'static str,
    pub enable_miscue: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phoneme_alphabet: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub enable_prosody_assessment: bool,
}

impl<'a> AssessmentParams<'a> {
    pub fn for_pass(pass: &'a PassRequest) -> Self {
        Self {
            reference_text: &pass.reference_text,
            grading_system: "HundredMark",
            granularity: service_granularity(pass.granularity),
            dimension: "Comprehensive",
            enable_miscue: pass.enable_miscue,
            phoneme_alphabet: pass.phoneme_alphabet,
            enable_prosody_assessment: pass.enable_prosody,
        }
    }

    pub fn to_header_value(&self) -> Result<String, serde_json::Error> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SpeechResponse {
    recognition_status: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    display_text: Option<String>,
    #[serde(default, rename = "NBest")]
    n_best: Vec<NBestEntry>,
}

/// Scores appear nested under `PronunciationAssessment` in current API
/// versions and directly on the entry in older ones
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireScores {
    #[serde(default)]
    accuracy_score: Option<f64>,
    #[serde(default)]
    fluency_score: Option<f64>,
    #[serde(default)]
    completeness_score: Option<f64>,
    #[serde(default)]
    pron_score: Option<f64>,
    #[serde(default)]
    prosody_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NBestEntry {
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    pronunciation_assessment: Option<WireScores>,
    #[serde(flatten)]
    legacy_scores: WireScores,
    #[serde(default)]
    words: Vec<WireWord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireWordAssessment {
    #[serde(default)]
    accuracy_score: Option<f64>,
    #[serde(default)]
    error_type: Option<ErrorType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireWord {
    word: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pronunciation_assessment: Option<WireWordAssessment>,
    #[serde(flatten)]
    legacy_assessment: WireWordAssessment,
    #[serde(default)]
    syllables: Vec<WireSyllable>,
    #[serde(default)]
    phonemes: Vec<WirePhoneme>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireUnitAssessment {
    #[serde(default)]
    accuracy_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireSyllable {
    syllable: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pronunciation_assessment: WireUnitAssessment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WirePhoneme {
    phoneme: String,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pronunciation_assessment: WireUnitAssessment,
}

impl SpeechResponse {
    /// Convert to a pass result, keeping only the detail the pass asked for
    fn into_granularity_result(
        self,
        granularity: Granularity,
    ) -> Result<GranularityResult, RecognitionFailure> {
        match self.recognition_status.as_str() {
            "Success" => {}
            "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => {
                return Err(RecognitionFailure::no_match(
                    granularity,
                    self.recognition_status.clone(),
                ));
            }
            "Error" => {
                return Err(RecognitionFailure::canceled(
                    granularity,
                    "ServiceError",
                    "Recognition service reported an error",
                ));
            }
            other => {
                return Err(RecognitionFailure::canceled(
                    granularity,
                    "RuntimeError",
                    format!("Unexpected recognition status: {}", other),
                ));
            }
        }

        let best = self.n_best.into_iter().next().ok_or_else(|| {
            RecognitionFailure::no_match(granularity, "No recognition hypotheses returned")
        })?;

        let scores = {
            let src = best
                .pronunciation_assessment
                .as_ref()
                .unwrap_or(&best.legacy_scores);
            OverallScores {
                pronunciation_score: src.pron_score.unwrap_or(0.0),
                accuracy_score: src.accuracy_score.unwrap_or(0.0),
                fluency_score: src.fluency_score.unwrap_or(0.0),
                completeness_score: src.completeness_score.unwrap_or(0.0),
                prosody_score: src.prosody_score,
            }
        };

        let recognized_text = self
            .display_text
            .or(best.display)
            .unwrap_or_default();

        let words = best
            .words
            .into_iter()
            .map(|w| w.into_word_detail(granularity))
            .collect();

        Ok(GranularityResult {
            granularity,
            scores,
            recognized_text,
            offset_sec: ticks_to_seconds(self.offset),
            duration_sec: ticks_to_seconds(self.duration),
            words,
        })
    }
}

impl WireWord {
    fn into_word_detail(self, granularity: Granularity) -> WordDetail {
        let assessment = self
            .pronunciation_assessment
            .unwrap_or(self.legacy_assessment);

        let syllables = if granularity == Granularity::Syllable {
            self.syllables
                .into_iter()
                .map(|s| SyllableDetail {
                    syllable: s.syllable,
                    accuracy_score: s.pronunciation_assessment.accuracy_score,
                    offset_sec: ticks_to_seconds(s.offset),
                    duration_sec: ticks_to_seconds(s.duration),
                })
                .collect()
        } else {
            Vec::new()
        };

        let phonemes = if granularity == Granularity::Phoneme {
            self.phonemes
                .into_iter()
                .map(|p| PhonemeDetail {
                    phoneme: p.phoneme,
                    accuracy_score: p.pronunciation_assessment.accuracy_score,
                    offset_sec: ticks_to_seconds(p.offset),
                    duration_sec: ticks_to_seconds(p.duration),
                })
                .collect()
        } else {
            Vec::new()
        };

        WordDetail {
            word: self.word,
            accuracy_score: assessment.accuracy_score.unwrap_or(0.0),
            error_type: assessment.error_type.unwrap_or_default(),
            offset_sec: ticks_to_seconds(self.offset),
            duration_sec: ticks_to_seconds(self.duration),
            syllables,
            phonemes,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Azure Speech REST client
pub struct AzureSpeechClient {
    http_client: reqwest::Client,
    credentials: Option<SpeechCredentials>,
    endpoint: Option<String>,
}

impl AzureSpeechClient {
    pub fn new(settings: &SpeechSettings) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            credentials: settings.credentials.clone(),
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl PronunciationAssessor for AzureSpeechClient {
    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn assess(
        &self,
        audio: &Path,
        pass: &PassRequest,
    ) -> Result<GranularityResult, AssessError> {
        let credentials = self.credentials.as_ref().ok_or(AssessError::NotConfigured)?;
        let granularity = pass.granularity;

        let header = AssessmentParams::for_pass(pass)
            .to_header_value()
            .map_err(|e| RecognitionFailure::canceled(granularity, "RuntimeError", e.to_string()))?;
        let audio_bytes = tokio::fs::read(audio).await?;
        let url = recognition_url(credentials, self.endpoint.as_deref());

        debug!(
            granularity = %granularity,
            locale = %pass.locale,
            audio_bytes = audio_bytes.len(),
            "Querying speech service"
        );

        let response = self
            .http_client
            .post(&url)
            .query(&[("language", pass.locale.as_str()), ("format", "detailed")])
            .header(SUBSCRIPTION_KEY_HEADER, credentials.key.as_str())
            .header(ASSESSMENT_HEADER, header)
            .header(CONTENT_TYPE, content_type_for(audio))
            .header(ACCEPT, "application/json")
            .body(audio_bytes)
            .send()
            .await
            .map_err(|e| {
                RecognitionFailure::canceled(granularity, "ConnectionFailure", e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecognitionFailure::canceled(
                granularity,
                error_code_for_status(status.as_u16()),
                format!("HTTP {}: {}", status.as_u16(), error_text),
            )
            .into());
        }

        let speech_response: SpeechResponse = response.json().await.map_err(|e| {
            RecognitionFailure::canceled(
                granularity,
                "RuntimeError",
                format!("Undecodable response: {}", e),
            )
        })?;

        let result = speech_response.into_granularity_result(granularity)?;

        info!(
            granularity = %granularity,
            words = result.words.len(),
            pronunciation = result.scores.pronunciation_score,
            "Speech service assessment complete"
        );

        Ok(result)
    }
}
