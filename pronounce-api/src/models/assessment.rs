//! Assessment request and per-granularity result types

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ApiError, ApiResult};

/// Locale used when the client does not supply one
pub const DEFAULT_LOCALE: &str = "en-US";

/// Proficiency label used when the client does not supply one
pub const DEFAULT_PROFICIENCY: &str = "General";

/// One pronunciation assessment submission
///
/// Constructed per incoming request and dropped once the response is sent.
#[derive(Debug, Clone)]
pub struct AssessmentRequest {
    /// Text the speaker attempted to say
    pub reference_text: String,
    /// BCP-47 locale (e.g. `en-US`, `en-GB`)
    pub locale: String,
    /// Recorded audio as uploaded
    pub audio: Bytes,
    /// Upload file name, used only to choose the staged file suffix
    pub file_name: Option<String>,
    pub enable_prosody: bool,
    /// Free-form label echoed back next to the combined score
    pub proficiency: String,
}

impl AssessmentRequest {
    /// Reject requests that must never reach the speech service
    pub fn validate(&self) -> ApiResult<()> {
        if self.reference_text.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Reference text must not be empty.".to_string(),
            ));
        }
        Ok(())
    }
}

/// Level of detail requested from the speech service
///
/// Ordering follows increasing detail: Word < Syllable < Phoneme. Serializes
/// lower-cased, which is also the key in the report's `overall` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Word,
    Syllable,
    Phoneme,
}

impl Granularity {
    /// Every granularity, in the order passes are run
    pub const ALL: [Granularity; 3] = [Granularity::Word, Granularity::Syllable, Granularity::Phoneme];

    pub fn name(self) -> &'static str {
        match self {
            Granularity::Word => "Word",
            Granularity::Syllable => "Syllable",
            Granularity::Phoneme => "Phoneme",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Miscue classification reported per word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorType {
    #[default]
    None,
    Omission,
    Insertion,
    Mispronunciation,
    UnexpectedBreak,
    MissingBreak,
    Monotone,
    /// Any tag the service adds beyond the known set
    #[serde(other)]
    Unrecognized,
}

/// Overall sub-scores of one pass, each in [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallScores {
    pub pronunciation_score: f64,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub completeness_score: f64,
    /// Only present when prosody assessment was negotiated and returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prosody_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyllableDetail {
    pub syllable: String,
    pub accuracy_score: f64,
    pub offset_sec: f64,
    pub duration_sec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhonemeDetail {
    pub phoneme: String,
    pub accuracy_score: f64,
    pub offset_sec: f64,
    pub duration_sec: f64,
}

/// Per-word assessment detail
///
/// Identity is the positional index within a pass. `syllables` and
/// `phonemes` are empty when the pass did not supply that level of detail
/// and are then omitted from JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDetail {
    pub word: String,
    pub accuracy_score: f64,
    pub error_type: ErrorType,
    pub offset_sec: f64,
    pub duration_sec: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub syllables: Vec<SyllableDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phonemes: Vec<PhonemeDetail>,
}

/// Result of a single assessment pass
#[derive(Debug, Clone, PartialEq)]
pub struct GranularityResult {
    pub granularity: Granularity,
    pub scores: OverallScores,
    pub recognized_text: String,
    pub offset_sec: f64,
    pub duration_sec: f64,
    pub words: Vec<WordDetail>,
}
