//! Assessment workflow
//!
//! **Algorithm:**
//! 1. Fail fast if the assessor has no credentials
//! 2. Negotiate optional features for the locale (once per request)
//! 3. Run Word, Syllable, Phoneme passes sequentially over the staged audio
//! 4. Merge into one report
//!
//! The first failing pass aborts the remaining ones; partial results are
//! never returned.

use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use super::assessor::{AssessError, PassRequest, PronunciationAssessor};
use super::capabilities;
use super::result_merger;
use crate::error::ApiResult;
use crate::models::{AssessmentRequest, Granularity, GranularityResult, MergedReport};

/// Run every pass for `request` against the staged `audio` and merge them
pub async fn run_assessment(
    assessor: &dyn PronunciationAssessor,
    audio: &Path,
    request: &AssessmentRequest,
) -> ApiResult<MergedReport> {
    if !assessor.is_configured() {
        return Err(AssessError::NotConfigured.into());
    }

    let features = capabilities::negotiate(&request.locale, request.enable_prosody);
    for warning in &features.warnings {
        warn!(locale = %request.locale, "Continuing without optional feature: {}", warning);
    }

    let mut results: Vec<GranularityResult> = Vec::with_capacity(Granularity::ALL.len());
    for granularity in Granularity::ALL {
        let pass = PassRequest {
            phoneme_alphabet: features.phoneme_alphabet,
            enable_prosody: features.enable_prosody,
            ..PassRequest::new(&request.reference_text, &request.locale, granularity)
        };

        let started = Instant::now();
        let result = match assessor.assess(audio, &pass).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    granularity = %granularity,
                    error = %e,
                    "Assessment pass failed, aborting remaining passes"
                );
                return Err(e.into());
            }
        };

        info!(
            granularity = %granularity,
            words = result.words.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Assessment pass complete"
        );
        results.push(result);
    }

    let report = result_merger::merge_results(results, &request.proficiency)?;
    Ok(report)
}
