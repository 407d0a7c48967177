//! Result merging for the three assessment passes
//!
//! Merge strategy: positional join on the Word pass.
//! - Baseline word sequence from the Word pass (first result if absent)
//! - Word i takes syllables from Syllable-pass word i when non-empty
//! - Word i takes phonemes from Phoneme-pass word i when non-empty
//! - `combined` derived from Word-pass scores only
//!
//! Passes are assumed to share segmentation. Misalignment is detected and
//! logged but does not change the join.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::models::{
    CombinedScore, Granularity, GranularityResult, MergedReport, OverallReport, OverallScores,
    WordDetail,
};

const PRONUNCIATION_WEIGHT: f64 = 0.5;
const ACCURACY_WEIGHT: f64 = 0.3;
const FLUENCY_WEIGHT: f64 = 0.1;
const COMPLETENESS_WEIGHT: f64 = 0.1;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No granularity results to merge")]
    NoResults,
}

/// Weighted single score from Word-pass overall scores, rounded to 2 places
pub fn combined_score(scores: &OverallScores) -> f64 {
    let raw = PRONUNCIATION_WEIGHT * scores.pronunciation_score
        + ACCURACY_WEIGHT * scores.accuracy_score
        + FLUENCY_WEIGHT * scores.fluency_score
        + COMPLETENESS_WEIGHT * scores.completeness_score;
    round_to_hundredths(raw)
}

/// Round half-to-even on the exact binary value
///
/// `{:.2}` formatting resolves exact ties to the even digit, so two-decimal
/// inputs such as 85.125 come out as 85.12 rather than 85.13.
fn round_to_hundredths(value: f64) -> f64 {
    format!("{:.2}", value).parse::<f64>().unwrap_or(value)
}

/// Indices where `other` disagrees with the baseline segmentation
///
/// Covers differing tokens at shared indices plus every index present in
/// only one of the two sequences.
pub fn misaligned_indices(baseline: &[WordDetail], other: &[WordDetail]) -> Vec<usize> {
    let shared = baseline.len().min(other.len());
    let longest = baseline.len().max(other.len());

    (0..shared)
        .filter(|&i| !tokens_match(&baseline[i].word, &other[i].word))
        .chain(shared..longest)
        .collect()
}

fn tokens_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Merge pass results into one report
///
/// `proficiency` is echoed verbatim into `combined.proficiencyTag`.
pub fn merge_results(
    results: Vec<GranularityResult>,
    proficiency: &str,
) -> Result<MergedReport, MergeError> {
    if results.is_empty() {
        return Err(MergeError::NoResults);
    }

    let find = |granularity: Granularity| results.iter().find(|r| r.granularity == granularity);

    let baseline = match find(Granularity::Word) {
        Some(word_pass) => word_pass,
        None => {
            warn!(
                fallback = %results[0].granularity,
                "Word pass missing, using first available result as baseline"
            );
            &results[0]
        }
    };
    let syllable_pass = find(Granularity::Syllable);
    let phoneme_pass = find(Granularity::Phoneme);

    for pass in [syllable_pass, phoneme_pass].into_iter().flatten() {
        if pass.granularity == baseline.granularity {
            continue;
        }
        let mismatched = misaligned_indices(&baseline.words, &pass.words);
        if !mismatched.is_empty() {
            warn!(
                granularity = %pass.granularity,
                baseline_words = baseline.words.len(),
                pass_words = pass.words.len(),
                mismatched = ?mismatched,
                "Pass segmentation differs from baseline; positional enrichment may be misaligned"
            );
        }
    }

    let words = baseline
        .words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let mut merged = word.clone();
            if let Some(source) = syllable_pass.and_then(|p| p.words.get(i)) {
                if !source.syllables.is_empty() {
                    merged.syllables = source.syllables.clone();
                }
            }
            if let Some(source) = phoneme_pass.and_then(|p| p.words.get(i)) {
                if !source.phonemes.is_empty() {
                    merged.phonemes = source.phonemes.clone();
                }
            }
            merged
        })
        .collect();

    let passes: BTreeMap<Granularity, OverallScores> = results
        .iter()
        .map(|r| (r.granularity, r.scores.clone()))
        .collect();

    let combined = CombinedScore {
        score: find(Granularity::Word).map(|r| combined_score(&r.scores)),
        proficiency_tag: proficiency.to_string(),
    };

    Ok(MergedReport {
        recognized_text: baseline.recognized_text.clone(),
        duration_sec: baseline.duration_sec,
        offset_sec: baseline.offset_sec,
        overall: OverallReport { passes, combined },
        words,
    })
}
