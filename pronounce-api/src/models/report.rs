//! Merged assessment report returned by `POST /assess`

use serde::Serialize;
use std::collections::BTreeMap;

use super::assessment::{Granularity, OverallScores, WordDetail};

/// Derived single score plus the caller's proficiency label
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedScore {
    /// `None` (serialized as `null`) when no Word pass scores exist
    pub score: Option<f64>,
    /// Echoed verbatim from the request
    pub proficiency_tag: String,
}

/// `overall` section: one entry per pass keyed by lower-cased granularity,
/// plus `combined`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallReport {
    #[serde(flatten)]
    pub passes: BTreeMap<Granularity, OverallScores>,
    pub combined: CombinedScore,
}

/// Word-indexed report merged from the three granularity passes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedReport {
    pub recognized_text: String,
    pub duration_sec: f64,
    pub offset_sec: f64,
    pub overall: OverallReport,
    pub words: Vec<WordDetail>,
}
