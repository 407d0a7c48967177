//! Data models for pronunciation assessment
//!
//! - `assessment`: incoming request, granularity passes and their per-word detail
//! - `report`: merged report returned to clients

pub mod assessment;
pub mod report;

pub use assessment::{
    AssessmentRequest, ErrorType, Granularity, GranularityResult, OverallScores, PhonemeDetail,
    SyllableDetail, WordDetail, DEFAULT_LOCALE, DEFAULT_PROFICIENCY,
};
pub use report::{CombinedScore, MergedReport, OverallReport};
