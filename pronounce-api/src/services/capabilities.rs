//! Locale capability negotiation
//!
//! Optional assessment features are only honored by the speech service for
//! some locales. Instead of sending them blindly and ignoring whatever
//! happens, features are negotiated once per request: supported ones are
//! enabled for every pass, unsupported ones are dropped and reported as
//! [`CapabilityWarning`]s.

use std::fmt;

/// Phoneme alphabet required for syllable groups
pub const IPA_ALPHABET: &str = "IPA";

/// Locales with IPA phonemes, syllable groups and prosody assessment
const FULL_FEATURE_LOCALES: &[&str] = &["en-US"];

/// Features the service offers for one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleCapabilities {
    pub ipa_alphabet: bool,
    pub prosody: bool,
}

impl LocaleCapabilities {
    pub fn for_locale(locale: &str) -> Self {
        let full = FULL_FEATURE_LOCALES
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(locale.trim()));

        Self {
            ipa_alphabet: full,
            prosody: full,
        }
    }
}

/// A requested or implied feature the locale cannot provide
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityWarning {
    /// Prosody was requested but is not offered for this locale
    ProsodyUnsupported { locale: String },
    /// Syllable groups need IPA phonemes, which this locale lacks
    SyllablesUnavailable { locale: String },
}

impl fmt::Display for CapabilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityWarning::ProsodyUnsupported { locale } => {
                write!(f, "prosody assessment is not supported for {}", locale)
            }
            CapabilityWarning::SyllablesUnavailable { locale } => {
                write!(f, "syllable detail is not available for {}", locale)
            }
        }
    }
}

/// Outcome of negotiation, applied to every pass of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFeatures {
    pub phoneme_alphabet: Option<&'static str>,
    pub enable_prosody: bool,
    pub warnings: Vec<CapabilityWarning>,
}

/// Negotiate optional features for `locale`
pub fn negotiate(locale: &str, want_prosody: bool) -> NegotiatedFeatures {
    let caps = LocaleCapabilities::for_locale(locale);
    let mut warnings = Vec::new();

    let phoneme_alphabet = if caps.ipa_alphabet {
        Some(IPA_ALPHABET)
    } else {
        warnings.push(CapabilityWarning::SyllablesUnavailable {
            locale: locale.to_string(),
        });
        None
    };

    let enable_prosody = want_prosody && caps.prosody;
    if want_prosody && !caps.prosody {
        warnings.push(CapabilityWarning::ProsodyUnsupported {
            locale: locale.to_string(),
        });
    }

    NegotiatedFeatures {
        phoneme_alphabet,
        enable_prosody,
        warnings,
    }
}
