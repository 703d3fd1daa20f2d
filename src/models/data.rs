use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::utils::{AiServiceError, CredentialError, DocumentSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

/// Text pulled out of one document during one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedContent {
    pub raw_text: String,
    pub cleaned_text: String,
    pub source_length: usize,
}

impl ExtractedContent {
    /// Length of the cleaned text in characters, ignoring surrounding whitespace.
    pub fn usable_length(&self) -> usize {
        self.cleaned_text.trim().chars().count()
    }
}

/// Canonical credential categories, declared in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CredentialType {
    #[serde(rename = "Certificate of Graduation")]
    CertificateOfGraduation,
    #[serde(rename = "Transcript")]
    Transcript,
    #[serde(rename = "PhD Degree")]
    PhdDegree,
    #[serde(rename = "Master Degree")]
    MasterDegree,
    #[serde(rename = "Bachelor Degree")]
    BachelorDegree,
    #[serde(rename = "Diploma")]
    Diploma,
    #[serde(rename = "Certificate")]
    Certificate,
    #[serde(rename = "Achievement Award")]
    AchievementAward,
    #[serde(rename = "Letter of Recommendation")]
    LetterOfRecommendation,
}

impl CredentialType {
    pub const ALL: [CredentialType; 9] = [
        CredentialType::CertificateOfGraduation,
        CredentialType::Transcript,
        CredentialType::PhdDegree,
        CredentialType::MasterDegree,
        CredentialType::BachelorDegree,
        CredentialType::Diploma,
        CredentialType::Certificate,
        CredentialType::AchievementAward,
        CredentialType::LetterOfRecommendation,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            CredentialType::CertificateOfGraduation => "Certificate of Graduation",
            CredentialType::Transcript => "Transcript",
            CredentialType::PhdDegree => "PhD Degree",
            CredentialType::MasterDegree => "Master Degree",
            CredentialType::BachelorDegree => "Bachelor Degree",
            CredentialType::Diploma => "Diploma",
            CredentialType::Certificate => "Certificate",
            CredentialType::AchievementAward => "Achievement Award",
            CredentialType::LetterOfRecommendation => "Letter of Recommendation",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A label or score as the vision service actually sends it: text, a bare
/// number, or null.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Text(String),
    Number(f64),
    Null(()),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "LooseValue")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl From<String> for Confidence {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" | "very high" => Confidence::High,
            "medium" | "moderate" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl From<LooseValue> for Confidence {
    fn from(value: LooseValue) -> Self {
        match value {
            LooseValue::Text(label) => Confidence::from(label),
            LooseValue::Number(n) => {
                // 0..=1 is a probability, anything larger a percentage
                let percent = if n <= 1.0 { n * 100.0 } else { n };
                if percent >= 80.0 {
                    Confidence::High
                } else if percent >= 50.0 {
                    Confidence::Medium
                } else {
                    Confidence::Low
                }
            }
            LooseValue::Null(()) => Confidence::Low,
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialClassification {
    pub canonical_type: Option<CredentialType>,
    pub raw_label: Option<String>,
    pub confidence: Option<Confidence>,
}

impl CredentialClassification {
    pub fn unclassified() -> Self {
        CredentialClassification {
            canonical_type: None,
            raw_label: None,
            confidence: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumericMismatch {
    pub value: String,
    pub count_in_reference: usize,
    pub count_in_candidate: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub final_similarity: f64,
    pub character_similarity: f64,
    pub word_similarity: f64,
    pub penalty: f64,
    pub potential_tampering: bool,
    pub numeric_mismatches: Vec<NumericMismatch>,
    pub unique_to_reference: Vec<String>,
    pub unique_to_candidate: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "LooseValue")]
pub enum TamperingSeverity {
    None,
    Minor,
    Moderate,
    Severe,
}

impl From<String> for TamperingSeverity {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "severe" | "high" | "critical" => TamperingSeverity::Severe,
            "moderate" | "medium" => TamperingSeverity::Moderate,
            "minor" | "low" => TamperingSeverity::Minor,
            _ => TamperingSeverity::None,
        }
    }
}

impl From<LooseValue> for TamperingSeverity {
    fn from(value: LooseValue) -> Self {
        match value {
            LooseValue::Text(label) => TamperingSeverity::from(label),
            LooseValue::Number(_) | LooseValue::Null(()) => TamperingSeverity::None,
        }
    }
}

impl Default for TamperingSeverity {
    fn default() -> Self {
        TamperingSeverity::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TamperingField {
    pub field: String,
    pub reference_value: String,
    pub candidate_value: String,
    pub location: String,
    pub method: String,
    pub severity: TamperingSeverity,
}

impl Default for TamperingField {
    fn default() -> Self {
        TamperingField {
            field: String::new(),
            reference_value: String::new(),
            candidate_value: String::new(),
            location: String::new(),
            method: String::new(),
            severity: TamperingSeverity::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualComparison {
    #[serde(default)]
    pub same_credential_type: bool,
    #[serde(default)]
    pub exact_same_document: bool,
    #[serde(default)]
    pub match_confidence: Confidence,
    #[serde(default)]
    pub tampering_severity: TamperingSeverity,
    #[serde(default)]
    pub specific_tampering: Vec<TamperingField>,
    #[serde(default, deserialize_with = "score_0_100")]
    pub authenticity_score: u8,
}

/// What the vision service reports about a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentClassification {
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub visual_elements: Vec<String>,
    #[serde(default)]
    pub institution_name: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticityMarkers {
    #[serde(default)]
    pub seal_present: bool,
    #[serde(default)]
    pub signature_present: bool,
    #[serde(default)]
    pub stamp_present: bool,
    #[serde(default, deserialize_with = "score_0_100")]
    pub overall_authenticity_score: u8,
    #[serde(default)]
    pub observations: Vec<String>,
}

// Accepts 87, 87.4, "87", "87%" and null
fn score_0_100<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = match LooseValue::deserialize(deserializer)? {
        LooseValue::Number(n) => n,
        LooseValue::Null(()) => return Ok(0),
        LooseValue::Text(text) => text
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("score is not a number: {:?}", text)))?,
    };
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Identical,
    Authentic,
    Suspicious,
    Fraudulent,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            VerdictStatus::Identical => "identical",
            VerdictStatus::Authentic => "authentic",
            VerdictStatus::Suspicious => "suspicious",
            VerdictStatus::Fraudulent => "fraudulent",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonMode {
    #[serde(rename = "ai")]
    Ai,
    #[serde(rename = "ocr-fallback")]
    OcrFallback,
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ComparisonMode::Ai => write!(f, "ai"),
            ComparisonMode::OcrFallback => write!(f, "ocr-fallback"),
        }
    }
}

/// Why the AI-assisted path was abandoned for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    NotConfigured,
    QuotaExhausted,
    InvalidCredentials,
    ServiceUnavailable,
    MalformedResponse,
}

impl From<&AiServiceError> for FallbackReason {
    fn from(err: &AiServiceError) -> Self {
        match err {
            AiServiceError::QuotaExhausted(_) => FallbackReason::QuotaExhausted,
            AiServiceError::InvalidCredentials(_) => FallbackReason::InvalidCredentials,
            AiServiceError::Unavailable(_) => FallbackReason::ServiceUnavailable,
            AiServiceError::MalformedResponse(_) => FallbackReason::MalformedResponse,
            AiServiceError::NotConfigured => FallbackReason::NotConfigured,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub message: String,
    pub mode: ComparisonMode,
    pub similarity: SimilarityResult,
    pub visual: Option<VisualComparison>,
    pub reference_classification: CredentialClassification,
    pub candidate_classification: CredentialClassification,
    pub reference_analysis: Option<DocumentClassification>,
    pub candidate_analysis: Option<DocumentClassification>,
    pub reference_markers: Option<AuthenticityMarkers>,
    pub candidate_markers: Option<AuthenticityMarkers>,
    pub type_match: bool,
    pub advisory: Option<String>,
    pub fallback_reason: Option<FallbackReason>,
    pub warnings: Vec<String>,
    pub reference_sha256: String,
    pub candidate_sha256: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Fetch,
    InsufficientContent,
    Extraction,
    InvalidInput,
}

/// Structured failure handed back to the caller instead of an error.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub user_message: String,
    pub side: Option<DocumentSide>,
}

impl From<CredentialError> for VerificationFailure {
    fn from(err: CredentialError) -> Self {
        let message = err.to_string();
        match err {
            CredentialError::Fetch(_) => VerificationFailure {
                kind: FailureKind::Fetch,
                message,
                user_message: "The institution's copy of this credential could not be retrieved. \
                               Please try again later."
                    .to_string(),
                side: Some(DocumentSide::Reference),
            },
            CredentialError::InsufficientContent { side, .. } => VerificationFailure {
                kind: FailureKind::InsufficientContent,
                message,
                user_message: format!(
                    "Too little text could be read from the {} document. It may be a scanned or \
                     blurred image, or in an unsupported format. Please upload a clearer copy.",
                    side
                ),
                side: Some(side),
            },
            CredentialError::Extraction(_) | CredentialError::Io(_) => VerificationFailure {
                kind: FailureKind::Extraction,
                message,
                user_message: "The document could not be read. Please upload a PDF or a common \
                               image format (PNG, JPEG)."
                    .to_string(),
                side: None,
            },
            CredentialError::InvalidInput(_) | CredentialError::Config(_) => VerificationFailure {
                kind: FailureKind::InvalidInput,
                message,
                user_message: "The verification request was incomplete or invalid.".to_string(),
                side: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum VerificationOutcome {
    Completed(Verdict),
    Failed(VerificationFailure),
}

impl VerificationOutcome {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            VerificationOutcome::Completed(verdict) => Some(verdict),
            VerificationOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&VerificationFailure> {
        match self {
            VerificationOutcome::Completed(_) => None,
            VerificationOutcome::Failed(failure) => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visual_comparison_tolerates_loose_labels() {
        let json = r#"{
            "sameCredentialType": true,
            "exactSameDocument": false,
            "matchConfidence": "Medium",
            "tamperingSeverity": "SEVERE",
            "specificTampering": [{"field": "GPA", "referenceValue": "3.5", "candidateValue": "3.9"}],
            "authenticityScore": 140
        }"#;
        let parsed: VisualComparison = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tampering_severity, TamperingSeverity::Severe);
        assert_eq!(parsed.match_confidence, Confidence::Medium);
        assert_eq!(parsed.authenticity_score, 100);
        assert_eq!(parsed.specific_tampering[0].severity, TamperingSeverity::None);
    }

    #[test]
    fn test_numeric_and_null_fields_are_coerced() {
        let json = r#"{
            "sameCredentialType": true,
            "exactSameDocument": true,
            "matchConfidence": 0.92,
            "tamperingSeverity": null,
            "authenticityScore": null
        }"#;
        let parsed: VisualComparison = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.match_confidence, Confidence::High);
        assert_eq!(parsed.tampering_severity, TamperingSeverity::None);
        assert_eq!(parsed.authenticity_score, 0);

        let json = r#"{"matchConfidence": null, "authenticityScore": "85%"}"#;
        let parsed: VisualComparison = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.match_confidence, Confidence::Low);
        assert_eq!(parsed.authenticity_score, 85);

        let json = r#"{"documentType": "Transcript", "confidence": 65}"#;
        let parsed: DocumentClassification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.confidence, Confidence::Medium);

        let json = r#"{"sealPresent": true, "overallAuthenticityScore": 72.6}"#;
        let parsed: AuthenticityMarkers = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.overall_authenticity_score, 73);
    }

    #[test]
    fn test_mode_serializes_with_hyphen() {
        let json = serde_json::to_string(&ComparisonMode::OcrFallback).unwrap();
        assert_eq!(json, "\"ocr-fallback\"");
    }

    #[test]
    fn test_insufficient_content_failure_mentions_causes() {
        let failure = VerificationFailure::from(CredentialError::InsufficientContent {
            side: DocumentSide::Candidate,
            length: 4,
        });
        assert_eq!(failure.kind, FailureKind::InsufficientContent);
        assert!(failure.user_message.contains("scanned"));
        assert!(failure.user_message.contains("unsupported format"));
        assert_eq!(failure.side, Some(DocumentSide::Candidate));
    }
}
