use crate::models::{
    ComparisonMode, CredentialClassification, SimilarityResult, TamperingSeverity, VerdictStatus,
    VisualComparison,
};

// AI-assisted thresholds
pub const AI_FRAUDULENT_BELOW: f64 = 60.0;
pub const AI_SUSPICIOUS_BELOW: f64 = 75.0;
pub const AI_IDENTICAL_AT: f64 = 95.0;

// Text-only thresholds
pub const OCR_IDENTICAL_AT: f64 = 95.0;
pub const OCR_AUTHENTIC_AT: f64 = 80.0;
pub const OCR_SUSPICIOUS_AT: f64 = 60.0;

/// Status, explanation and any warnings raised while deciding.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictDecision {
    pub status: VerdictStatus,
    pub message: String,
    pub warnings: Vec<String>,
}

pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Decision table for the AI-assisted path. First matching rule wins.
    pub fn classify_ai(similarity: f64, visual: &VisualComparison) -> VerdictStatus {
        if visual.tampering_severity == TamperingSeverity::Severe {
            VerdictStatus::Fraudulent
        } else if similarity < AI_FRAUDULENT_BELOW {
            VerdictStatus::Fraudulent
        } else if similarity < AI_SUSPICIOUS_BELOW || visual.tampering_severity == TamperingSeverity::Moderate {
            VerdictStatus::Suspicious
        } else if visual.exact_same_document && similarity >= AI_IDENTICAL_AT {
            VerdictStatus::Identical
        } else {
            VerdictStatus::Authentic
        }
    }

    /// Text similarity alone, with looser bands.
    pub fn classify_ocr(similarity: f64) -> VerdictStatus {
        if similarity >= OCR_IDENTICAL_AT {
            VerdictStatus::Identical
        } else if similarity >= OCR_AUTHENTIC_AT {
            VerdictStatus::Authentic
        } else if similarity >= OCR_SUSPICIOUS_AT {
            VerdictStatus::Suspicious
        } else {
            VerdictStatus::Fraudulent
        }
    }

    /// Types disagree only when both sides were classified.
    pub fn types_match(reference: &CredentialClassification, candidate: &CredentialClassification) -> bool {
        match (reference.canonical_type, candidate.canonical_type) {
            (Some(r), Some(c)) => r == c,
            _ => true,
        }
    }

    /// Run the table for `mode`, then apply the type-match downgrade.
    pub fn decide(
        similarity: &SimilarityResult,
        visual: Option<&VisualComparison>,
        reference: &CredentialClassification,
        candidate: &CredentialClassification,
    ) -> VerdictDecision {
        let mut warnings = Vec::new();
        let score = similarity.final_similarity;

        let (mode, mut status) = match visual {
            Some(visual) => (ComparisonMode::Ai, Self::classify_ai(score, visual)),
            None => (ComparisonMode::OcrFallback, Self::classify_ocr(score)),
        };

        if reference.canonical_type.is_none() || candidate.canonical_type.is_none() {
            warnings.push(format!(
                "Credential type could not be determined for {}",
                match (reference.canonical_type, candidate.canonical_type) {
                    (None, None) => "either document",
                    (None, Some(_)) => "the reference document",
                    _ => "the candidate document",
                }
            ));
        }

        let text_types_match = Self::types_match(reference, candidate);
        if !text_types_match {
            if let (Some(r), Some(c)) = (reference.canonical_type, candidate.canonical_type) {
                warnings.push(format!("Credential type mismatch: reference is {}, candidate is {}", r, c));
            }
        }

        let visual_types_match = visual.map_or(true, |v| v.same_credential_type);
        if !visual_types_match {
            warnings.push("Visual analysis reports different credential types".to_string());
        }

        if (!text_types_match || !visual_types_match)
            && matches!(status, VerdictStatus::Identical | VerdictStatus::Authentic)
        {
            status = VerdictStatus::Suspicious;
        }

        if similarity.potential_tampering {
            warnings.push(format!(
                "Possible localized edits: {} numeric mismatch(es), character {:.1}% vs word {:.1}%",
                similarity.numeric_mismatches.len(),
                similarity.character_similarity,
                similarity.word_similarity
            ));
        }

        VerdictDecision {
            status,
            message: Self::message(status, mode, score),
            warnings,
        }
    }

    pub fn message(status: VerdictStatus, mode: ComparisonMode, similarity: f64) -> String {
        let basis = match mode {
            ComparisonMode::Ai => "visual and text analysis",
            ComparisonMode::OcrFallback => "text comparison",
        };
        match status {
            VerdictStatus::Identical => format!(
                "The document matches the issued credential ({:.1}% similarity, {}).",
                similarity, basis
            ),
            VerdictStatus::Authentic => format!(
                "The document appears to be an authentic copy of the issued credential ({:.1}% similarity, {}).",
                similarity, basis
            ),
            VerdictStatus::Suspicious => format!(
                "The document differs from the issued credential and needs manual review ({:.1}% similarity, {}).",
                similarity, basis
            ),
            VerdictStatus::Fraudulent => format!(
                "The document does not match the issued credential ({:.1}% similarity, {}).",
                similarity, basis
            ),
        }
    }
}
