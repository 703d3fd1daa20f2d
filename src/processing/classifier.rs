use std::collections::HashSet;

use crate::models::{Confidence, CredentialClassification, CredentialRules, CredentialType};

/// Shortest keyword allowed to classify a document on its own.
const MIN_KEYWORD_LENGTH: usize = 3;

/// Keywords at least this long are specific enough for medium confidence.
const MEDIUM_CONFIDENCE_KEYWORD_LENGTH: usize = 7;

/// Ordered substring rules used to coerce free-text labels (from the vision
/// service or a database record) into a canonical type. Award labels are
/// checked before the generic certificate label so that "Certificate of
/// Achievement" lands where the phrase table puts it.
const LABEL_RULES: &[(&[&str], CredentialType)] = &[
    (&["graduation"], CredentialType::CertificateOfGraduation),
    (
        &["transcript", "grade report", "academic record", "mark sheet", "marksheet"],
        CredentialType::Transcript,
    ),
    (&["phd", "ph.d", "doctor"], CredentialType::PhdDegree),
    (&["master", "mba", "m.sc", "msc"], CredentialType::MasterDegree),
    (&["bachelor", "b.sc", "bsc", "baccalaureate"], CredentialType::BachelorDegree),
    (&["diploma"], CredentialType::Diploma),
    (
        &["achievement", "award", "merit", "honor", "honour", "dean's list"],
        CredentialType::AchievementAward,
    ),
    (&["recommend", "reference letter"], CredentialType::LetterOfRecommendation),
    (&["certificate", "certification"], CredentialType::Certificate),
];

/// Maps document text onto the closed set of credential categories.
pub struct CredentialClassifier {
    rules: CredentialRules,
}

impl CredentialClassifier {
    pub fn new() -> Self {
        CredentialClassifier {
            rules: CredentialRules::new(),
        }
    }

    /// Classify extracted text. Multi-word phrases across every category are
    /// tried first, in priority order; only then are single keywords scored.
    pub fn classify(&self, text: &str) -> CredentialClassification {
        let lowered = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if lowered.is_empty() {
            return CredentialClassification::unclassified();
        }

        // Pass 1: phrases
        for rule in &self.rules.rules {
            if let Some(phrase) = rule.phrases.iter().find(|p| contains_phrase(&lowered, p)) {
                return CredentialClassification {
                    canonical_type: Some(rule.category),
                    raw_label: Some(phrase.to_string()),
                    confidence: Some(Confidence::High),
                };
            }
        }

        // Pass 2: keywords scored by length
        let words: HashSet<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        let mut best: Option<(usize, CredentialType, &str)> = None;
        for rule in &self.rules.rules {
            for keyword in rule.keywords {
                if keyword.len() < MIN_KEYWORD_LENGTH || !words.contains(keyword) {
                    continue;
                }
                let score = keyword.len();
                if best.map_or(true, |(best_score, _, _)| score > best_score) {
                    best = Some((score, rule.category, *keyword));
                }
            }
        }

        match best {
            Some((score, category, keyword)) => CredentialClassification {
                canonical_type: Some(category),
                raw_label: Some(keyword.to_string()),
                confidence: Some(if score >= MEDIUM_CONFIDENCE_KEYWORD_LENGTH {
                    Confidence::Medium
                } else {
                    Confidence::Low
                }),
            },
            None => CredentialClassification::unclassified(),
        }
    }

    /// Coerce a free-text label into a canonical type.
    pub fn normalize(raw_label: &str) -> Option<CredentialType> {
        let label = raw_label.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }

        if let Some(exact) = CredentialType::ALL
            .iter()
            .find(|t| t.display_name().to_lowercase() == label)
        {
            return Some(*exact);
        }

        LABEL_RULES
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| label.contains(n)))
            .map(|(_, category)| *category)
    }

    /// Build a classification from a label that did not come from text
    /// analysis, such as the declared type on a credential record.
    pub fn classification_from_label(raw_label: &str, confidence: Confidence) -> CredentialClassification {
        match Self::normalize(raw_label) {
            Some(category) => CredentialClassification {
                canonical_type: Some(category),
                raw_label: Some(raw_label.trim().to_string()),
                confidence: Some(confidence),
            },
            None => CredentialClassification {
                canonical_type: None,
                raw_label: Some(raw_label.trim().to_string()).filter(|l| !l.is_empty()),
                confidence: None,
            },
        }
    }
}

impl Default for CredentialClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// Substring match that refuses to start or end inside a word.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Option<CredentialType> {
        CredentialClassifier::new().classify(text).canonical_type
    }

    #[test]
    fn test_graduation_certificate_beats_degree_keywords() {
        assert_eq!(
            classify("Certificate of Graduation for Bachelor of Science"),
            Some(CredentialType::CertificateOfGraduation)
        );
        assert_eq!(
            classify("This certifies completion of the Master of Arts programme. Certificate of Graduation."),
            Some(CredentialType::CertificateOfGraduation)
        );
    }

    #[test]
    fn test_empty_and_whitespace_are_unclassified() {
        assert_eq!(CredentialClassifier::new().classify(""), CredentialClassification::unclassified());
        assert_eq!(
            CredentialClassifier::new().classify("   \n\t  "),
            CredentialClassification::unclassified()
        );
    }

    #[test]
    fn test_phrase_match_has_high_confidence() {
        let result = CredentialClassifier::new().classify("OFFICIAL TRANSCRIPT\nStudent: Jane Roe");
        assert_eq!(result.canonical_type, Some(CredentialType::Transcript));
        assert_eq!(result.raw_label.as_deref(), Some("official transcript"));
        assert_eq!(result.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_longer_keyword_outranks_shorter() {
        // "diploma" (7) beats "award" (5) even though awards are listed later
        let result = CredentialClassifier::new().classify("Diploma award ceremony");
        assert_eq!(result.canonical_type, Some(CredentialType::Diploma));
        assert_eq!(result.confidence, Some(Confidence::Medium));
    }

    #[test]
    fn test_keyword_tie_goes_to_earlier_category() {
        // "master" and "honors" are both six letters
        assert_eq!(classify("master honors"), Some(CredentialType::MasterDegree));
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        assert_eq!(classify("The remastered edition"), None);
        assert_eq!(classify("diplomat relations"), None);
    }

    #[test]
    fn test_phrase_boundaries() {
        let result = CredentialClassifier::new().classify("certificate inspection log");
        assert_eq!(result.canonical_type, Some(CredentialType::Certificate));
        assert_eq!(result.raw_label.as_deref(), Some("certificate"));
    }

    #[test]
    fn test_achievement_phrase() {
        assert_eq!(
            classify("Certificate of Achievement presented to John Smith"),
            Some(CredentialType::AchievementAward)
        );
    }

    #[test]
    fn test_normalize_free_text_labels() {
        assert_eq!(
            CredentialClassifier::normalize("University Transcript"),
            Some(CredentialType::Transcript)
        );
        assert_eq!(
            CredentialClassifier::normalize("Graduation Certificate (Bachelor)"),
            Some(CredentialType::CertificateOfGraduation)
        );
        assert_eq!(
            CredentialClassifier::normalize("Doctor of Philosophy"),
            Some(CredentialType::PhdDegree)
        );
        assert_eq!(
            CredentialClassifier::normalize("Certificate of Achievement"),
            Some(CredentialType::AchievementAward)
        );
        assert_eq!(
            CredentialClassifier::normalize("Professional Certificate"),
            Some(CredentialType::Certificate)
        );
        assert_eq!(CredentialClassifier::normalize("bachelor degree"), Some(CredentialType::BachelorDegree));
        assert_eq!(CredentialClassifier::normalize("Library card"), None);
        assert_eq!(CredentialClassifier::normalize("  "), None);
    }

    #[test]
    fn test_classification_from_unknown_label_keeps_label() {
        let result = CredentialClassifier::classification_from_label("Library card", Confidence::High);
        assert_eq!(result.canonical_type, None);
        assert_eq!(result.raw_label.as_deref(), Some("Library card"));
    }
}
