use crate::models::CredentialType;

/// Phrases and keywords that identify one credential category.
pub struct CredentialRule {
    pub category: CredentialType,
    /// Multi-word phrases, matched as lowercase substrings in the first pass.
    pub phrases: &'static [&'static str],
    /// Single words, matched as whole words in the second pass.
    pub keywords: &'static [&'static str],
}

/// Ordered rule table. Position is priority: the first category whose phrase
/// matches wins, and keyword ties go to the earlier category.
pub struct CredentialRules {
    pub rules: Vec<CredentialRule>,
}

impl CredentialRules {
    pub fn new() -> Self {
        let rules = vec![
            // Graduation certificates routinely name the degree programme, so
            // this must be checked before any degree category.
            CredentialRule {
                category: CredentialType::CertificateOfGraduation,
                phrases: &[
                    "certificate of graduation",
                    "graduation certificate",
                    "has graduated from",
                    "has successfully graduated",
                ],
                keywords: &["graduation"],
            },
            CredentialRule {
                category: CredentialType::Transcript,
                phrases: &[
                    "transcript of records",
                    "official transcript",
                    "academic transcript",
                    "academic record",
                    "grade report",
                    "statement of grades",
                ],
                keywords: &["transcript", "transcripts"],
            },
            CredentialRule {
                category: CredentialType::PhdDegree,
                phrases: &[
                    "doctor of philosophy",
                    "doctoral degree",
                    "doctorate degree",
                    "degree of doctor",
                ],
                keywords: &["phd", "doctorate", "doctoral"],
            },
            CredentialRule {
                category: CredentialType::MasterDegree,
                phrases: &[
                    "master of science",
                    "master of arts",
                    "master of business administration",
                    "master of engineering",
                    "master's degree",
                    "masters degree",
                    "master degree",
                ],
                keywords: &["master", "masters", "mba"],
            },
            CredentialRule {
                category: CredentialType::BachelorDegree,
                phrases: &[
                    "bachelor of science",
                    "bachelor of arts",
                    "bachelor of engineering",
                    "bachelor of technology",
                    "bachelor's degree",
                    "bachelors degree",
                    "bachelor degree",
                ],
                keywords: &["bachelor", "bachelors", "baccalaureate"],
            },
            CredentialRule {
                category: CredentialType::Diploma,
                phrases: &["high school diploma", "diploma in", "this diploma"],
                keywords: &["diploma"],
            },
            CredentialRule {
                category: CredentialType::Certificate,
                phrases: &[
                    "certificate of completion",
                    "certificate of participation",
                    "professional certificate",
                    "certificate in",
                ],
                keywords: &["certificate", "certification", "certified"],
            },
            CredentialRule {
                category: CredentialType::AchievementAward,
                phrases: &[
                    "certificate of achievement",
                    "certificate of merit",
                    "certificate of excellence",
                    "achievement award",
                    "award of excellence",
                    "dean's list",
                ],
                keywords: &["award", "awarded", "achievement", "honors", "honours"],
            },
            CredentialRule {
                category: CredentialType::LetterOfRecommendation,
                phrases: &[
                    "letter of recommendation",
                    "recommendation letter",
                    "to whom it may concern",
                    "i highly recommend",
                    "i strongly recommend",
                ],
                keywords: &["recommend", "recommended", "recommendation"],
            },
        ];

        CredentialRules { rules }
    }
}

impl Default for CredentialRules {
    fn default() -> Self {
        Self::new()
    }
}
