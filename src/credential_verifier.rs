use chrono::Utc;
use log::{debug, error, info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::config::VerifierConfig;
use crate::models::*;
use crate::processing::ocr::MIN_CONTENT_CHARS;
use crate::processing::*;
use crate::utils::{AiServiceError, CredentialError, DocumentSide};
use crate::validation::VerdictClassifier;
use crate::verification::{DocumentBytes, GeminiVisionClient, VisionAnalyzer};

/// Shown alongside a text-only verdict when the vision service ran out of quota.
pub const QUOTA_ADVISORY: &str = "Visual analysis is temporarily unavailable because the AI \
service usage limit has been reached. This result is based on text comparison only; run the \
verification again later for a full visual check.";

/// Everything the vision service said about a document pair.
#[derive(Debug, Clone)]
struct VisualAssessment {
    reference_analysis: DocumentClassification,
    candidate_analysis: DocumentClassification,
    comparison: VisualComparison,
    reference_markers: AuthenticityMarkers,
    candidate_markers: AuthenticityMarkers,
}

/// Compares a candidate credential against the copy held in the content store.
pub struct CredentialVerifier {
    store: Arc<dyn ContentStore>,
    extractor: Arc<dyn TextExtraction>,
    vision: Option<Arc<dyn VisionAnalyzer>>,
    arena: TempArena,
    classifier: CredentialClassifier,
    retain_candidate: bool,
}

impl CredentialVerifier {
    pub fn new(
        store: Arc<dyn ContentStore>,
        extractor: Arc<dyn TextExtraction>,
        vision: Option<Arc<dyn VisionAnalyzer>>,
        arena: TempArena,
    ) -> Self {
        CredentialVerifier {
            store,
            extractor,
            vision,
            arena,
            classifier: CredentialClassifier::new(),
            retain_candidate: false,
        }
    }

    /// Keep the caller's candidate file instead of deleting it after the run.
    pub fn with_retain_candidate(mut self, retain: bool) -> Self {
        self.retain_candidate = retain;
        self
    }

    /// Wire up the gateway, tesseract and (when a key is present) the vision client.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, CredentialError> {
        std::fs::create_dir_all(&config.temp_dir)?;
        let arena = TempArena::new(config.temp_dir.clone());

        let store = IpfsGateway::new(&config.gateway, config.fetch_timeout())?;
        let extractor = TesseractExtractor::new(
            arena.clone(),
            &config.ocr_language,
            config.tessdata.clone(),
            config.raster_scale,
        );

        let vision: Option<Arc<dyn VisionAnalyzer>> = match &config.vision_api_key {
            Some(key) => match GeminiVisionClient::new(
                &config.vision_endpoint,
                &config.vision_model,
                key,
                config.vision_timeout(),
            ) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("Vision client disabled: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(CredentialVerifier::new(Arc::new(store), Arc::new(extractor), vision, arena)
            .with_retain_candidate(config.retain_candidate))
    }

    /// Single entry point. Failures come back as data, never as an error.
    pub async fn run_comparison(
        &self,
        reference_cid: &str,
        candidate_path: &Path,
        declared_type: Option<&str>,
    ) -> VerificationOutcome {
        match self.verify(reference_cid, candidate_path, declared_type).await {
            Ok(verdict) => {
                info!(
                    "Verification of {} finished: {} ({}, {:.1}%)",
                    reference_cid, verdict.status, verdict.mode, verdict.similarity.final_similarity
                );
                VerificationOutcome::Completed(verdict)
            }
            Err(e) => {
                error!("Verification of {} failed: {}", reference_cid, e);
                VerificationOutcome::Failed(VerificationFailure::from(e))
            }
        }
    }

    async fn verify(
        &self,
        reference_cid: &str,
        candidate_path: &Path,
        declared_type: Option<&str>,
    ) -> Result<Verdict, CredentialError> {
        // Handles own their files; every return below drops them
        let candidate = if self.retain_candidate {
            DocumentHandle::borrowed(candidate_path)?
        } else {
            DocumentHandle::adopt(candidate_path)?
        };

        // Step 1: fetch the reference
        let fetched = self.store.fetch(reference_cid).await?;
        let reference =
            DocumentHandle::from_bytes(&self.arena, "reference", &fetched.bytes, fetched.content_type.as_deref())?;
        drop(fetched);
        debug!(
            "Reference {:?} ({}), candidate {:?} ({})",
            reference.kind(),
            reference.mime_type(),
            candidate.kind(),
            candidate.mime_type()
        );

        // Step 2: AI-assisted analysis, all or nothing
        let visual = self.try_visual_analysis(&reference, &candidate).await;

        // Step 3: text is needed on both paths
        let reference_text = self.extract(&reference, DocumentSide::Reference).await?;
        let candidate_text = self.extract(&candidate, DocumentSide::Candidate).await?;

        // Levenshtein is quadratic in text length, keep it off the async workers
        let similarity =
            Self::compare_texts(reference_text.cleaned_text.clone(), candidate_text.cleaned_text.clone()).await?;

        // Step 4: classification from the documents themselves
        let mut warnings = Vec::new();
        let ai = visual.as_ref().ok();

        let derived_reference = self.classify_side(&reference_text.cleaned_text, ai.map(|v| &v.reference_analysis));
        let candidate_classification =
            self.classify_side(&candidate_text.cleaned_text, ai.map(|v| &v.candidate_analysis));

        // Step 5: verdict, judged on what both documents actually contain
        let decision = VerdictClassifier::decide(
            &similarity,
            ai.map(|v| &v.comparison),
            &derived_reference,
            &candidate_classification,
        );
        warnings.extend(decision.warnings);

        let type_match = VerdictClassifier::types_match(&derived_reference, &candidate_classification)
            && ai.map_or(true, |v| v.comparison.same_credential_type);

        // Step 6: the declared type is what gets reported for the reference
        let reference_classification = match declared_type.map(str::trim).filter(|d| !d.is_empty()) {
            Some(declared) => {
                let from_record = CredentialClassifier::classification_from_label(declared, Confidence::High);
                match from_record.canonical_type {
                    Some(recorded) => {
                        if let Some(observed) = candidate_classification.canonical_type.filter(|t| *t != recorded) {
                            warnings.push(format!(
                                "Declared credential type {} differs from the candidate document ({})",
                                recorded, observed
                            ));
                        }
                        from_record
                    }
                    None => {
                        warnings.push(format!("Declared credential type '{}' is not recognised", declared));
                        derived_reference
                    }
                }
            }
            None => derived_reference,
        };

        let (mode, fallback_reason) = match &visual {
            Ok(_) => (ComparisonMode::Ai, None),
            Err(reason) => (ComparisonMode::OcrFallback, Some(*reason)),
        };
        let advisory = (fallback_reason == Some(FallbackReason::QuotaExhausted)).then(|| QUOTA_ADVISORY.to_string());

        let (reference_analysis, candidate_analysis, comparison, reference_markers, candidate_markers) =
            match visual {
                Ok(v) => (
                    Some(v.reference_analysis),
                    Some(v.candidate_analysis),
                    Some(v.comparison),
                    Some(v.reference_markers),
                    Some(v.candidate_markers),
                ),
                Err(_) => (None, None, None, None, None),
            };

        Ok(Verdict {
            status: decision.status,
            message: decision.message,
            mode,
            similarity,
            visual: comparison,
            reference_classification,
            candidate_classification,
            reference_analysis,
            candidate_analysis,
            reference_markers,
            candidate_markers,
            type_match,
            advisory,
            fallback_reason,
            warnings,
            reference_sha256: reference.sha256().to_string(),
            candidate_sha256: candidate.sha256().to_string(),
            checked_at: Utc::now(),
        })
    }

    /// Either a complete assessment or the reason the text-only path is used.
    async fn try_visual_analysis(
        &self,
        reference: &DocumentHandle,
        candidate: &DocumentHandle,
    ) -> Result<VisualAssessment, FallbackReason> {
        let vision = match &self.vision {
            Some(vision) => vision,
            None => {
                debug!("No vision service configured, using text comparison");
                return Err(FallbackReason::NotConfigured);
            }
        };

        let (reference_bytes, candidate_bytes) = match (
            Self::document_bytes(reference).await,
            Self::document_bytes(candidate).await,
        ) {
            (Ok(r), Ok(c)) => (r, c),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Could not read documents for visual analysis: {}", e);
                return Err(FallbackReason::ServiceUnavailable);
            }
        };

        let result = tokio::try_join!(
            vision.classify_document(&reference_bytes),
            vision.classify_document(&candidate_bytes),
            vision.compare_visually(&reference_bytes, &candidate_bytes),
            vision.detect_authenticity_markers(&reference_bytes),
            vision.detect_authenticity_markers(&candidate_bytes),
        );

        match result {
            Ok((reference_analysis, candidate_analysis, comparison, reference_markers, candidate_markers)) => {
                info!(
                    "Visual analysis: severity {:?}, exact match {}, score {}",
                    comparison.tampering_severity, comparison.exact_same_document, comparison.authenticity_score
                );
                Ok(VisualAssessment {
                    reference_analysis,
                    candidate_analysis,
                    comparison,
                    reference_markers,
                    candidate_markers,
                })
            }
            Err(e) => {
                match &e {
                    AiServiceError::QuotaExhausted(_) => info!("Falling back to text comparison: {}", e),
                    AiServiceError::InvalidCredentials(_) => error!("Falling back to text comparison: {}", e),
                    _ => warn!("Falling back to text comparison: {}", e),
                }
                Err(FallbackReason::from(&e))
            }
        }
    }

    async fn document_bytes(handle: &DocumentHandle) -> Result<DocumentBytes, CredentialError> {
        Ok(DocumentBytes {
            bytes: tokio::fs::read(handle.path()).await?,
            mime_type: handle.mime_type().to_string(),
        })
    }

    async fn extract(&self, handle: &DocumentHandle, side: DocumentSide) -> Result<ExtractedContent, CredentialError> {
        let extractor = Arc::clone(&self.extractor);
        let path = handle.path().to_path_buf();
        let kind = handle.kind();

        let content = tokio::task::spawn_blocking(move || extractor.extract(&path, kind))
            .await
            .map_err(|e| CredentialError::Extraction(format!("{} extraction task failed: {}", side, e)))??;

        let length = content.usable_length();
        if length < MIN_CONTENT_CHARS {
            return Err(CredentialError::InsufficientContent { side, length });
        }

        debug!("Extracted {} usable chars from {} document", length, side);
        Ok(content)
    }

    async fn compare_texts(reference: String, candidate: String) -> Result<SimilarityResult, CredentialError> {
        tokio::task::spawn_blocking(move || TextComparator::compare(&reference, &candidate))
            .await
            .map_err(|e| CredentialError::Extraction(format!("comparison task failed: {}", e)))
    }

    // AI label first when it maps onto a known type, otherwise the text classifier
    fn classify_side(&self, text: &str, analysis: Option<&DocumentClassification>) -> CredentialClassification {
        if let Some(analysis) = analysis {
            let from_ai = CredentialClassifier::classification_from_label(&analysis.document_type, analysis.confidence);
            if from_ai.canonical_type.is_some() {
                return from_ai;
            }
        }
        self.classifier.classify(text)
    }
}
