use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::models::{AuthenticityMarkers, DocumentClassification, VisualComparison};
use crate::utils::AiServiceError;
use crate::verification::response::parse_structured;

const CLASSIFY_PROMPT: &str = "You are examining an academic credential. Identify what kind of \
document it is (for example Transcript, Diploma, Bachelor Degree, Master Degree, PhD Degree, \
Certificate, Certificate of Graduation, Achievement Award, Letter of Recommendation). Respond \
with a single JSON object: {\"documentType\": string, \"confidence\": \"high\"|\"medium\"|\"low\", \
\"visualElements\": [string], \"institutionName\": string|null, \"recipientName\": string|null}";

const COMPARE_PROMPT: &str = "The first document is the original credential issued by the \
institution. The second document was submitted for verification. Compare them side by side and \
look for altered names, grades, dates, identifiers, seals or signatures. Respond with a single \
JSON object: {\"sameCredentialType\": bool, \"exactSameDocument\": bool, \"matchConfidence\": \
\"high\"|\"medium\"|\"low\", \"tamperingSeverity\": \"none\"|\"minor\"|\"moderate\"|\"severe\", \
\"specificTampering\": [{\"field\": string, \"referenceValue\": string, \"candidateValue\": string, \
\"location\": string, \"method\": string, \"severity\": \"none\"|\"minor\"|\"moderate\"|\"severe\"}], \
\"authenticityScore\": number 0-100}";

const MARKERS_PROMPT: &str = "Inspect this academic credential for physical authenticity markers. \
Respond with a single JSON object: {\"sealPresent\": bool, \"signaturePresent\": bool, \
\"stampPresent\": bool, \"overallAuthenticityScore\": number 0-100, \"observations\": [string]}";

/// Document payload sent to the vision service.
#[derive(Debug, Clone)]
pub struct DocumentBytes {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// The three independent calls of the AI-assisted path. Every call may fail
/// on its own.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn classify_document(&self, document: &DocumentBytes) -> Result<DocumentClassification, AiServiceError>;

    async fn compare_visually(
        &self,
        reference: &DocumentBytes,
        candidate: &DocumentBytes,
    ) -> Result<VisualComparison, AiServiceError>;

    async fn detect_authenticity_markers(&self, document: &DocumentBytes)
        -> Result<AuthenticityMarkers, AiServiceError>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Client for a Gemini-style `generateContent` endpoint.
pub struct GeminiVisionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiVisionClient {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self, AiServiceError> {
        if api_key.trim().is_empty() {
            return Err(AiServiceError::NotConfigured);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(GeminiVisionClient {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Send a prompt plus inline documents and return the concatenated reply text.
    async fn generate(&self, prompt: &str, documents: &[&DocumentBytes]) -> Result<String, AiServiceError> {
        let mut parts = vec![json!({ "text": prompt })];
        for document in documents {
            parts.push(json!({
                "inline_data": {
                    "mime_type": document.mime_type,
                    "data": general_purpose::STANDARD.encode(&document.bytes),
                }
            }));
        }

        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "temperature": 0.1 }
        });

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status.as_u16(), &text));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiServiceError::MalformedResponse(e.to_string()))?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if reply.trim().is_empty() {
            return Err(AiServiceError::MalformedResponse("empty reply".to_string()));
        }

        debug!("Vision reply ({} chars)", reply.len());
        Ok(reply)
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiVisionClient {
    async fn classify_document(&self, document: &DocumentBytes) -> Result<DocumentClassification, AiServiceError> {
        let reply = self.generate(CLASSIFY_PROMPT, &[document]).await?;
        parse_structured(&reply)
    }

    async fn compare_visually(
        &self,
        reference: &DocumentBytes,
        candidate: &DocumentBytes,
    ) -> Result<VisualComparison, AiServiceError> {
        let reply = self.generate(COMPARE_PROMPT, &[reference, candidate]).await?;
        parse_structured(&reply)
    }

    async fn detect_authenticity_markers(
        &self,
        document: &DocumentBytes,
    ) -> Result<AuthenticityMarkers, AiServiceError> {
        let reply = self.generate(MARKERS_PROMPT, &[document]).await?;
        parse_structured(&reply)
    }
}

/// Map a non-2xx reply onto the service error taxonomy.
pub fn classify_http_failure(status: u16, body: &str) -> AiServiceError {
    let lowered = body.to_lowercase();
    let summary = format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>());

    if status == 429 || lowered.contains("resource_exhausted") || lowered.contains("quota") {
        AiServiceError::QuotaExhausted(summary)
    } else if status == 401
        || status == 403
        || lowered.contains("api_key_invalid")
        || lowered.contains("api key not valid")
    {
        AiServiceError::InvalidCredentials(summary)
    } else {
        AiServiceError::Unavailable(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_detection() {
        assert!(matches!(classify_http_failure(429, ""), AiServiceError::QuotaExhausted(_)));
        assert!(matches!(
            classify_http_failure(400, r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#),
            AiServiceError::QuotaExhausted(_)
        ));
        assert!(matches!(
            classify_http_failure(503, "You exceeded your current quota"),
            AiServiceError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn test_credential_detection() {
        assert!(matches!(classify_http_failure(403, "forbidden"), AiServiceError::InvalidCredentials(_)));
        assert!(matches!(
            classify_http_failure(400, "API key not valid. Please pass a valid API key."),
            AiServiceError::InvalidCredentials(_)
        ));
        assert!(matches!(
            classify_http_failure(400, r#"{"reason": "API_KEY_INVALID"}"#),
            AiServiceError::InvalidCredentials(_)
        ));
    }

    #[test]
    fn test_other_failures_are_unavailable() {
        assert!(matches!(classify_http_failure(500, "internal"), AiServiceError::Unavailable(_)));
        assert!(matches!(classify_http_failure(400, "bad request"), AiServiceError::Unavailable(_)));
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = GeminiVisionClient::new("https://example.test", "m", " ", Duration::from_secs(1));
        assert!(matches!(err, Err(AiServiceError::NotConfigured)));
    }

    #[test]
    fn test_url() {
        let client =
            GeminiVisionClient::new("https://example.test/v1beta/", "gemini-1.5-flash", "k", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.url(), "https://example.test/v1beta/models/gemini-1.5-flash:generateContent");
    }
}
