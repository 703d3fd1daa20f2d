use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;

use crate::utils::CredentialError;

/// Raw response from the content-addressed store.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of reference documents, addressed by content identifier.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch(&self, content_id: &str) -> Result<FetchedContent, CredentialError>;
}

/// Reads documents through an HTTP gateway: `GET {gateway}/ipfs/{cid}`.
pub struct IpfsGateway {
    client: reqwest::Client,
    gateway: String,
}

impl IpfsGateway {
    pub fn new(gateway: &str, timeout: Duration) -> Result<Self, CredentialError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CredentialError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(IpfsGateway {
            client,
            gateway: gateway.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, content_id: &str) -> String {
        format!("{}/ipfs/{}", self.gateway, content_id.trim())
    }
}

#[async_trait]
impl ContentStore for IpfsGateway {
    async fn fetch(&self, content_id: &str) -> Result<FetchedContent, CredentialError> {
        validate_content_id(content_id)?;

        let url = self.url_for(content_id);
        info!("Fetching reference document from {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                CredentialError::Fetch(format!("Timed out fetching {}", content_id))
            } else {
                CredentialError::Fetch(format!("Content store unreachable: {}", e))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CredentialError::Fetch(format!("Content id not found: {}", content_id)));
        }
        if !status.is_success() {
            return Err(CredentialError::Fetch(format!(
                "Content store returned HTTP {} for {}",
                status, content_id
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CredentialError::Fetch(format!("Failed to read response body: {}", e)))?;

        if bytes.is_empty() {
            return Err(CredentialError::Fetch(format!("Content id {} returned no data", content_id)));
        }

        debug!("Fetched {} bytes ({:?}) for {}", bytes.len(), content_type, content_id);

        Ok(FetchedContent {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Reject identifiers that cannot address anything before touching the network.
pub fn validate_content_id(content_id: &str) -> Result<(), CredentialError> {
    let trimmed = content_id.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::InvalidInput("Content id is empty".to_string()));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CredentialError::InvalidInput(format!(
            "Content id contains invalid characters: {}",
            trimmed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let gateway = IpfsGateway::new("https://ipfs.io/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            gateway.url_for("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"),
            "https://ipfs.io/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn test_content_id_validation() {
        assert!(validate_content_id("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").is_ok());
        assert!(matches!(validate_content_id("  "), Err(CredentialError::InvalidInput(_))));
        assert!(matches!(validate_content_id("../etc/passwd"), Err(CredentialError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_fetch_error() {
        let gateway = IpfsGateway::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = gateway.fetch("QmTest").await.unwrap_err();
        assert!(matches!(err, CredentialError::Fetch(_)));
    }
}
