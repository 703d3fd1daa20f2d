use log::warn;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::processing::ocr::MIN_RASTER_SCALE;
use crate::utils::CredentialError;

pub const DEFAULT_GATEWAY: &str = "https://ipfs.io";
pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_VISION_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize)]
pub struct VerifierConfig {
    pub gateway: String,
    pub fetch_timeout_secs: u64,
    #[serde(skip_serializing)]
    pub vision_api_key: Option<String>,
    pub vision_model: String,
    pub vision_endpoint: String,
    pub vision_timeout_secs: u64,
    pub temp_dir: PathBuf,
    pub tessdata: Option<String>,
    pub ocr_language: String,
    pub raster_scale: f32,
    pub retain_candidate: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            gateway: DEFAULT_GATEWAY.to_string(),
            fetch_timeout_secs: 30,
            vision_api_key: None,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            vision_timeout_secs: 60,
            temp_dir: env::temp_dir(),
            tessdata: None,
            ocr_language: "eng".to_string(),
            raster_scale: MIN_RASTER_SCALE,
            retain_candidate: false,
        }
    }
}

impl VerifierConfig {
    pub fn load() -> Result<Self, CredentialError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = VerifierConfig::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gateway = get("IPFS_GATEWAY").unwrap_or(defaults.gateway);
        if !gateway.starts_with("http://") && !gateway.starts_with("https://") {
            return Err(CredentialError::Config(format!(
                "IPFS_GATEWAY must be an http(s) URL, got {}",
                gateway
            )));
        }

        let raster_scale: f32 = parse_or(get("RASTER_SCALE"), "RASTER_SCALE", defaults.raster_scale);
        if raster_scale < MIN_RASTER_SCALE {
            warn!("RASTER_SCALE {} is below {}, using {}", raster_scale, MIN_RASTER_SCALE, MIN_RASTER_SCALE);
        }

        Ok(VerifierConfig {
            gateway,
            fetch_timeout_secs: parse_or(get("FETCH_TIMEOUT_SECS"), "FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            vision_api_key: get("VISION_API_KEY"),
            vision_model: get("VISION_MODEL").unwrap_or(defaults.vision_model),
            vision_endpoint: get("VISION_ENDPOINT").unwrap_or(defaults.vision_endpoint),
            vision_timeout_secs: parse_or(
                get("VISION_TIMEOUT_SECS"),
                "VISION_TIMEOUT_SECS",
                defaults.vision_timeout_secs,
            ),
            temp_dir: get("VERIFY_TEMP_DIR").map(PathBuf::from).unwrap_or(defaults.temp_dir),
            tessdata: get("TESSDATA_PREFIX"),
            ocr_language: get("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            raster_scale: raster_scale.max(MIN_RASTER_SCALE),
            retain_candidate: parse_or(get("RETAIN_CANDIDATE"), "RETAIN_CANDIDATE", defaults.retain_candidate),
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn vision_timeout(&self) -> Duration {
        Duration::from_secs(self.vision_timeout_secs)
    }

    pub fn ai_enabled(&self) -> bool {
        self.vision_api_key.is_some()
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring malformed {}={}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
