pub mod config;
pub mod credential_verifier;
pub mod models;
pub mod processing;
pub mod utils;
pub mod validation;
pub mod verification;

pub use config::VerifierConfig;
pub use credential_verifier::{CredentialVerifier, QUOTA_ADVISORY};
pub use models::{Verdict, VerdictStatus, VerificationOutcome};
pub use utils::{AiServiceError, CredentialError};
