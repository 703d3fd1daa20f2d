pub mod error;

pub use error::{AiServiceError, CredentialError, DocumentSide};
