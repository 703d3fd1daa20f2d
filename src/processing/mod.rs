pub mod classifier;
pub mod comparator;
pub mod document;
pub mod fetch;
pub mod ocr;
pub mod text_cleanup;

pub use classifier::CredentialClassifier;
pub use comparator::TextComparator;
pub use document::{DocumentHandle, TempArena};
pub use fetch::{ContentStore, FetchedContent, IpfsGateway};
pub use ocr::{TesseractExtractor, TextExtraction};
pub use text_cleanup::TextCleaner;
