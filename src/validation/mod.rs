pub mod verdict;

pub use verdict::{VerdictClassifier, VerdictDecision};
